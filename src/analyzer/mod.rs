//! Analyzer module - structural signals, INVEST scoring and the evaluation pipeline

pub mod criteria;
pub mod engine;
pub mod scoring;
pub mod structure;

pub use engine::{
    AggregateStats, Evaluation, EvaluationRequest, Rejection, StoryEvaluator, DEFAULT_IDENTITY,
};
pub use scoring::{InvestScorer, ScoreCalculator};
pub use structure::StructureAnalyzer;
