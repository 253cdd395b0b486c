//! Evaluation pipeline - admission checks, scoring and optional AI commentary

use crate::gate::RateLimiter;
use crate::suggestions::{AiAdvisor, AiCommentary};
use crate::{analyze, score, Band, EvaluationReport, StructuralSignals};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::scoring::percentage;

/// Identity used when the caller does not supply one
pub const DEFAULT_IDENTITY: &str = "anonymous";

/// Why a story was refused before scoring
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Please enter a user story to evaluate.")]
    EmptyStory,
    #[error("Rate limit exceeded. Please wait before making more requests.")]
    RateLimited { identity: String },
    #[error("Incorrect answer. Please try the new question.")]
    ChallengeFailed,
}

/// A story plus the context it was submitted with
#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    pub story: String,
    /// Display name (file path, "stdin", demo title)
    pub label: Option<String>,
    /// Rate-limit bucket; defaults to [`DEFAULT_IDENTITY`]
    pub identity: Option<String>,
}

impl EvaluationRequest {
    pub fn new(story: impl Into<String>) -> Self {
        Self {
            story: story.into(),
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

/// Everything produced for one accepted story
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub story: String,
    pub signals: StructuralSignals,
    pub report: EvaluationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiCommentary>,
}

impl Evaluation {
    /// Label for display, falling back to the first words of the story
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => {
                let head: Vec<&str> = self.story.split_whitespace().take(6).collect();
                let mut name = head.join(" ");
                if self.story.split_whitespace().count() > 6 {
                    name.push('…');
                }
                name
            }
        }
    }
}

/// Runs stories through the admission checks and the INVEST scorer
pub struct StoryEvaluator {
    limiter: Option<RateLimiter>,
    advisor: Option<AiAdvisor>,
}

impl StoryEvaluator {
    /// Evaluator with no rate limiting and no AI commentary
    pub fn new() -> Self {
        Self {
            limiter: None,
            advisor: None,
        }
    }

    /// Attach a rate limiter consulted before every evaluation
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Attach an AI advisor; its commentary is added to every evaluation
    pub fn with_advisor(mut self, advisor: AiAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Evaluate a single story, with AI commentary when an advisor is attached
    pub fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, Rejection> {
        let mut evaluation = self.evaluate_structure(request)?;
        evaluation.ai = self
            .advisor
            .as_ref()
            .map(|advisor| advisor.commentary(&request.story, &evaluation.report));
        Ok(evaluation)
    }

    /// Admission checks and scoring only. The advisor is never called.
    pub fn evaluate_structure(&self, request: &EvaluationRequest) -> Result<Evaluation, Rejection> {
        let story = request.story.trim();
        if story.is_empty() {
            tracing::debug!("rejected empty story");
            return Err(Rejection::EmptyStory);
        }

        if let Some(limiter) = &self.limiter {
            let identity = request.identity.as_deref().unwrap_or(DEFAULT_IDENTITY);
            if !limiter.allow(identity) {
                tracing::info!(identity, "rate limit exceeded");
                return Err(Rejection::RateLimited {
                    identity: identity.to_string(),
                });
            }
        }

        let signals = analyze(&request.story);
        let report = score(&request.story, signals);
        tracing::debug!(
            label = request.label.as_deref().unwrap_or("-"),
            words = signals.word_count,
            total = report.total_score,
            percentage = report.overall_percentage,
            "story evaluated"
        );

        Ok(Evaluation {
            label: request.label.clone(),
            story: request.story.clone(),
            signals,
            report,
            ai: None,
        })
    }

    /// Read and evaluate a story file
    pub fn evaluate_file(&self, path: &Path, identity: Option<&str>) -> Result<Evaluation> {
        let story = fs::read_to_string(path)
            .with_context(|| format!("Failed to read story: {}", path.display()))?;
        let mut request = EvaluationRequest::new(story).label(path.display().to_string());
        request.identity = identity.map(str::to_string);
        self.evaluate(&request)
            .with_context(|| format!("Story rejected: {}", path.display()))
    }

    /// Evaluate multiple story files sequentially
    pub fn evaluate_many(&self, paths: &[&Path], identity: Option<&str>) -> Vec<Result<Evaluation>> {
        paths
            .iter()
            .map(|p| self.evaluate_file(p, identity))
            .collect()
    }

    /// Evaluate multiple story files in parallel using rayon
    pub fn evaluate_parallel(
        &self,
        paths: &[std::path::PathBuf],
        identity: Option<&str>,
    ) -> Vec<Result<Evaluation>> {
        use rayon::prelude::*;

        paths
            .par_iter()
            .map(|p| self.evaluate_file(p, identity))
            .collect()
    }

    /// Get aggregate stats from multiple evaluations
    pub fn aggregate_stats(evaluations: &[Evaluation]) -> AggregateStats {
        if evaluations.is_empty() {
            return AggregateStats::default();
        }

        let total: f64 = evaluations
            .iter()
            .map(|e| e.report.overall_percentage)
            .sum();
        let average_percentage = total / evaluations.len() as f64;

        let total_suggestions = evaluations
            .iter()
            .flat_map(|e| e.report.iter())
            .map(|c| c.suggestions.len())
            .sum();

        AggregateStats {
            stories_evaluated: evaluations.len(),
            average_percentage,
            band: Band::from_percentage(average_percentage),
            total_suggestions,
        }
    }
}

impl Default for StoryEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics across several evaluations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub stories_evaluated: usize,
    /// Mean of the overall percentages
    pub average_percentage: f64,
    pub band: Band,
    pub total_suggestions: usize,
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self {
            stories_evaluated: 0,
            average_percentage: percentage(0),
            band: Band::NeedsWork,
            total_suggestions: 0,
        }
    }
}
