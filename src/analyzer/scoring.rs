//! Score calculation for INVEST evaluations

use crate::{Band, EvaluationReport, StructuralSignals};

use super::criteria;

/// Best possible score for a single criterion
pub const MAX_CRITERION_SCORE: u8 = 3;

/// Best possible total (six criteria at 3 each)
pub const MAX_TOTAL_SCORE: u8 = 18;

/// total / 18 * 100
pub fn percentage(total_score: u8) -> f64 {
    f64::from(total_score) / f64::from(MAX_TOTAL_SCORE) * 100.0
}

/// Rule-based INVEST scorer
pub struct InvestScorer;

impl InvestScorer {
    /// Score a story. Deterministic and total over any signals.
    pub fn score(story: &str, signals: StructuralSignals) -> EvaluationReport {
        let lower = story.to_lowercase();
        EvaluationReport::from_criteria([
            criteria::independent(&lower, &signals),
            criteria::negotiable(&lower, &signals),
            criteria::valuable(&signals),
            criteria::estimable(&signals),
            criteria::small(&signals),
            criteria::testable(&signals),
        ])
    }
}

/// Helpers for describing and summarising scores
pub struct ScoreCalculator;

impl ScoreCalculator {
    /// Get a description of the band
    pub fn band_description(band: Band) -> &'static str {
        match band {
            Band::Excellent => "Excellent - Story is well-formed and ready for planning",
            Band::Good => "Good - Story is workable but has room for improvement",
            Band::NeedsWork => "Needs work - Story should be reshaped before estimation",
        }
    }

    /// All suggestions from the report in INVEST order, duplicates removed
    pub fn recommendations(report: &EvaluationReport) -> Vec<String> {
        let mut recs: Vec<String> = Vec::new();
        for suggestion in report.iter().flat_map(|c| c.suggestions.iter()) {
            if !recs.contains(suggestion) {
                recs.push(suggestion.clone());
            }
        }

        if recs.is_empty() {
            recs.push("Story is in good shape! Consider reviewing it with the team.".to_string());
        }

        recs
    }
}
