//! Invest: INVEST quality analyzer for Agile user stories
//!
//! This library extracts structural signals from a user story and scores it
//! against the six INVEST criteria (Independent, Negotiable, Valuable,
//! Estimable, Small, Testable). The core is a pair of pure functions,
//! [`analyze`] and [`score`]; everything else (rate limiting, challenge
//! gates, AI commentary, reporting) is layered around them by the caller.

pub mod analyzer;
pub mod config;
pub mod gate;
pub mod mcp;
pub mod reporter;
pub mod suggestions;

use serde::{Deserialize, Serialize};

/// Structural features extracted from the raw story text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSignals {
    /// "as a|an|the <word>" appears anywhere
    pub has_persona: bool,
    /// "i want", "i need", "i can" or "i should" appears
    pub has_action: bool,
    /// "so that", "in order to" or a bare "to" appears
    pub has_value: bool,
    /// Given/When/Then or an explicit acceptance criteria marker appears
    pub has_acceptance_criteria: bool,
    /// Number of whitespace-delimited tokens
    pub word_count: usize,
    /// Number of segments after splitting on runs of `.`, `!`, `?` (trailing empty segment included)
    pub sentence_count: usize,
    /// "as a <word> ... i want ... so that ..." in that order
    pub has_user_story_format: bool,
}

/// One of the six INVEST criteria, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criterion {
    Independent,
    Negotiable,
    Valuable,
    Estimable,
    Small,
    Testable,
}

impl Criterion {
    /// All criteria in INVEST order
    pub const ALL: [Criterion; 6] = [
        Criterion::Independent,
        Criterion::Negotiable,
        Criterion::Valuable,
        Criterion::Estimable,
        Criterion::Small,
        Criterion::Testable,
    ];

    /// Position in INVEST order (0-5)
    pub fn index(self) -> usize {
        match self {
            Criterion::Independent => 0,
            Criterion::Negotiable => 1,
            Criterion::Valuable => 2,
            Criterion::Estimable => 3,
            Criterion::Small => 4,
            Criterion::Testable => 5,
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Independent => write!(f, "Independent"),
            Criterion::Negotiable => write!(f, "Negotiable"),
            Criterion::Valuable => write!(f, "Valuable"),
            Criterion::Estimable => write!(f, "Estimable"),
            Criterion::Small => write!(f, "Small"),
            Criterion::Testable => write!(f, "Testable"),
        }
    }
}

/// Score, rationale and suggestions for a single criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionResult {
    /// Which criterion this result belongs to
    #[serde(rename = "name")]
    pub criterion: Criterion,
    /// Score in 1..=3
    pub score: u8,
    /// Human-readable rationale
    pub feedback: String,
    /// Improvement suggestions, in the order they were produced
    pub suggestions: Vec<String>,
}

impl CriterionResult {
    pub fn new(criterion: Criterion, score: u8, feedback: &str) -> Self {
        Self {
            criterion,
            score,
            feedback: feedback.to_string(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

/// Full INVEST verdict for one story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// One result per criterion, in INVEST order. Serialized as an object
    /// keyed by criterion name, keys in INVEST order.
    #[serde(with = "criteria_map")]
    pub criteria: [CriterionResult; 6],
    /// Sum of the six scores (6-18)
    pub total_score: u8,
    /// total_score / 18 * 100
    pub overall_percentage: f64,
}

impl EvaluationReport {
    /// Build a report from the six criterion results (must be in INVEST order)
    pub fn from_criteria(criteria: [CriterionResult; 6]) -> Self {
        let total_score: u8 = criteria.iter().map(|c| c.score).sum();
        let overall_percentage = analyzer::scoring::percentage(total_score);
        Self {
            criteria,
            total_score,
            overall_percentage,
        }
    }

    /// Result for a single criterion
    pub fn get(&self, criterion: Criterion) -> &CriterionResult {
        &self.criteria[criterion.index()]
    }

    /// Score for a single criterion
    pub fn score_of(&self, criterion: Criterion) -> u8 {
        self.get(criterion).score
    }

    /// Qualitative band for the overall percentage
    pub fn band(&self) -> Band {
        Band::from_percentage(self.overall_percentage)
    }

    /// Iterate results in INVEST order
    pub fn iter(&self) -> impl Iterator<Item = &CriterionResult> {
        self.criteria.iter()
    }
}

mod criteria_map {
    use super::{Criterion, CriterionResult};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        criteria: &[CriterionResult; 6],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(criteria.len()))?;
        for result in criteria {
            map.serialize_entry(&result.criterion.to_string(), result)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[CriterionResult; 6], D::Error> {
        let mut by_name = HashMap::<String, CriterionResult>::deserialize(deserializer)?;
        let mut take = |criterion: Criterion| {
            by_name
                .remove(&criterion.to_string())
                .filter(|result| result.criterion == criterion)
                .ok_or_else(|| D::Error::custom(format!("missing criterion: {}", criterion)))
        };
        Ok([
            take(Criterion::Independent)?,
            take(Criterion::Negotiable)?,
            take(Criterion::Valuable)?,
            take(Criterion::Estimable)?,
            take(Criterion::Small)?,
            take(Criterion::Testable)?,
        ])
    }
}

/// Qualitative band for the overall percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Band {
    /// 80% and above
    Excellent,
    /// 60% up to (not including) 80%
    Good,
    /// Below 60%
    NeedsWork,
}

impl Band {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Band::Excellent
        } else if percentage >= 60.0 {
            Band::Good
        } else {
            Band::NeedsWork
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Band::Excellent => "🟢",
            Band::Good => "🟡",
            Band::NeedsWork => "🔴",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Excellent => write!(f, "excellent"),
            Band::Good => write!(f, "good"),
            Band::NeedsWork => write!(f, "needs work"),
        }
    }
}

/// Extract structural signals from a story. Never fails.
pub fn analyze(story: &str) -> StructuralSignals {
    analyzer::StructureAnalyzer::analyze(story)
}

/// Score a story against the INVEST criteria using previously extracted signals.
///
/// Blank input should be rejected by the caller before reaching this point;
/// it is still scored (all criteria low) if passed in.
pub fn score(story: &str, signals: StructuralSignals) -> EvaluationReport {
    analyzer::InvestScorer::score(story, signals)
}

/// `score(story, analyze(story))`
pub fn evaluate(story: &str) -> EvaluationReport {
    score(story, analyze(story))
}
