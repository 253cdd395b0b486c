//! JSON reporter for machine-readable output

use crate::analyzer::engine::{AggregateStats, Evaluation};
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Report a single evaluation as JSON
    pub fn report(&self, evaluation: &Evaluation) -> String {
        self.to_json(evaluation, "{}")
    }

    /// Report with summary
    pub fn report_with_summary(&self, evaluations: &[Evaluation], stats: &AggregateStats) -> String {
        let output = JsonOutput {
            results: evaluations,
            summary: stats,
        };
        self.to_json(&output, "{}")
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|_| fallback.to_string())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    results: &'a [Evaluation],
    summary: &'a AggregateStats,
}
