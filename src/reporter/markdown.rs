//! Markdown reporter for chat clients and tool responses

use crate::analyzer::engine::Evaluation;
use crate::analyzer::scoring::MAX_CRITERION_SCORE;
use crate::EvaluationReport;
use std::fmt::Write;

/// Renders an evaluation as markdown feedback
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Overall line followed by one block per criterion
    pub fn report(report: &EvaluationReport) -> String {
        let band = report.band();
        let mut out = format!(
            "{} **Overall INVEST Score: {:.1}%** ({})\n\n",
            band.emoji(),
            report.overall_percentage,
            band
        );

        for result in report.iter() {
            let score = result.score.min(MAX_CRITERION_SCORE);
            let bars = format!(
                "{}{}",
                "█".repeat(usize::from(score)),
                "░".repeat(usize::from(MAX_CRITERION_SCORE - score))
            );
            let _ = writeln!(
                out,
                "**{}**: {} ({}/{})",
                result.criterion, bars, result.score, MAX_CRITERION_SCORE
            );
            let _ = writeln!(out, "*{}*", result.feedback);
            if !result.suggestions.is_empty() {
                let _ = writeln!(out, "💡 Suggestions:");
                for suggestion in &result.suggestions {
                    let _ = writeln!(out, "   • {}", suggestion);
                }
            }
            let _ = writeln!(out);
        }

        out
    }

    /// Report plus AI sections when present
    pub fn report_evaluation(evaluation: &Evaluation) -> String {
        let mut out = Self::report(&evaluation.report);
        if let Some(ai) = &evaluation.ai {
            let _ = write!(
                out,
                "## AI Analysis\n\n{}\n\n## Improved Story\n\n{}\n",
                ai.analysis, ai.improved_story
            );
        }
        out
    }
}
