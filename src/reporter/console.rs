//! Console reporter with colored output

use crate::analyzer::engine::{AggregateStats, Evaluation};
use crate::analyzer::scoring::{ScoreCalculator, MAX_CRITERION_SCORE, MAX_TOTAL_SCORE};
use crate::suggestions::AiCommentary;
use crate::{Band, CriterionResult, StructuralSignals};
use colored::Colorize;
use std::fmt::Write;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Report a single evaluation
    pub fn report(&self, evaluation: &Evaluation) {
        print!("{}", self.format_report(evaluation));
    }

    /// Report multiple evaluations with summary
    pub fn report_many(&self, evaluations: &[Evaluation], stats: &AggregateStats) {
        for evaluation in evaluations {
            self.report(evaluation);
            println!("{}", "─".repeat(60));
        }

        print!("{}", self.format_summary(stats));
    }

    /// Report in quiet mode (just percentage and band)
    pub fn report_quiet(&self, evaluation: &Evaluation) {
        println!("{}", self.format_quiet(evaluation));
    }

    /// `name: 88.9% (excellent)`
    pub fn format_quiet(&self, evaluation: &Evaluation) -> String {
        let band = evaluation.report.band();
        format!(
            "{}: {:.1}% ({})",
            evaluation.display_name(),
            evaluation.report.overall_percentage,
            self.paint_band(&band.to_string(), band)
        )
    }

    /// Full multi-line rendering of one evaluation
    pub fn format_report(&self, evaluation: &Evaluation) -> String {
        let mut out = String::new();
        let report = &evaluation.report;

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            self.bold(&format!("📋 INVEST Evaluation: {}", evaluation.display_name()))
        );
        let _ = writeln!(
            out,
            "   Words: {} | Sentences: {} | Format: {}",
            evaluation.signals.word_count,
            evaluation.signals.sentence_count,
            if evaluation.signals.has_user_story_format {
                "As a / I want / So that"
            } else {
                "free text"
            }
        );
        let _ = writeln!(out);

        if self.verbose {
            self.write_signals(&mut out, &evaluation.signals);
        }

        let _ = writeln!(out, "   {}", self.bold("INVEST Criteria:"));
        for result in report.iter() {
            self.write_criterion(&mut out, result);
        }
        let _ = writeln!(out);

        let band = report.band();
        let _ = writeln!(
            out,
            "   Overall: {} {} ({}/{})",
            band.emoji(),
            self.bold(&self.paint_band(
                &format!(
                    "{} {:.1}%",
                    band.to_string().to_uppercase(),
                    report.overall_percentage
                ),
                band
            )),
            report.total_score,
            MAX_TOTAL_SCORE
        );
        let _ = writeln!(out, "   {}", self.dim(ScoreCalculator::band_description(band)));
        let _ = writeln!(out);

        if band != Band::Excellent {
            let _ = writeln!(out, "   {}", self.bold("Recommendations:"));
            for rec in ScoreCalculator::recommendations(report).iter().take(3) {
                let _ = writeln!(out, "   {} {}", self.cyan("→"), rec);
            }
            let _ = writeln!(out);
        }

        if let Some(ai) = &evaluation.ai {
            self.write_ai(&mut out, ai);
        }

        out
    }

    /// Summary block for multiple evaluations
    pub fn format_summary(&self, stats: &AggregateStats) -> String {
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "═".repeat(60));
        let _ = writeln!(out, "{}", self.bold("Summary"));
        let _ = writeln!(out, "{}", "═".repeat(60));
        let _ = writeln!(
            out,
            "   Stories evaluated: {}",
            self.bold(&stats.stories_evaluated.to_string())
        );
        let _ = writeln!(
            out,
            "   Average score:     {} ({})",
            self.bold(&format!("{:.1}%", stats.average_percentage)),
            self.paint_band(&stats.band.to_string(), stats.band)
        );
        let _ = writeln!(out, "   Total suggestions: {}", stats.total_suggestions);
        let _ = writeln!(out);
        out
    }

    fn write_signals(&self, out: &mut String, signals: &StructuralSignals) {
        let _ = writeln!(out, "   {}", self.bold("Structure:"));
        let flags = [
            ("Persona (As a ...)", signals.has_persona),
            ("Action (I want ...)", signals.has_action),
            ("Value (so that ...)", signals.has_value),
            ("Acceptance criteria", signals.has_acceptance_criteria),
            ("User story format", signals.has_user_story_format),
        ];
        for (name, present) in flags {
            let mark = if present {
                self.paint_band("✓", Band::Excellent)
            } else {
                self.paint_band("✗", Band::NeedsWork)
            };
            let _ = writeln!(out, "   {} {}", mark, name);
        }
        let _ = writeln!(out);
    }

    fn write_criterion(&self, out: &mut String, result: &CriterionResult) {
        let bar = self.create_score_bar(result.score);
        let _ = writeln!(
            out,
            "   {} ({}/{}) {}",
            bar,
            result.score,
            MAX_CRITERION_SCORE,
            self.bold(&result.criterion.to_string())
        );
        let _ = writeln!(out, "       {}", result.feedback);
        for suggestion in &result.suggestions {
            let _ = writeln!(out, "       {} {}", self.dim("→"), self.italic(suggestion));
        }
    }

    fn write_ai(&self, out: &mut String, ai: &AiCommentary) {
        let _ = writeln!(out, "   {}", self.bold("🤖 AI Analysis:"));
        for line in ai.analysis.lines() {
            let _ = writeln!(out, "   {}", line);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "   {}", self.bold("✨ Improved Story:"));
        for line in ai.improved_story.lines() {
            let _ = writeln!(out, "   {}", line);
        }
        let _ = writeln!(out);
    }

    fn create_score_bar(&self, score: u8) -> String {
        let filled = usize::from(score.min(MAX_CRITERION_SCORE));
        let empty = usize::from(MAX_CRITERION_SCORE) - filled;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));

        let band = match score {
            3 => Band::Excellent,
            2 => Band::Good,
            _ => Band::NeedsWork,
        };
        self.paint_band(&bar, band)
    }

    fn paint_band(&self, text: &str, band: Band) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match band {
            Band::Excellent => text.green().to_string(),
            Band::Good => text.yellow().to_string(),
            Band::NeedsWork => text.red().to_string(),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn italic(&self, text: &str) -> String {
        if self.use_colors {
            text.italic().to_string()
        } else {
            text.to_string()
        }
    }

    fn cyan(&self, text: &str) -> String {
        if self.use_colors {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{EvaluationRequest, StoryEvaluator};

    fn eval(story: &str) -> Evaluation {
        StoryEvaluator::new()
            .evaluate(&EvaluationRequest::new(story).label("story.txt"))
            .unwrap()
    }

    #[test]
    fn test_quiet_line() {
        let e = eval("As a customer, I want to view my order history so that I can track my purchases");
        let line = ConsoleReporter::new().without_colors().format_quiet(&e);
        assert_eq!(line, "story.txt: 88.9% (excellent)");
    }

    #[test]
    fn test_report_bars_and_band() {
        let e = eval("Add login feature");
        let text = ConsoleReporter::new().without_colors().format_report(&e);
        assert!(text.contains("█░░ (1/3) Independent"));
        assert!(text.contains("██░ (2/3) Negotiable"));
        assert!(text.contains("NEEDS WORK 38.9%"));
        assert!(text.contains("(7/18)"));
        assert!(text.contains("Recommendations:"));
        assert!(!text.contains("Structure:"));
    }

    #[test]
    fn test_verbose_shows_signals() {
        let e = eval("As a user, I want to export data");
        let text = ConsoleReporter::new()
            .without_colors()
            .verbose()
            .format_report(&e);
        assert!(text.contains("Structure:"));
        assert!(text.contains("✓ Persona"));
        assert!(text.contains("✗ Acceptance criteria"));
    }

    #[test]
    fn test_excellent_story_has_no_recommendations() {
        let e = eval(
            "As a shopper, I want to save items to a wishlist so that I can buy them later on. \
             Given I am signed in, when I tap the heart icon, then the item appears in my list.",
        );
        let text = ConsoleReporter::new().without_colors().format_report(&e);
        assert!(text.contains("███ (3/3) Testable"));
        assert!(text.contains("EXCELLENT 100.0%"));
        assert!(!text.contains("Recommendations:"));
    }

    #[test]
    fn test_summary() {
        let evals = vec![eval("Add login feature"), eval("Add logout feature")];
        let stats = StoryEvaluator::aggregate_stats(&evals);
        let text = ConsoleReporter::new().without_colors().format_summary(&stats);
        assert!(text.contains("Stories evaluated: 2"));
        assert!(text.contains("38.9% (needs work)"));
    }
}
