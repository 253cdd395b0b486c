//! Prompt generation for AI story critique and rewriting

use super::client::ChatRequest;
use crate::analyzer::scoring::MAX_CRITERION_SCORE;
use crate::config::AiConfig;
use crate::EvaluationReport;

const ANALYSIS_SYSTEM: &str = "You are an Agile coach and user story expert. \
Provide detailed, constructive feedback on user stories.";

const IMPROVEMENT_SYSTEM: &str =
    "You are an Agile coach. Improve user stories to meet INVEST criteria.";

/// Generator for AI critique and improvement prompts
pub struct StoryPromptGenerator {
    /// Include the rule-based INVEST scores as context
    include_scores: bool,
}

impl StoryPromptGenerator {
    pub fn new() -> Self {
        Self {
            include_scores: true,
        }
    }

    /// Set whether rule-based scores are included
    pub fn include_scores(mut self, include: bool) -> Self {
        self.include_scores = include;
        self
    }

    /// Prompt asking for a free-form critique
    pub fn analysis_prompt(&self, story: &str) -> String {
        format!(
            r#"Analyze this user story for Agile development:

"{}"

Provide a comprehensive critique focusing on:
1. Story structure and clarity
2. INVEST criteria compliance
3. Specific improvement suggestions
4. Potential scope issues

Be constructive and specific in your feedback."#,
            story.trim()
        )
    }

    /// Prompt asking for a rewritten story with acceptance criteria
    pub fn improvement_prompt(&self, story: &str, report: Option<&EvaluationReport>) -> String {
        let scores = match report {
            Some(r) if self.include_scores => Self::format_scores(r),
            _ => String::new(),
        };

        format!(
            r#"Improve this user story to better comply with INVEST criteria:

Original: "{}"
{}
Provide an improved version that:
1. Uses proper user story format
2. Is independent, negotiable, valuable, estimable, small, and testable
3. Includes acceptance criteria
4. Has clear scope and value proposition

Format your response as:
IMPROVED STORY:
[improved story]

ACCEPTANCE CRITERIA:
[criteria]"#,
            story.trim(),
            scores
        )
    }

    /// Chat request for the critique
    pub fn analysis_request(&self, story: &str, config: &AiConfig) -> ChatRequest {
        ChatRequest {
            system: ANALYSIS_SYSTEM.to_string(),
            user: self.analysis_prompt(story),
            max_tokens: config.analysis_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Chat request for the rewrite
    pub fn improvement_request(
        &self,
        story: &str,
        report: Option<&EvaluationReport>,
        config: &AiConfig,
    ) -> ChatRequest {
        ChatRequest {
            system: IMPROVEMENT_SYSTEM.to_string(),
            user: self.improvement_prompt(story, report),
            max_tokens: config.improvement_max_tokens,
            temperature: config.temperature,
        }
    }

    fn format_scores(report: &EvaluationReport) -> String {
        let mut output = format!(
            "\nCurrent rule-based INVEST score: {:.1}% ({})\n",
            report.overall_percentage,
            report.band()
        );
        for c in report.iter() {
            output.push_str(&format!(
                "- {}: {}/{} - {}\n",
                c.criterion, c.score, MAX_CRITERION_SCORE, c.feedback
            ));
        }
        output
    }
}

impl Default for StoryPromptGenerator {
    fn default() -> Self {
        Self::new()
    }
}
