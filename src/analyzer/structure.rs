//! Structural signal extraction from raw story text

use crate::StructuralSignals;
use regex::Regex;
use std::sync::OnceLock;

/// Compiled detection patterns. All of them run against the lower-cased story
/// and only test for existence, never position.
struct Patterns {
    user_story: Regex,
    persona: Regex,
    action: Regex,
    value: Regex,
    acceptance: Regex,
    sentence_break: Regex,
}

impl Patterns {
    fn compile() -> Self {
        let re = |p: &str| Regex::new(p).expect("built-in pattern compiles");
        Self {
            // "As a [persona], I want [action] so that [value]"
            user_story: re(r"as\s+a\s+\w+.*?i\s+want\s+.*?so\s+that\s+.*"),
            persona: re(r"as\s+(?:a|an|the)\s+\w+"),
            action: re(r"i\s+(?:want|need|can|should)\s+"),
            // bare "to" is deliberately broad
            value: re(r"so\s+that\s+|in\s+order\s+to\s+|to\s+"),
            acceptance: re(r"given\s+|when\s+|then\s+|acceptance\s+criteria|criteria:"),
            sentence_break: re(r"[.!?]+"),
        }
    }
}

/// Global pattern set (compile once per process).
fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(Patterns::compile)
}

/// Extracts [`StructuralSignals`] from a story
pub struct StructureAnalyzer;

impl StructureAnalyzer {
    /// Analyze the basic structure of a user story
    pub fn analyze(story: &str) -> StructuralSignals {
        let p = patterns();
        // Trailing padding must not complete a phrase like "i want\s+".
        let lower = story.trim().to_lowercase();

        StructuralSignals {
            has_persona: p.persona.is_match(&lower),
            has_action: p.action.is_match(&lower),
            has_value: p.value.is_match(&lower),
            has_acceptance_criteria: p.acceptance.is_match(&lower),
            word_count: story.split_whitespace().count(),
            sentence_count: Self::sentence_count(story),
            has_user_story_format: p.user_story.is_match(&lower),
        }
    }

    /// Segments after splitting on `.`/`!`/`?` runs, including the empty tail:
    /// "A. B." yields 3.
    fn sentence_count(story: &str) -> usize {
        patterns().sentence_break.split(story).count().max(1)
    }
}
