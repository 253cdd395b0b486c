//! Parse AI rewrites and optionally write the improved story back to its file.

use colored::Colorize;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;

/// Section headers, matched case-insensitively against the raw reply
fn headers() -> &'static (Regex, Regex) {
    static HEADERS: OnceLock<(Regex, Regex)> = OnceLock::new();
    HEADERS.get_or_init(|| {
        (
            Regex::new(r"(?i)improved\s+story:").expect("built-in pattern compiles"),
            Regex::new(r"(?i)acceptance\s+criteria:").expect("built-in pattern compiles"),
        )
    })
}

/// An AI rewrite split into its two sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedStory {
    pub story: String,
    pub acceptance_criteria: String,
}

impl ImprovedStory {
    /// Split a response formatted as "IMPROVED STORY: ... ACCEPTANCE CRITERIA: ...".
    /// Headers are matched case-insensitively and may be wrapped in markdown emphasis.
    /// Returns None when the story header is missing or its section is empty.
    pub fn parse(output: &str) -> Option<Self> {
        let (story_header, criteria_header) = headers();

        let story_start = story_header.find(output)?.end();
        let rest = &output[story_start..];
        let criteria = criteria_header.find(rest);

        let story_end = criteria.map_or(rest.len(), |m| m.start());
        let story = clean_section(&rest[..story_end]);
        if story.is_empty() {
            return None;
        }

        let acceptance_criteria = criteria
            .map(|m| clean_section(&rest[m.end()..]))
            .unwrap_or_default();

        Some(Self {
            story,
            acceptance_criteria,
        })
    }
}

fn clean_section(section: &str) -> String {
    section
        .trim()
        .trim_start_matches('*')
        .trim_end_matches('*')
        .trim()
        .to_string()
}

/// Offer to replace a story file with the improved story. Returns true if applied.
///
/// Note: This function reads from stdin interactively and is not easily unit-testable.
pub fn offer_apply(path: &Path, current: &str, suggested: &str) -> io::Result<bool> {
    if current.trim() == suggested.trim() {
        return Ok(false);
    }

    println!("\n{}\n{}", "Current story:".dimmed(), current.trim());
    println!("\n{}\n{}", "Suggested story:".bold(), suggested.trim());
    print!("Replace {} with the suggested story? [y/N] ", path.display());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_lowercase();

    if answer == "y" || answer == "yes" {
        fs::write(path, format!("{}\n", suggested.trim()))?;
        println!("{}", "Applied.".green());
        Ok(true)
    } else {
        Ok(false)
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    /// Replies mixing headers with text whose case mapping changes byte length
    fn arbitrary_reply() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![
                "IMPROVED STORY:",
                "improved story:",
                "ACCEPTANCE CRITERIA:",
                "Acceptance Criteria:",
                "**",
                "ı",
                "İ",
                "é",
                "ŉ",
                "ß",
                "ﬃ",
                "As a user",
                "\n",
                " ",
            ]),
            0..30,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn parse_never_panics(ref reply in arbitrary_reply()) {
            if let Some(parsed) = ImprovedStory::parse(reply) {
                prop_assert!(!parsed.story.is_empty());
            }
        }

        #[test]
        fn parse_finds_header_in_any_surrounding_text(ref prefix in arbitrary_reply()) {
            let reply = format!("{}\nIMPROVED STORY: As a user, I want x", prefix.replace(':', ""));
            let parsed = ImprovedStory::parse(&reply);
            prop_assert!(parsed.is_some());
        }
    }
}
