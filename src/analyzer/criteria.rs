//! The six INVEST decision tables.
//!
//! Each table is a flat guard chain evaluated top to bottom; the first
//! matching branch decides the score. Keyword checks are plain substring
//! checks against the lower-cased story.

use crate::{Criterion, CriterionResult, StructuralSignals};

/// Words that hint the story leans on another piece of work
const DEPENDENCY_TERMS: [&str; 4] = ["depends on", "requires", "after", "before"];

/// Words that leave no room for negotiation
const RIGID_TERMS: [&str; 6] = [
    "must",
    "shall",
    "will",
    "exactly",
    "precisely",
    "specifically",
];

const FORMAT_HINT: &str =
    "Use standard user story format: 'As a [persona], I want [action] so that [value]'";

fn contains_any(lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| lower.contains(t))
}

/// Independent: can the story stand alone?
pub fn independent(lower: &str, signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Independent;
    if signals.has_user_story_format && !contains_any(lower, &DEPENDENCY_TERMS) {
        CriterionResult::new(c, 3, "Story appears to be independent")
    } else if signals.has_user_story_format {
        CriterionResult::new(c, 2, "Story has dependencies mentioned")
            .with_suggestion("Consider breaking down dependencies into separate stories")
    } else {
        CriterionResult::new(c, 1, "Story structure unclear for independence assessment")
            .with_suggestion(FORMAT_HINT)
    }
}

/// Negotiable: rigid wording is checked before the format.
pub fn negotiable(lower: &str, signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Negotiable;
    if contains_any(lower, &RIGID_TERMS) {
        CriterionResult::new(c, 1, "Story contains rigid language that limits negotiation")
            .with_suggestion("Use more flexible language like 'should' or 'could'")
    } else if signals.has_user_story_format {
        CriterionResult::new(c, 3, "Story uses negotiable language")
    } else {
        CriterionResult::new(c, 2, "Story format could be more negotiable")
            .with_suggestion("Use user story format for better negotiation")
    }
}

/// Valuable: is there a benefit, and a beneficiary?
pub fn valuable(signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Valuable;
    if signals.has_value && signals.has_persona {
        CriterionResult::new(c, 3, "Story clearly states value to user")
    } else if signals.has_value {
        CriterionResult::new(c, 2, "Value stated but persona unclear")
            .with_suggestion("Specify who benefits from this story")
    } else {
        CriterionResult::new(c, 1, "Value proposition unclear")
            .with_suggestion("Add 'so that [benefit]' to explain the value")
    }
}

/// Estimable: enough detail to size the work.
pub fn estimable(signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Estimable;
    if signals.word_count > 20 && signals.has_acceptance_criteria {
        CriterionResult::new(c, 3, "Story has sufficient detail for estimation")
    } else if signals.word_count > 10 {
        CriterionResult::new(c, 2, "Story has basic detail but could use acceptance criteria")
            .with_suggestion("Add acceptance criteria to improve estimability")
    } else {
        CriterionResult::new(c, 1, "Story lacks detail for estimation")
            .with_suggestion("Add more detail and acceptance criteria")
    }
}

/// Small: 10..=50 words is the sweet spot. There is no upper tier.
pub fn small(signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Small;
    match signals.word_count {
        10..=50 => CriterionResult::new(c, 3, "Story is appropriately sized"),
        0..=9 => CriterionResult::new(c, 1, "Story is too small/vague")
            .with_suggestion("Add more detail to make the story meaningful"),
        _ => CriterionResult::new(c, 2, "Story might be too large")
            .with_suggestion("Consider breaking into smaller stories"),
    }
}

/// Testable: an action plus acceptance criteria.
pub fn testable(signals: &StructuralSignals) -> CriterionResult {
    let c = Criterion::Testable;
    if signals.has_acceptance_criteria && signals.has_action {
        CriterionResult::new(c, 3, "Story has clear acceptance criteria")
    } else if signals.has_action {
        CriterionResult::new(c, 2, "Action clear but acceptance criteria missing")
            .with_suggestion("Add Given/When/Then acceptance criteria")
    } else {
        CriterionResult::new(c, 1, "Story lacks testable elements")
            .with_suggestion("Add clear actions and acceptance criteria")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> StructuralSignals {
        StructuralSignals {
            has_persona: true,
            has_action: true,
            has_value: true,
            has_acceptance_criteria: false,
            word_count: 17,
            sentence_count: 1,
            has_user_story_format: true,
        }
    }

    fn words(n: usize) -> StructuralSignals {
        StructuralSignals {
            word_count: n,
            ..StructuralSignals::default()
        }
    }

    #[test]
    fn independent_table() {
        let s = canonical();
        assert_eq!(independent("as a user i want x so that y", &s).score, 3);

        let dep = independent("as a user i want x so that y after login ships", &s);
        assert_eq!(dep.score, 2);
        assert_eq!(dep.suggestions.len(), 1);

        // substring match, not word match
        assert_eq!(independent("as a user i want it afterwards so that", &s).score, 2);

        let no_format = independent("add login", &StructuralSignals::default());
        assert_eq!(no_format.score, 1);
        assert!(no_format.suggestions[0].contains("As a [persona]"));
    }

    #[test]
    fn negotiable_rigid_terms_win_over_format() {
        let s = canonical();
        let r = negotiable("as a user, i must have exactly this feature", &s);
        assert_eq!(r.score, 1);
        assert!(r.suggestions[0].contains("flexible"));

        assert_eq!(negotiable("as a user i want x so that y", &s).score, 3);
        let r = negotiable("add login", &StructuralSignals::default());
        assert_eq!(r.score, 2);
        assert_eq!(r.suggestions.len(), 1);
    }

    #[test]
    fn valuable_table() {
        assert_eq!(valuable(&canonical()).score, 3);

        let value_only = StructuralSignals {
            has_value: true,
            ..StructuralSignals::default()
        };
        let r = valuable(&value_only);
        assert_eq!(r.score, 2);
        assert!(r.suggestions[0].contains("who benefits"));

        let persona_only = StructuralSignals {
            has_persona: true,
            ..StructuralSignals::default()
        };
        assert_eq!(valuable(&persona_only).score, 1);
    }

    #[test]
    fn estimable_table() {
        let detailed = StructuralSignals {
            word_count: 21,
            has_acceptance_criteria: true,
            ..StructuralSignals::default()
        };
        assert_eq!(estimable(&detailed).score, 3);

        let criteria_but_short = StructuralSignals {
            word_count: 20,
            has_acceptance_criteria: true,
            ..StructuralSignals::default()
        };
        assert_eq!(estimable(&criteria_but_short).score, 2);
        assert_eq!(estimable(&words(11)).score, 2);
        assert_eq!(estimable(&words(10)).score, 1);
        assert!(estimable(&words(0)).suggestions[0].contains("more detail"));
    }

    #[test]
    fn small_boundaries() {
        assert_eq!(small(&words(9)).score, 1);
        assert_eq!(small(&words(10)).score, 3);
        assert_eq!(small(&words(50)).score, 3);
        assert_eq!(small(&words(51)).score, 2);
        assert_eq!(small(&words(10_000)).score, 2);
        assert!(small(&words(10)).suggestions.is_empty());
    }

    #[test]
    fn testable_table() {
        let full = StructuralSignals {
            has_action: true,
            has_acceptance_criteria: true,
            ..StructuralSignals::default()
        };
        assert_eq!(testable(&full).score, 3);
        assert_eq!(testable(&canonical()).score, 2);

        let criteria_only = StructuralSignals {
            has_acceptance_criteria: true,
            ..StructuralSignals::default()
        };
        let r = testable(&criteria_only);
        assert_eq!(r.score, 1);
        assert_eq!(r.suggestions, vec!["Add clear actions and acceptance criteria"]);
    }

    #[test]
    fn criterion_tags_match_their_table() {
        let s = canonical();
        assert_eq!(independent("", &s).criterion, Criterion::Independent);
        assert_eq!(negotiable("", &s).criterion, Criterion::Negotiable);
        assert_eq!(valuable(&s).criterion, Criterion::Valuable);
        assert_eq!(estimable(&s).criterion, Criterion::Estimable);
        assert_eq!(small(&s).criterion, Criterion::Small);
        assert_eq!(testable(&s).criterion, Criterion::Testable);
    }
}
