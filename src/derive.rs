//! Sentence segmentation and heuristic task derivation.
//!
//! Segmentation is purely lexical: a sentence ends at `.`, `!` or `?` followed
//! by whitespace. Abbreviations ("e.g. this"), decimals followed by a space and
//! quoted punctuation all split too. That is a known limit of the heuristic.
//!
//! Derivation turns sentences into two candidate lists:
//! - macro tasks, rephrased into an imperative voice;
//! - overlooked tasks, picked out by risk/uncertainty keywords.
//!
//! Both are pure functions. De-duplication happens in the caller.

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

/// Modal and status words removed from overlooked candidates. "follow-up" and
/// "tie-back" stay since they read as nouns after the "Ensure follow-up on" lead.
static OVERLOOK_STRIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:shouldn't|should|needs|need|mustn't|must|pending|blocked|waiting|awaiting|unresolved|delayed|risks|risk)\b",
    )
    .expect("valid regex")
});

/// First words that already read as an instruction.
pub const ACTION_VERBS: [&str; 11] = [
    "lead",
    "drive",
    "coordinate",
    "own",
    "ensure",
    "deliver",
    "ship",
    "validate",
    "plan",
    "oversee",
    "accelerate",
];

/// Substrings that flag a sentence as a possible overlooked task.
pub const OVERLOOK_KEYWORDS: [&str; 12] = [
    "should",
    "need",
    "must",
    "pending",
    "blocked",
    "waiting",
    "awaiting",
    "unresolved",
    "delayed",
    "follow-up",
    "tie-back",
    "risk",
];

/// Pluggable strategy that turns sentences into candidate task strings.
pub trait TaskExtractor: Send + Sync {
    fn macro_tasks(&self, sentences: &[String]) -> Vec<String>;
    fn overlooked_tasks(&self, sentences: &[String], project: Option<&str>) -> Vec<String>;
}

/// Keyword and verb heuristics; the default extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl TaskExtractor for HeuristicExtractor {
    fn macro_tasks(&self, sentences: &[String]) -> Vec<String> {
        derive_macro_tasks(sentences)
    }

    fn overlooked_tasks(&self, sentences: &[String], project: Option<&str>) -> Vec<String> {
        derive_overlooked_tasks(sentences, project)
    }
}

/// Split text into trimmed, non-empty sentence-like pieces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK.find_iter(text) {
        // Terminal punctuation is ASCII, so +1 stays on a char boundary.
        push_trimmed(&mut out, &text[start..m.start() + 1]);
        start = m.end();
    }
    push_trimmed(&mut out, &text[start..]);
    out
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Sentences of more than three words, rephrased as instructions.
pub fn derive_macro_tasks(sentences: &[String]) -> Vec<String> {
    sentences
        .iter()
        .filter(|s| s.split_whitespace().count() > 3)
        .filter_map(|s| shape_macro_task(s))
        .collect()
}

/// Keep sentences that start with an action verb, prefix the rest with "Drive".
pub fn shape_macro_task(sentence: &str) -> Option<String> {
    let sentence = trim_terminal(sentence.trim());
    let first_word = sentence.split_whitespace().next()?.to_lowercase();
    let cased = capitalize(sentence);
    if ACTION_VERBS.contains(&first_word.as_str()) {
        Some(format!("{cased}."))
    } else {
        Some(format!("Drive {cased}."))
    }
}

/// Follow-ups for sentences mentioning a risk keyword, with a generic prompt
/// when nothing matches so the list is never empty.
pub fn derive_overlooked_tasks(sentences: &[String], project: Option<&str>) -> Vec<String> {
    let mut tasks = Vec::new();
    for sentence in sentences {
        let lowered = sentence.to_lowercase();
        if !OVERLOOK_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            continue;
        }
        let stripped = OVERLOOK_STRIP.replace_all(sentence, "");
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        let cleaned = trim_terminal(&collapsed).trim();
        if cleaned.is_empty() {
            continue;
        }
        tasks.push(format!("Ensure follow-up on {cleaned}."));
    }
    if tasks.is_empty() {
        let target = project.unwrap_or("this initiative");
        tasks.push(format!(
            "Confirm metrics, risks, and stakeholder alignment for {target} before the next sync."
        ));
    }
    tasks
}

fn trim_terminal(s: &str) -> &str {
    s.trim_end_matches(['.', '!', '?'])
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sentences(text: &str) -> Vec<String> {
        split_sentences(text)
    }

    #[test]
    fn test_split_on_terminal_punctuation() {
        assert_eq!(
            sentences("Ship it!  Then what?\nWe wait. done"),
            vec!["Ship it!", "Then what?", "We wait.", "done"]
        );
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn test_split_is_lexical_only() {
        // Abbreviations split; decimals without a following space do not.
        assert_eq!(
            sentences("Talk to Dr. Smith about 3.5 points."),
            vec!["Talk to Dr.", "Smith about 3.5 points."]
        );
    }

    #[test]
    fn test_macro_tasks_keep_action_verbs() {
        let tasks = derive_macro_tasks(&sentences(
            "Lead the Q3 rollout across three regions. the dashboard refresh is going well! Too short.",
        ));
        assert_eq!(
            tasks,
            vec![
                "Lead the Q3 rollout across three regions.",
                "Drive The dashboard refresh is going well.",
            ]
        );
    }

    #[test]
    fn test_macro_tasks_skip_three_words_or_less() {
        assert!(derive_macro_tasks(&sentences("Ship the page. Done and dusted.")).is_empty());
        assert_eq!(
            shape_macro_task("validate numbers with finance?!"),
            Some("Validate numbers with finance.".to_string())
        );
    }

    #[test]
    fn test_overlooked_strips_keyword() {
        let tasks = derive_overlooked_tasks(
            &sentences("We should follow-up on the vendor contract. Lead the Q3 rollout across three regions."),
            Some("Atlas"),
        );
        assert_eq!(tasks, vec!["Ensure follow-up on We follow-up on the vendor contract."]);
    }

    #[test]
    fn test_overlooked_variants_and_case() {
        let tasks = derive_overlooked_tasks(
            &sentences("Legal NEEDS to sign the DPA. Budget is Blocked by procurement."),
            None,
        );
        assert_eq!(
            tasks,
            vec![
                "Ensure follow-up on Legal to sign the DPA.",
                "Ensure follow-up on Budget is by procurement.",
            ]
        );
    }

    #[test]
    fn test_overlooked_fallback_mentions_project() {
        let none = derive_overlooked_tasks(&sentences("All green this week."), None);
        assert_eq!(
            none,
            vec!["Confirm metrics, risks, and stakeholder alignment for this initiative before the next sync."]
        );
        let named = derive_overlooked_tasks(&[], Some("Atlas"));
        assert!(named[0].contains("for Atlas before"));
    }

    #[test]
    fn test_keyword_only_sentence_is_skipped() {
        // Nothing left after stripping, so the fallback kicks in.
        let tasks = derive_overlooked_tasks(&sentences("Pending."), Some("Atlas"));
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].starts_with("Confirm metrics"));
    }

    #[test]
    fn test_heuristic_extractor_delegates() {
        let extractor: Box<dyn TaskExtractor> = Box::new(HeuristicExtractor);
        let s = sentences("Coordinate the partner webinar next Tuesday.");
        assert_eq!(extractor.macro_tasks(&s), derive_macro_tasks(&s));
        assert_eq!(extractor.overlooked_tasks(&s, None), derive_overlooked_tasks(&s, None));
    }
}
