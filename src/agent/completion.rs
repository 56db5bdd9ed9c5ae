use regex::Regex;
use std::sync::OnceLock;

/// How many trailing characters of assistant text are scanned for a
/// completion phrase. Earlier text is ignored so a phrase quoted mid-task
/// does not end the run.
const PHRASE_WINDOW_CHARS: usize = 500;

const COMPLETION_PHRASES: &[&str] = &[
    "task complete",
    "task is complete",
    "task completed",
    "all done",
    "all tasks completed",
    "finished successfully",
    "work is complete",
];

/// What the detector found in a piece of assistant output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    None,
    Phrase,
    MarkdownSummary,
    Both,
}

impl CompletionSignal {
    pub fn is_signaled(&self) -> bool {
        !matches!(self, CompletionSignal::None)
    }
}

fn summary_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mi)(?:^|[.!?]\s+)##+\s*(summary|results?|done|task complete|completed)\b")
            .expect("heading pattern is valid")
    })
}

/// Pure classifier for task-completion evidence. The phrase check looks at
/// the last 500 characters only (case-insensitive); the heading check scans
/// the whole text for summary-style markdown headings at line start or
/// right after a finished sentence, so a heading tacked onto closing prose
/// still counts while a mid-sentence mention does not. The two checks are
/// independent.
pub fn detect(text: &str) -> CompletionSignal {
    let phrase = has_completion_phrase(text);
    let heading = summary_heading_re().is_match(text);

    match (phrase, heading) {
        (true, true) => CompletionSignal::Both,
        (true, false) => CompletionSignal::Phrase,
        (false, true) => CompletionSignal::MarkdownSummary,
        (false, false) => CompletionSignal::None,
    }
}

fn has_completion_phrase(text: &str) -> bool {
    let tail = last_chars(text, PHRASE_WINDOW_CHARS).to_lowercase();
    COMPLETION_PHRASES
        .iter()
        .any(|phrase| tail.contains(phrase))
}

fn last_chars(text: &str, count: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= count {
        return text;
    }
    let skip = char_count - count;
    let (start, _) = text
        .char_indices()
        .nth(skip)
        .unwrap_or((text.len(), ' '));
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal() {
        assert_eq!(detect("still working"), CompletionSignal::None);
        assert_eq!(detect(""), CompletionSignal::None);
    }

    #[test]
    fn test_phrase_only() {
        assert_eq!(detect("That's all done now."), CompletionSignal::Phrase);
        assert_eq!(detect("TASK COMPLETE"), CompletionSignal::Phrase);
    }

    #[test]
    fn test_heading_only() {
        assert_eq!(
            detect("## Summary\nListed the files."),
            CompletionSignal::MarkdownSummary
        );
        assert_eq!(
            detect("intro text\n### Results\ndetails"),
            CompletionSignal::MarkdownSummary
        );
    }

    #[test]
    fn test_both() {
        assert_eq!(
            detect("We are all done! ## Summary\nListed 3 files."),
            CompletionSignal::Both
        );
        assert_eq!(
            detect("All tasks completed.\n## Summary\nEverything worked."),
            CompletionSignal::Both
        );
    }

    #[test]
    fn test_heading_after_sentence_on_same_line() {
        assert_eq!(
            detect("That wraps it up. ## Results\ntwo files changed"),
            CompletionSignal::MarkdownSummary
        );
    }

    #[test]
    fn test_mid_sentence_heading_mention_is_ignored() {
        assert_eq!(
            detect("see the ## summary heading below"),
            CompletionSignal::None
        );
    }

    #[test]
    fn test_phrase_outside_window_is_ignored() {
        let mut text = String::from("task complete was mentioned early. ");
        text.push_str(&"filler ".repeat(200));
        assert_eq!(detect(&text), CompletionSignal::None);
    }

    #[test]
    fn test_phrase_inside_window_is_found() {
        let mut text = "intro ".repeat(300);
        text.push_str("finished successfully");
        assert_eq!(detect(&text), CompletionSignal::Phrase);
    }

    #[test]
    fn test_heading_anywhere_in_long_text() {
        let mut text = String::from("## Summary\nearly heading\n");
        text.push_str(&"filler ".repeat(300));
        assert_eq!(detect(&text), CompletionSignal::MarkdownSummary);
    }

    #[test]
    fn test_detector_is_pure() {
        let text = "all done ## done\nx";
        assert_eq!(detect(text), detect(text));
    }

    #[test]
    fn test_multibyte_text_near_window_boundary() {
        let mut text = "日本語のテキスト".repeat(100);
        text.push_str(" all done");
        assert_eq!(detect(&text), CompletionSignal::Phrase);
    }
}
