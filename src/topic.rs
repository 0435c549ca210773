//! Topic codec: extracts and reinserts the managed on-call label inside a
//! free-form Slack channel topic.
//!
//! Pure, stateless string functions with no I/O. The codec is deliberately
//! lossy: Slack inline markup is flattened to human-readable text before
//! parsing, and the split heuristic in [`decode`] is only guaranteed correct
//! for topics previously produced by [`encode`].

use std::sync::LazyLock;

use regex::Regex;

/// Label placeholder when no managed label is present in a topic.
pub const NO_LABEL: &str = "none";

/// Remainder placeholder for an empty topic, so an encode of an empty topic
/// still produces a non-empty result.
pub const EMPTY_REMAINDER: &str = ".";

/// Slack caps channel topics at this many characters.
pub const MAX_TOPIC_LEN: usize = 250;

/// Marker appended when a candidate topic is truncated to fit the cap.
const ELLIPSIS: &str = "...";

/// Delimiter separating the managed label from the free-form remainder.
const DELIMITER: char = '|';

/// A topic split into the managed label and the free-form remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTopic {
    /// The label this service owns and rewrites; [`NO_LABEL`] if absent.
    pub current_label: String,
    /// Everything in the topic that is not the managed label.
    pub remainder: String,
}

/// Ordered normalization rules flattening Slack inline markup.
///
/// Slack stores `<mailto:...|...>` link wrappers, `<!subteam^...>` mentions,
/// and `<#C...|name>` channel mentions behind the scenes; each rule keeps
/// only the human-readable payload. The linking aspect is lost, which is
/// accepted legacy behavior.
static NORMALIZE_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"<mailto:([a-zA-Z@.]*)(?:[|a-zA-Z@.]*)>", "$1"),
        (r"<(?:!subteam\^[A-Z0-9|]*)([@A-Za-z-]*)>", "$1"),
        (r"<(?:#[A-Z0-9|]*)([@A-Za-z-]*)>", "#$1"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Flatten Slack inline markup to plain text ahead of structural parsing.
///
/// Applies the fixed rule list in order; unmatched text passes through
/// unchanged.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_owned();
    for (re, replacement) in &*NORMALIZE_RULES {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    text
}

/// Split a normalized topic into managed label and remainder.
///
/// With `n` delimiters present, the topic is right-split on `|` treating the
/// first `max(1, n - 1)` delimiters from the right as separators; the
/// leftmost piece (trimmed) is the label and is removed once, together with
/// its trailing `" |"`, to produce the remainder. An empty topic decodes to
/// the [`NO_LABEL`]/[`EMPTY_REMAINDER`] placeholders, and a topic without
/// any delimiter is all remainder.
///
/// Known limitation: this is a best-effort heuristic, not a grammar. It is
/// correct for topics previously written by [`encode`]; a hand-edited topic
/// containing several unrelated `|` characters may be mis-split. Re-running
/// the sync once yields a stable result thereafter.
#[must_use]
pub fn decode(normalized: &str) -> DecodedTopic {
    if normalized.is_empty() {
        return DecodedTopic {
            current_label: NO_LABEL.to_owned(),
            remainder: EMPTY_REMAINDER.to_owned(),
        };
    }

    let delimiters = normalized.matches(DELIMITER).count();
    if delimiters == 0 {
        return DecodedTopic {
            current_label: NO_LABEL.to_owned(),
            remainder: normalized.to_owned(),
        };
    }

    // Treat max(1, n - 1) delimiters from the right as separators so a '|'
    // inside the schedule name survives in the label piece.
    let separators = delimiters.saturating_sub(1).max(1);
    let label = normalized
        .rsplitn(separators + 1, DELIMITER)
        .last()
        .unwrap_or_default()
        .trim();

    let remainder = normalized
        .replacen(&format!("{label} {DELIMITER}"), "", 1)
        .trim()
        .to_owned();

    let current_label = if label.is_empty() {
        NO_LABEL.to_owned()
    } else {
        label.to_owned()
    };

    DecodedTopic {
        current_label,
        remainder,
    }
}

/// Build the topic string for a new label, preserving the remainder.
///
/// The result is `label + " | " + remainder`, truncated to the first 247
/// characters plus [`ELLIPSIS`] (exactly [`MAX_TOPIC_LEN`] total) when it
/// would exceed the Slack cap. Truncation counts characters, not bytes.
#[must_use]
pub fn encode(label: &str, remainder: &str) -> String {
    let candidate = format!("{label} {DELIMITER} {remainder}");
    if candidate.chars().count() <= MAX_TOPIC_LEN {
        return candidate;
    }

    let mut truncated: String = candidate
        .chars()
        .take(MAX_TOPIC_LEN - ELLIPSIS.len())
        .collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
