use std::sync::LazyLock;

use regex::Regex;

pub const PLACEHOLDER: &str = "[redacted]";
pub const SUMMARY_MAX_CHARS: usize = 50;
const ELLIPSIS: &str = "...";

const PII_SOURCES: [&str; 8] = [
    r"(?i)\bhttps?://\S+|\bwww\.\S+",
    r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
    r"\B@[A-Za-z0-9_]{2,}",
    r"(?i)\b(?:id|ref|order|txn|ticket|account|a/c)\s*(?:no\.?|number|#)?\s*[:#-]?\s*[A-Za-z0-9-]*\d[A-Za-z0-9-]*",
    r"\b[A-Z]{2,}[0-9]{4,}[A-Z0-9]*\b",
    r"\b\d{6,}\b",
    r"\b(?i:my name is|name\s*:|regards,?|thanks,|signed,?)\s*[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*",
    r"\b(?:Mr|Mrs|Ms|Dr|Shri|Smt)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*",
];

/// Digits grouped by spaces, dots, dashes or parentheses. Counted and
/// checked against `DATE_SHAPE` before being treated as a phone number.
const PHONE_SOURCE: &str = r"\+?\(?\b\d+(?:[ \t().-]{1,2}\d+)*";
const DATE_SOURCE: &str = r"\d{4}[-.]\d{1,2}[-.]\d{1,2}|\d{1,2}[-.]\d{1,2}[-.]\d{4}";
const PHONE_MIN_DIGITS: usize = 7;

// Applied in order: broad shapes (URLs, emails) before the digit patterns
// that would otherwise split them.
static PII_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PII_SOURCES
        .iter()
        .map(|pattern| Regex::new(pattern).expect("PII pattern must compile"))
        .collect()
});

static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PHONE_SOURCE).expect("phone pattern must compile"));

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATE_SOURCE).expect("date pattern must compile"));

fn scrub_phones(text: &str) -> String {
    PHONE_SHAPE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let candidate = &caps[0];
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            if digits >= PHONE_MIN_DIGITS && !DATE_SHAPE.is_match(candidate) {
                PLACEHOLDER.to_string()
            } else {
                candidate.to_string()
            }
        })
        .into_owned()
}

/// Replaces contact details, identifiers and self-introductions with a
/// placeholder, keeping the layout of `text`.
pub fn scrub(text: &str) -> String {
    let mut output = text.to_string();
    for pattern in PII_PATTERNS.iter() {
        output = pattern.replace_all(&output, PLACEHOLDER).into_owned();
    }
    scrub_phones(&output)
}

/// `scrub`, folded onto one line.
pub fn redact(text: &str) -> String {
    one_line(&scrub(text))
}

pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps `text` at `max_chars` characters in total, ending with "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = text.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Redacted one-line summary within the summary budget.
pub fn summary_line(text: &str) -> String {
    truncate_chars(&redact(text), SUMMARY_MAX_CHARS)
}

/// Text safe to embed ahead of the trailing email block: braces would move
/// the block's opening delimiter.
pub fn strip_braces(text: &str) -> String {
    text.replace('{', "(").replace('}', ")")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max_words` words of `text`, with "..." appended when cut.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    format!("{}...", words[..max_words].join(" "))
}

/// Keeps at most `budget` words, cutting inside the line that crosses it
/// and dropping everything after.
pub fn cap_words_by_line(text: &str, budget: usize) -> String {
    let mut remaining = budget;
    let mut kept = Vec::new();

    for line in text.lines() {
        let words = line.split_whitespace().count();
        if words <= remaining {
            kept.push(line.to_string());
            remaining -= words;
            continue;
        }
        if remaining > 0 {
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            let cut: Vec<&str> = line.split_whitespace().take(remaining).collect();
            kept.push(format!("{indent}{}...", cut.join(" ")));
        }
        break;
    }

    kept.join("\n").trim_end().to_string()
}
