use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::WeeklyReport;
use crate::redact::strip_braces;

const BLOCK_OPEN: char = '{';

/// How the trailing block of a synthesized text was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    NoDelimiter,
    MalformedPayload,
    WellFormed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub report: WeeklyReport,
    pub outcome: ExtractOutcome,
}

#[derive(Serialize)]
struct EmailBlock<'a> {
    email_subject: &'a str,
    email_body: &'a str,
}

/// Splits narrative from the last top-level `{...}` object in `text`.
///
/// No `{` at all keeps the whole text as the note. A `{` whose suffix is not
/// a JSON object also keeps the whole text, broken fragment included. Only a
/// well-formed suffix yields subject and body; absent keys become "".
pub fn extract_report(text: &str) -> Extraction {
    let Some(start) = text.rfind(BLOCK_OPEN) else {
        debug!("No structured block in synthesized text");
        return Extraction {
            report: note_only(text),
            outcome: ExtractOutcome::NoDelimiter,
        };
    };

    match serde_json::from_str::<Map<String, Value>>(&text[start..]) {
        Ok(payload) => Extraction {
            report: WeeklyReport {
                weekly_note: trim_note(&text[..start]),
                email_subject: string_field(&payload, "email_subject"),
                email_body: string_field(&payload, "email_body"),
            },
            outcome: ExtractOutcome::WellFormed,
        },
        Err(err) => {
            warn!("Structured block did not parse, keeping full text as note: {}", err);
            Extraction {
                report: note_only(text),
                outcome: ExtractOutcome::MalformedPayload,
            }
        }
    }
}

/// Appends the email block after `narrative` in the shape `extract_report`
/// reads. Braces inside the values become parentheses so the block's own
/// `{` stays the last one in the text.
pub fn append_email_block(narrative: &str, subject: &str, body: &str) -> anyhow::Result<String> {
    let block = serde_json::to_string_pretty(&EmailBlock {
        email_subject: &strip_braces(subject),
        email_body: &strip_braces(body),
    })?;
    Ok(format!("{}\n\n{}\n", narrative.trim_end(), block))
}

fn note_only(text: &str) -> WeeklyReport {
    WeeklyReport {
        weekly_note: text.to_string(),
        email_subject: String::new(),
        email_body: String::new(),
    }
}

fn trim_note(prefix: &str) -> String {
    prefix
        .trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '=' | '`'))
        .to_string()
}

fn string_field(payload: &Map<String, Value>, key: &str) -> String {
    match payload.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(other) => other.to_string(),
    }
}
