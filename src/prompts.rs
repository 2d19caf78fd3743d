use std::fmt::Write;

use crate::models::{TaggedReview, Theme, ThemeStat};

/// Tagged rows rendered into the pulse prompt; bounds prompt size only.
pub const PROMPT_REVIEW_CAP: usize = 150;

pub fn classifier_system(app_name: &str) -> String {
    let mut legend = String::new();
    for (index, theme) in Theme::ALL.iter().enumerate() {
        let _ = writeln!(legend, "  {}) {}", index + 1, theme);
    }

    format!(
        r#"You are an insights analyst for the {app_name}.
You read app reviews and assign:
- ONE theme label from this legend:
{legend}If nothing fits perfectly, choose the closest theme.

Sentiment must be exactly one of:
- POSITIVE
- NEGATIVE
- MIXED
- NEUTRAL

Never include or invent PII like names, emails, phone numbers, or IDs."#
    )
}

pub fn classifier_user(full_text: &str, rating: i32) -> String {
    let themes: Vec<&str> = Theme::ALL.iter().map(|theme| theme.label()).collect();
    format!(
        r#"Review text:
"{text}"
Rating: {rating}

Task:
1. Choose ONE theme from: {themes}.
2. Choose ONE sentiment: POSITIVE, NEGATIVE, MIXED, NEUTRAL.
3. Write ONE 1-line summary in plain English, at most 50 characters. Do not include PII.

Return ONLY valid JSON:
{{
  "theme": "<one of the 5 themes>",
  "sentiment": "<POSITIVE/NEGATIVE/MIXED/NEUTRAL>",
  "summary_1line": "<1-line summary>"
}}"#,
        text = full_text.replace('"', "'"),
        themes = themes.join(", "),
    )
}

pub fn pulse_system(app_name: &str) -> String {
    format!(
        r#"You are writing a weekly product pulse for the {app_name}, for product, growth, support, and leadership.

Constraints:
- Max 5 themes overall.
- Weekly note must be at most 250 words.
- Use real user quotes, but paraphrase lightly and REMOVE any usernames, emails, phone numbers, or IDs.
- Output: (1) a readable note, (2) a JSON block for email subject & body."#
    )
}

pub fn pulse_user(app_name: &str, stats: &[ThemeStat], reviews: &[TaggedReview], week: &str) -> String {
    format!(
        r#"Week starting: {week}

Theme stats:
{stats_table}
Tagged reviews (theme, sentiment, rating, full_text, summary_1line):
{reviews_table}
Task:
1. Pick the Top 3 themes (by review volume, then negative share).
2. For the weekly note (at most 250 words total), write:
"{app_name} – Weekly Review Pulse (Week of {week})"
- 2-3 bullet Executive summary
- A short section Top Themes:
  - 3 themes, each with:
    - 1-2 sentence summary
    - 1 short user quote (paraphrased, no PII)
- 3 action ideas total (label each `[Action]`).
3. After the note, output a JSON block:
{{
  "email_subject": "<short subject line>",
  "email_body": "<plain-text email body including the note>"
}}

Rules:
- Do NOT exceed 250 words for the note.
- Do NOT include any usernames, emails, phone numbers, or IDs.
- Do NOT use curly braces anywhere except the final JSON block."#,
        stats_table = stats_table(stats),
        reviews_table = reviews_table(reviews),
    )
}

pub fn stats_table(stats: &[ThemeStat]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| theme | review_count | avg_rating | negative_count | neg_share |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for stat in stats {
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} | {} | {:.2} |",
            stat.theme, stat.review_count, stat.avg_rating, stat.negative_count, stat.neg_share
        );
    }
    output
}

/// First `PROMPT_REVIEW_CAP` tagged rows as a markdown table.
pub fn reviews_table(reviews: &[TaggedReview]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| theme | sentiment | rating | full_text | summary_1line |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for review in reviews.iter().take(PROMPT_REVIEW_CAP) {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            review.theme,
            review.sentiment,
            review.review.rating,
            cell(&review.review.full_text),
            cell(&review.summary_1line)
        );
    }
    output
}

fn cell(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{full_text, week_start};
    use crate::models::{CleanedReview, Sentiment};
    use chrono::NaiveDate;

    fn tagged(index: usize) -> TaggedReview {
        let date = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let text = format!("review {index} | with pipe\nand newline");
        TaggedReview {
            review: CleanedReview {
                date,
                rating: 3,
                review_text: text.clone(),
                review_title: None,
                week_start: week_start(date),
                full_text: full_text(None, &text),
            },
            theme: Theme::PaymentsSip,
            sentiment: Sentiment::Neutral,
            summary_1line: format!("summary {index}"),
        }
    }

    #[test]
    fn review_table_is_capped() {
        let reviews: Vec<TaggedReview> = (0..200).map(tagged).collect();
        let table = reviews_table(&reviews);
        // header + separator + capped rows
        assert_eq!(table.lines().count(), 2 + PROMPT_REVIEW_CAP);
        assert!(table.contains("summary 149"));
        assert!(!table.contains("summary 150"));
    }

    #[test]
    fn cells_stay_on_one_row() {
        let table = reviews_table(&[tagged(1)]);
        assert!(table.contains("review 1 \\| with pipe and newline"));
    }

    #[test]
    fn pulse_prompt_names_the_week() {
        let prompt = pulse_user("Groww App", &[], &[], "2025-11-17");
        assert!(prompt.contains("Week starting: 2025-11-17"));
        assert!(prompt.contains("Groww App – Weekly Review Pulse (Week of 2025-11-17)"));
    }

    #[test]
    fn classifier_system_lists_legend() {
        let prompt = classifier_system("Groww app");
        for theme in Theme::ALL {
            assert!(prompt.contains(theme.label()));
        }
    }
}
