use async_trait::async_trait;
use tracing::{debug, info};

use crate::extract::append_email_block;
use crate::models::{Sentiment, TaggedReview, Theme, ThemeStat};
use crate::redact::{cap_words_by_line, redact, strip_braces, truncate_words, word_count};
use crate::stats::round_ratio;

pub const NOTE_WORD_BUDGET: usize = 250;
pub const TOP_THEME_COUNT: usize = 3;
pub const ACTION_COUNT: usize = 3;
pub const ACTION_MARKER: &str = "[Action]";
const QUOTE_MAX_WORDS: usize = 14;
const APP_NAME_MAX_WORDS: usize = 8;

/// Writes the weekly narrative followed by its trailing email block.
#[async_trait]
pub trait PulseSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        stats: &[ThemeStat],
        reviews: &[TaggedReview],
        week: &str,
    ) -> anyhow::Result<String>;
}

pub fn header_line(app_name: &str, week: &str) -> String {
    format!("{app_name} – Weekly Review Pulse (Week of {week})")
}

pub fn default_subject(week: &str) -> String {
    format!("Weekly App Review Pulse - {week}")
}

/// Deterministic note built from the ranked stats.
#[derive(Debug, Clone)]
pub struct TemplateSynthesizer {
    app_name: String,
}

impl TemplateSynthesizer {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name
                .split_whitespace()
                .take(APP_NAME_MAX_WORDS)
                .map(strip_braces)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Never longer than `NOTE_WORD_BUDGET` words, whatever the inputs.
    pub fn compose_note(&self, stats: &[ThemeStat], reviews: &[TaggedReview], week: &str) -> String {
        let note = self.render_note(stats, reviews, week);
        cap_words_by_line(&note, NOTE_WORD_BUDGET)
    }

    fn render_note(&self, stats: &[ThemeStat], reviews: &[TaggedReview], week: &str) -> String {
        let header = header_line(&self.app_name, week);
        if stats.is_empty() {
            return format!(
                "{header}\n\nNo reviews were recorded for this week, so there are no themes to report."
            );
        }

        let mut note = Note {
            header,
            summary: executive_summary(stats, reviews),
            themes: stats
                .iter()
                .take(TOP_THEME_COUNT)
                .map(|stat| ThemeSection {
                    theme: stat.theme,
                    summary: theme_summary(stat),
                    quote: pick_quote(reviews, stat),
                })
                .collect(),
            actions: actions_for(stats),
        };
        note.fit(NOTE_WORD_BUDGET);
        note.render()
    }
}

impl Default for TemplateSynthesizer {
    fn default() -> Self {
        Self::new("Groww App")
    }
}

#[async_trait]
impl PulseSynthesizer for TemplateSynthesizer {
    async fn synthesize(
        &self,
        stats: &[ThemeStat],
        reviews: &[TaggedReview],
        week: &str,
    ) -> anyhow::Result<String> {
        let note = self.compose_note(stats, reviews, week);
        info!("Composed weekly note with {} words", word_count(&note));
        append_email_block(&note, &default_subject(week), &note)
    }
}

#[derive(Debug)]
struct ThemeSection {
    theme: Theme,
    summary: String,
    quote: Option<String>,
}

#[derive(Debug)]
struct Note {
    header: String,
    summary: Vec<String>,
    themes: Vec<ThemeSection>,
    actions: Vec<String>,
}

impl Note {
    fn render(&self) -> String {
        let mut lines = vec![self.header.clone(), String::new(), "• Executive summary".to_string()];
        lines.extend(self.summary.iter().map(|bullet| format!("  - {bullet}")));
        lines.push(String::new());
        lines.push("• Top Themes".to_string());
        for (index, section) in self.themes.iter().enumerate() {
            let mut line = format!("  {}. {}: {}", index + 1, section.theme, section.summary);
            if let Some(quote) = &section.quote {
                line.push_str(&format!(" \"{quote}\""));
            }
            lines.push(line);
        }
        lines.push(String::new());
        lines.extend(self.actions.iter().map(|action| format!("{ACTION_MARKER} {action}")));
        lines.join("\n")
    }

    /// Shortens quotes, then the optional third bullet, until the note fits.
    fn fit(&mut self, budget: usize) {
        while word_count(&self.render()) > budget {
            let shortened = match self
                .themes
                .iter_mut()
                .filter_map(|section| section.quote.as_mut())
                .max_by_key(|quote| word_count(quote))
            {
                Some(quote) if word_count(quote) > 1 => {
                    let words: Vec<&str> = quote.split_whitespace().collect();
                    *quote = words[..words.len() - 1].join(" ");
                    true
                }
                _ => false,
            };
            if shortened {
                continue;
            }

            if self.themes.iter().any(|section| section.quote.is_some()) {
                for section in &mut self.themes {
                    section.quote = None;
                }
            } else if self.summary.len() > 2 {
                self.summary.pop();
            } else {
                debug!("Note still over budget after trimming quotes; cutting at the cap");
                break;
            }
        }
    }
}

fn percent(share: f64) -> i64 {
    (share * 100.0).round() as i64
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn executive_summary(stats: &[ThemeStat], reviews: &[TaggedReview]) -> Vec<String> {
    let total: usize = stats.iter().map(|stat| stat.review_count).sum();
    let negative: usize = stats.iter().map(|stat| stat.negative_count).sum();
    let rating_total: i64 = reviews.iter().map(|review| i64::from(review.review.rating)).sum();
    let avg_rating = round_ratio(rating_total, reviews.len() as i64);
    let negative_share = round_ratio(negative as i64, total as i64);

    let mut bullets = vec![format!(
        "{} this week averaged {:.2} stars; {}% were negative.",
        plural(total, "review"),
        avg_rating,
        percent(negative_share)
    )];

    let top = &stats[0];
    bullets.push(format!(
        "{} led the conversation with {} ({}% negative).",
        top.theme,
        plural(top.review_count, "review"),
        percent(top.neg_share)
    ));

    if stats.len() > 1 {
        if let Some(harshest) = stats
            .iter()
            .filter(|stat| stat.negative_count > 0)
            .max_by(|a, b| a.neg_share.total_cmp(&b.neg_share).then_with(|| b.theme.cmp(&a.theme)))
        {
            bullets.push(format!(
                "{} drew the highest negative share at {}%.",
                harshest.theme,
                percent(harshest.neg_share)
            ));
        } else {
            bullets.push("No theme drew negative reviews this week.".to_string());
        }
    }

    bullets
}

fn theme_summary(stat: &ThemeStat) -> String {
    let mood = if stat.negative_count == 0 {
        "Feedback was positive or neutral."
    } else if stat.neg_share >= 0.5 {
        "Most users here are unhappy."
    } else {
        "Opinion was split."
    };
    format!(
        "{} averaging {:.2} stars, {} negative. {}",
        plural(stat.review_count, "review"),
        stat.avg_rating,
        stat.negative_count,
        mood
    )
}

/// Short paraphrase of a review from the theme, leaning towards the theme's
/// dominant tone. Scrubbed of PII and braces.
fn pick_quote(reviews: &[TaggedReview], stat: &ThemeStat) -> Option<String> {
    let wanted = if stat.neg_share >= 0.5 {
        Sentiment::Negative
    } else {
        Sentiment::Positive
    };
    let in_theme = || reviews.iter().filter(|review| review.theme == stat.theme);

    let candidate = in_theme()
        .find(|review| review.sentiment == wanted)
        .or_else(|| in_theme().next())?;

    let source = if candidate.review.review_text.trim().is_empty() {
        &candidate.review.full_text
    } else {
        &candidate.review.review_text
    };
    paraphrase(source)
}

fn paraphrase(text: &str) -> Option<String> {
    let clean = strip_braces(&redact(text)).replace('"', "'");
    let first_sentence = clean
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(clean.as_str())
        .trim();
    let quote = truncate_words(first_sentence, QUOTE_MAX_WORDS);
    (!quote.is_empty()).then_some(quote)
}

fn action_for(theme: Theme) -> &'static str {
    match theme {
        Theme::OnboardingKyc => {
            "Review KYC drop-off points and clarify document requirements during onboarding."
        }
        Theme::PaymentsSip => {
            "Audit failed payment and SIP mandate flows and tighten confirmation messages."
        }
        Theme::WithdrawalsPayouts => {
            "Trace delayed withdrawals end to end and publish expected payout timelines."
        }
        Theme::StatementsReports => {
            "Verify statement and tax report accuracy and make downloads easier to find."
        }
        Theme::AppPerformanceBugs => {
            "Prioritize crash and slowness fixes on the most used screens."
        }
    }
}

const FALLBACK_ACTIONS: [&str; ACTION_COUNT] = [
    "Reply to this week's negative reviews with concrete fixes and timelines.",
    "Share these themes with support so responses stay consistent.",
    "Track next week's pulse to confirm whether these issues are easing.",
];

fn actions_for(stats: &[ThemeStat]) -> Vec<String> {
    stats
        .iter()
        .take(TOP_THEME_COUNT)
        .map(|stat| action_for(stat.theme))
        .chain(FALLBACK_ACTIONS)
        .take(ACTION_COUNT)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{full_text, week_start};
    use crate::extract::{extract_report, ExtractOutcome};
    use crate::models::CleanedReview;
    use crate::stats::theme_stats;
    use chrono::NaiveDate;

    fn tagged(theme: Theme, sentiment: Sentiment, rating: i32, text: &str) -> TaggedReview {
        let date = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        TaggedReview {
            review: CleanedReview {
                date,
                rating,
                review_text: text.to_string(),
                review_title: None,
                week_start: week_start(date),
                full_text: full_text(None, text),
            },
            theme,
            sentiment,
            summary_1line: text.chars().take(50).collect(),
        }
    }

    fn week_of_reviews() -> Vec<TaggedReview> {
        vec![
            tagged(Theme::AppPerformanceBugs, Sentiment::Negative, 1, "App keeps crashing. Please fix."),
            tagged(Theme::AppPerformanceBugs, Sentiment::Negative, 2, "Very slow to load"),
            tagged(Theme::AppPerformanceBugs, Sentiment::Positive, 5, "Fast and smooth"),
            tagged(Theme::PaymentsSip, Sentiment::Negative, 1, "SIP debit failed, call me at 9876543210"),
            tagged(Theme::PaymentsSip, Sentiment::Positive, 4, "Payments are quick"),
            tagged(Theme::OnboardingKyc, Sentiment::Positive, 5, "KYC done in minutes"),
            tagged(Theme::StatementsReports, Sentiment::Neutral, 3, "Statement download works"),
        ]
    }

    fn lines_with<'a>(note: &'a str, prefix: &str) -> Vec<&'a str> {
        note.lines().filter(|line| line.starts_with(prefix)).collect()
    }

    #[test]
    fn note_has_required_sections() {
        let reviews = week_of_reviews();
        let stats = theme_stats(&reviews);
        let note = TemplateSynthesizer::default().compose_note(&stats, &reviews, "2025-11-17");

        assert!(note.starts_with("Groww App – Weekly Review Pulse (Week of 2025-11-17)"));
        let bullets = lines_with(&note, "  - ");
        assert!((2..=3).contains(&bullets.len()));
        assert_eq!(lines_with(&note, ACTION_MARKER).len(), ACTION_COUNT);

        let theme_lines: Vec<&str> = note
            .lines()
            .filter(|line| line.starts_with("  1. ") || line.starts_with("  2. ") || line.starts_with("  3. "))
            .collect();
        assert_eq!(theme_lines.len(), 3);
        for (line, stat) in theme_lines.iter().zip(&stats) {
            assert!(line.contains(stat.theme.label()));
        }
        assert!(!note.contains("9876543210"));
        assert!(word_count(&note) <= NOTE_WORD_BUDGET);
    }

    #[test]
    fn fewer_themes_still_get_three_actions() {
        let reviews = vec![tagged(Theme::OnboardingKyc, Sentiment::Positive, 5, "Quick signup")];
        let stats = theme_stats(&reviews);
        let note = TemplateSynthesizer::default().compose_note(&stats, &reviews, "2025-11-17");
        assert_eq!(lines_with(&note, ACTION_MARKER).len(), ACTION_COUNT);
        assert_eq!(lines_with(&note, "  - ").len(), 2);
    }

    #[test]
    fn long_quotes_are_cut_to_budget() {
        let rambling = "word ".repeat(400);
        let reviews: Vec<TaggedReview> = Theme::ALL
            .iter()
            .map(|theme| tagged(*theme, Sentiment::Negative, 1, &rambling))
            .collect();
        let stats = theme_stats(&reviews);
        let note = TemplateSynthesizer::default().compose_note(&stats, &reviews, "2025-11-17");
        assert!(word_count(&note) <= NOTE_WORD_BUDGET);
    }

    #[test]
    fn long_app_name_stays_within_budget() {
        let synthesizer = TemplateSynthesizer::new(&"Groww ".repeat(260));

        let empty = synthesizer.compose_note(&[], &[], "2025-11-17");
        assert!(word_count(&empty) <= NOTE_WORD_BUDGET);
        assert!(empty.contains("(Week of 2025-11-17)"));
        assert!(empty.contains("No reviews were recorded"));

        let reviews = week_of_reviews();
        let stats = theme_stats(&reviews);
        let note = synthesizer.compose_note(&stats, &reviews, "2025-11-17");
        assert!(word_count(&note) <= NOTE_WORD_BUDGET);
        assert_eq!(lines_with(&note, ACTION_MARKER).len(), ACTION_COUNT);
    }

    #[test]
    fn oversized_week_label_is_cut_at_the_cap() {
        let week = "week ".repeat(400);
        let note = TemplateSynthesizer::default().compose_note(&[], &[], &week);
        assert!(word_count(&note) <= NOTE_WORD_BUDGET);

        let reviews = week_of_reviews();
        let stats = theme_stats(&reviews);
        let note = TemplateSynthesizer::default().compose_note(&stats, &reviews, &week);
        assert!(word_count(&note) <= NOTE_WORD_BUDGET);
    }

    #[test]
    fn quotes_cannot_move_the_email_block() {
        let reviews = vec![tagged(Theme::PaymentsSip, Sentiment::Negative, 1, "Broken {json} \"quote\"")];
        let stats = theme_stats(&reviews);
        let note = TemplateSynthesizer::default().compose_note(&stats, &reviews, "2025-11-17");
        assert!(!note.contains('{'));
        assert!(!note.contains('}'));
    }

    #[tokio::test]
    async fn empty_week_produces_a_note() {
        let text = TemplateSynthesizer::default()
            .synthesize(&[], &[], "2030-01-07")
            .await
            .unwrap();
        let extraction = extract_report(&text);
        assert_eq!(extraction.outcome, ExtractOutcome::WellFormed);
        assert!(extraction.report.weekly_note.contains("No reviews were recorded"));
        assert_eq!(extraction.report.email_subject, "Weekly App Review Pulse - 2030-01-07");
    }

    #[tokio::test]
    async fn email_body_restates_the_note() {
        let reviews = week_of_reviews();
        let stats = theme_stats(&reviews);
        let text = TemplateSynthesizer::new("Acme")
            .synthesize(&stats, &reviews, "2025-11-17")
            .await
            .unwrap();
        let extraction = extract_report(&text);
        assert_eq!(extraction.outcome, ExtractOutcome::WellFormed);
        assert_eq!(extraction.report.email_body, extraction.report.weekly_note);
        assert!(extraction.report.weekly_note.starts_with("Acme – Weekly Review Pulse"));
    }
}
