use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Positional table as read from a CSV source. Row identity is row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Theme {
    #[serde(rename = "Onboarding & KYC")]
    OnboardingKyc,
    #[serde(rename = "Payments & SIP")]
    PaymentsSip,
    #[serde(rename = "Withdrawals & Payouts")]
    WithdrawalsPayouts,
    #[serde(rename = "Statements & Reports")]
    StatementsReports,
    #[serde(rename = "App Performance & Bugs")]
    AppPerformanceBugs,
}

impl Theme {
    /// Legend order, as presented to reviewers and models.
    pub const ALL: [Theme; 5] = [
        Theme::OnboardingKyc,
        Theme::PaymentsSip,
        Theme::WithdrawalsPayouts,
        Theme::StatementsReports,
        Theme::AppPerformanceBugs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Theme::OnboardingKyc => "Onboarding & KYC",
            Theme::PaymentsSip => "Payments & SIP",
            Theme::WithdrawalsPayouts => "Withdrawals & Payouts",
            Theme::StatementsReports => "Statements & Reports",
            Theme::AppPerformanceBugs => "App Performance & Bugs",
        }
    }

    /// Case-insensitive match against the legend labels.
    pub fn from_label(value: &str) -> Option<Theme> {
        let wanted = value.trim();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

impl Sentiment {
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Mixed => "MIXED",
            Sentiment::Neutral => "NEUTRAL",
        }
    }

    pub fn from_label(value: &str) -> Option<Sentiment> {
        match value.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(Sentiment::Positive),
            "NEGATIVE" => Some(Sentiment::Negative),
            "MIXED" => Some(Sentiment::Mixed),
            "NEUTRAL" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A review that survived cleaning, bucketed into its ISO week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedReview {
    pub date: NaiveDate,
    pub rating: i32,
    pub review_text: String,
    pub review_title: Option<String>,
    /// Monday on or before `date`.
    pub week_start: NaiveDate,
    pub full_text: String,
}

impl CleanedReview {
    pub fn week_key(&self) -> String {
        self.week_start.format("%Y-%m-%d").to_string()
    }
}

/// Cleaned review known to belong to the target week.
pub type WeeklyReview = CleanedReview;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub theme: Theme,
    pub sentiment: Sentiment,
    pub summary_1line: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedReview {
    #[serde(flatten)]
    pub review: WeeklyReview,
    pub theme: Theme,
    pub sentiment: Sentiment,
    pub summary_1line: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStat {
    pub theme: Theme,
    pub review_count: usize,
    pub avg_rating: f64,
    pub negative_count: usize,
    pub neg_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    pub week_start: NaiveDate,
    pub review_count: usize,
    pub avg_rating: f64,
}

/// Narrative plus the structured email fields pulled from its trailing block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyReport {
    pub weekly_note: String,
    pub email_subject: String,
    pub email_body: String,
}

/// Result bundle handed to presentation or delivery layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub target_week: String,
    pub total_reviews: usize,
    pub filtered_reviews: usize,
    pub themes_stats: Vec<ThemeStat>,
    pub weekly_note: String,
    pub email_subject: String,
    pub email_body: String,
}
