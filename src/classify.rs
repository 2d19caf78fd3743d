use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::models::{Classification, Sentiment, TaggedReview, Theme, WeeklyReview};
use crate::redact::summary_line;

/// Assigns one theme, one sentiment and a short summary to a single review.
/// Implementations see one review at a time and keep no cross-row state.
#[async_trait]
pub trait ReviewClassifier: Send + Sync {
    async fn classify(&self, full_text: &str, rating: i32) -> anyhow::Result<Classification>;
}

const THEME_KEYWORDS: [(Theme, &[&str]); 4] = [
    (
        Theme::OnboardingKyc,
        &["kyc", "onboard", "register", "registration", "sign up", "signup", "verification", "verify", "aadhaar", "account opening"],
    ),
    (
        Theme::PaymentsSip,
        &["payment", "sip", "transaction", "upi", "mandate", "autopay", "auto-pay", "debit"],
    ),
    (
        Theme::WithdrawalsPayouts,
        &["withdraw", "payout", "redeem", "redemption", "refund", "bank transfer"],
    ),
    (
        Theme::StatementsReports,
        &["statement", "report", "tax", "capital gain", "p&l", "contract note"],
    ),
];

const NEGATIVE_MARKERS: [&str; 15] = [
    "frustrat", "crash", "slow", "issue", "problem", "bad", "bug", "error", "fail", "stuck", "worst",
    "poor", "freez", "lag", "hang",
];

const POSITIVE_MARKERS: [&str; 12] = [
    "great", "good", "excellent", "love", "amazing", "perfect", "smooth", "easy", "best", "helpful",
    "fast", "nice",
];

/// Keyword heuristics: first legend theme with a matching term wins, falling
/// back to App Performance & Bugs. Sentiment follows the star rating, with
/// 3-star reviews settled by lexical markers.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn theme_for(text: &str) -> Theme {
        let lower = text.to_lowercase();
        THEME_KEYWORDS
            .iter()
            .find(|(_, terms)| terms.iter().any(|term| contains_term(&lower, term)))
            .map(|(theme, _)| *theme)
            .unwrap_or(Theme::AppPerformanceBugs)
    }

    pub fn sentiment_for(text: &str, rating: i32) -> Sentiment {
        if rating >= 4 {
            return Sentiment::Positive;
        }
        if rating <= 2 {
            return Sentiment::Negative;
        }

        let lower = text.to_lowercase();
        let negative = count_markers(&lower, &NEGATIVE_MARKERS);
        let positive = count_markers(&lower, &POSITIVE_MARKERS);
        match negative.cmp(&positive) {
            std::cmp::Ordering::Greater => Sentiment::Negative,
            std::cmp::Ordering::Less => Sentiment::Positive,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}

#[async_trait]
impl ReviewClassifier for RuleClassifier {
    async fn classify(&self, full_text: &str, rating: i32) -> anyhow::Result<Classification> {
        Ok(Classification {
            theme: Self::theme_for(full_text),
            sentiment: Self::sentiment_for(full_text, rating),
            summary_1line: summary_line(full_text),
        })
    }
}

/// True when `term` occurs in `haystack` starting at a word boundary.
/// Both sides are expected in lower case.
fn contains_term(haystack: &str, term: &str) -> bool {
    haystack.match_indices(term).any(|(start, _)| {
        haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |previous| !previous.is_alphanumeric())
    })
}

fn count_markers(haystack: &str, markers: &[&str]) -> usize {
    markers
        .iter()
        .filter(|marker| contains_term(haystack, marker))
        .count()
}

/// Classifies every review, at most `concurrency` in flight, and returns the
/// tagged rows in input order. The first failure aborts the whole batch.
pub async fn tag_reviews(
    classifier: &dyn ReviewClassifier,
    reviews: Vec<WeeklyReview>,
    concurrency: usize,
) -> anyhow::Result<Vec<TaggedReview>> {
    let classifications: Vec<Classification> = stream::iter(reviews.iter())
        .map(|review| classifier.classify(&review.full_text, review.rating))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let tagged: Vec<TaggedReview> = reviews
        .into_iter()
        .zip(classifications)
        .map(|(review, classification)| {
            debug!(
                "Tagged review from {} as {} / {}",
                review.date, classification.theme, classification.sentiment
            );
            TaggedReview {
                review,
                theme: classification.theme,
                sentiment: classification.sentiment,
                // Summaries are scrubbed here whatever the strategy returned.
                summary_1line: summary_line(&classification.summary_1line),
            }
        })
        .collect();

    info!("Tagged {} reviews with themes and sentiment", tagged.len());
    Ok(tagged)
}
