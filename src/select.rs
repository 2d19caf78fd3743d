use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::clean::week_start;
use crate::models::{CleanedReview, WeekBucket, WeeklyReview};
use crate::stats::round_ratio;

/// Keeps the reviews whose ISO week key equals `target_week` exactly.
/// A week with no data yields an empty vec.
pub fn filter_target_week(reviews: Vec<CleanedReview>, target_week: &str) -> Vec<WeeklyReview> {
    let selected: Vec<WeeklyReview> = reviews
        .into_iter()
        .filter(|review| review.week_key() == target_week)
        .collect();

    if selected.is_empty() {
        warn!("No reviews found for week starting {}", target_week);
    } else {
        info!("Selected {} reviews for week starting {}", selected.len(), target_week);
    }
    selected
}

/// Every week present in the cleaned set, newest first.
pub fn week_buckets(reviews: &[CleanedReview]) -> Vec<WeekBucket> {
    let mut map: BTreeMap<NaiveDate, (usize, i64)> = BTreeMap::new();

    for review in reviews {
        let entry = map.entry(review.week_start).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += i64::from(review.rating);
    }

    map.into_iter()
        .rev()
        .map(|(week_start, (count, rating_total))| WeekBucket {
            week_start,
            review_count: count,
            avg_rating: round_ratio(rating_total, count as i64),
        })
        .collect()
}

/// Monday of the last completed week relative to `today`.
pub fn last_completed_week(today: NaiveDate) -> NaiveDate {
    week_start(today - Duration::days(7))
}

pub fn default_target_week() -> String {
    last_completed_week(Utc::now().date_naive())
        .format("%Y-%m-%d")
        .to_string()
}
