use std::collections::HashMap;

use tracing::info;

use crate::models::{Sentiment, TaggedReview, Theme, ThemeStat};

/// Per-theme volume, rating and negativity, ranked by
/// `(review_count, neg_share)` descending. Zero rows in, zero rows out.
pub fn theme_stats(reviews: &[TaggedReview]) -> Vec<ThemeStat> {
    let mut map: HashMap<Theme, (usize, i64, usize)> = HashMap::new();

    for review in reviews {
        let entry = map.entry(review.theme).or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += i64::from(review.review.rating);
        if review.sentiment == Sentiment::Negative {
            entry.2 += 1;
        }
    }

    let mut stats: Vec<ThemeStat> = map
        .into_iter()
        .map(|(theme, (count, rating_total, negative_count))| ThemeStat {
            theme,
            review_count: count,
            avg_rating: round_ratio(rating_total, count as i64),
            negative_count,
            neg_share: round_ratio(negative_count as i64, count as i64),
        })
        .collect();

    rank(&mut stats);
    info!("Aggregated {} reviews into {} themes", reviews.len(), stats.len());
    stats
}

/// Larger volume first, then higher negative share. Legend order settles
/// exact ties so output is stable across runs.
pub fn rank(stats: &mut [ThemeStat]) {
    stats.sort_by(|a, b| {
        b.review_count
            .cmp(&a.review_count)
            .then_with(|| b.neg_share.total_cmp(&a.neg_share))
            .then_with(|| a.theme.cmp(&b.theme))
    });
}

/// `numerator / denominator` rounded to two decimals, half to even, computed
/// on the exact ratio so binary float error never decides a tie.
pub fn round_ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }

    let scaled = numerator * 100;
    let mut hundredths = scaled.div_euclid(denominator);
    let twice_remainder = 2 * scaled.rem_euclid(denominator);

    if twice_remainder > denominator || (twice_remainder == denominator && hundredths % 2 != 0) {
        hundredths += 1;
    }

    hundredths as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{full_text, week_start};
    use crate::models::CleanedReview;
    use chrono::NaiveDate;

    fn tagged(theme: Theme, sentiment: Sentiment, rating: i32) -> TaggedReview {
        let date = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        TaggedReview {
            review: CleanedReview {
                date,
                rating,
                review_text: "text".to_string(),
                review_title: None,
                week_start: week_start(date),
                full_text: full_text(None, "text"),
            },
            theme,
            sentiment,
            summary_1line: "text".to_string(),
        }
    }

    fn stat(theme: Theme, review_count: usize, neg_share: f64) -> ThemeStat {
        ThemeStat {
            theme,
            review_count,
            avg_rating: 3.0,
            negative_count: 0,
            neg_share,
        }
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(theme_stats(&[]).is_empty());
    }

    #[test]
    fn aggregates_per_theme() {
        let reviews = vec![
            tagged(Theme::AppPerformanceBugs, Sentiment::Positive, 5),
            tagged(Theme::AppPerformanceBugs, Sentiment::Negative, 3),
            tagged(Theme::AppPerformanceBugs, Sentiment::Negative, 1),
            tagged(Theme::PaymentsSip, Sentiment::Mixed, 4),
            tagged(Theme::OnboardingKyc, Sentiment::Positive, 5),
        ];
        let stats = theme_stats(&reviews);

        assert_eq!(stats.len(), 3);
        let top = &stats[0];
        assert_eq!(top.theme, Theme::AppPerformanceBugs);
        assert_eq!(top.review_count, 3);
        assert_eq!(top.avg_rating, 3.0);
        assert_eq!(top.negative_count, 2);
        assert_eq!(top.neg_share, 0.67);

        let total: usize = stats.iter().map(|s| s.review_count).sum();
        assert_eq!(total, reviews.len());
        for s in &stats {
            assert_eq!(s.neg_share, round_ratio(s.negative_count as i64, s.review_count as i64));
        }
    }

    #[test]
    fn equal_volume_ranks_higher_negative_share_first() {
        let mut stats = vec![
            stat(Theme::PaymentsSip, 10, 0.5),
            stat(Theme::WithdrawalsPayouts, 10, 0.8),
            stat(Theme::OnboardingKyc, 12, 0.1),
        ];
        rank(&mut stats);
        let order: Vec<Theme> = stats.iter().map(|s| s.theme).collect();
        assert_eq!(
            order,
            vec![Theme::OnboardingKyc, Theme::WithdrawalsPayouts, Theme::PaymentsSip]
        );
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round_ratio(1, 8), 0.12);
        assert_eq!(round_ratio(3, 8), 0.38);
        assert_eq!(round_ratio(33, 8), 4.12);
        assert_eq!(round_ratio(2, 3), 0.67);
        assert_eq!(round_ratio(1, 3), 0.33);
        assert_eq!(round_ratio(5, 5), 1.0);
        assert_eq!(round_ratio(0, 4), 0.0);
        assert_eq!(round_ratio(1, 0), 0.0);
    }
}
