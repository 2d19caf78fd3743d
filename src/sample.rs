use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::RawTable;

const SAMPLE_COLUMNS: [&str; 4] = ["date", "rating", "review_text", "review_title"];
const SAMPLE_WEEKS: i64 = 8;

const POSITIVE: [(&str, &str); 6] = [
    ("Excellent App", "Very user-friendly and intuitive. Investing feels easy."),
    ("Smooth KYC", "Onboarding and KYC verification were done in minutes."),
    ("SIP made simple", "Setting up a SIP was straightforward and quick."),
    ("Fast payouts", "Withdrawal reached my bank the same day. Great service."),
    ("Clear statements", "Capital gains statement is clean and easy to download."),
    ("Love it", "Great app with a clean interface and smooth navigation."),
];

const NEGATIVE: [(&str, &str); 6] = [
    ("Crashing Issues", "App keeps crashing when I open my portfolio. Needs urgent fixing."),
    ("KYC stuck", "KYC has been pending for a week and support gives no update."),
    ("Payment failed", "UPI payment failed twice but money was debited from my account."),
    ("Withdrawal delayed", "Withdrawal is stuck for five days, very frustrating."),
    ("Wrong report", "Tax report shows wrong numbers for last year."),
    ("Too slow", "Very slow to load, charts freeze during market hours."),
];

const NEUTRAL: [(&str, &str); 4] = [
    ("Needs Improvement", "Could be better, some features are missing."),
    ("Okay", "Does the job, nothing special."),
    ("Average", "Good features but the app is slow at times."),
    ("Fine", "SIP works but the mandate setup took a while."),
];

/// The fixed five-review week of 2025-11-17 with ratings 5, 3, 1, 4, 2.
pub fn sample_table() -> RawTable {
    let rows = [
        (
            "2025-11-17",
            "5",
            "Great app! Easy to use and navigate. Love the new features!",
            "Excellent App",
        ),
        (
            "2025-11-18",
            "3",
            "Could be better, some features are missing. Performance needs improvement.",
            "Needs Improvement",
        ),
        (
            "2025-11-19",
            "1",
            "App keeps crashing, very frustrating. Can't complete transactions.",
            "Crashing Issues",
        ),
        (
            "2025-11-20",
            "4",
            "Good overall but needs performance improvements. Slow loading times.",
            "Good but Slow",
        ),
        (
            "2025-11-21",
            "2",
            "Difficult to navigate. UI could be improved significantly.",
            "Poor Navigation",
        ),
    ];

    RawTable::new(
        SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|(date, rating, text, title)| {
                vec![date.to_string(), rating.to_string(), text.to_string(), title.to_string()]
            })
            .collect(),
    )
}

/// `count` generated reviews spread over the eight weeks before `today`.
/// The same seed always produces the same table.
pub fn generate_table(count: usize, today: NaiveDate, seed: u64) -> RawTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count);

    for _ in 0..count {
        let rating: i32 = rng.gen_range(1..=5);
        let pool: &[(&str, &str)] = match rating {
            4 | 5 => &POSITIVE,
            1 | 2 => &NEGATIVE,
            _ => &NEUTRAL,
        };
        let (title, text) = pool.choose(&mut rng).copied().unwrap_or(("", ""));
        let date = today - Duration::days(rng.gen_range(0..SAMPLE_WEEKS * 7));

        rows.push(vec![
            date.format("%Y-%m-%d").to_string(),
            rating.to_string(),
            text.to_string(),
            title.to_string(),
        ]);
    }

    rows.sort_by(|a, b| a[0].cmp(&b[0]));
    RawTable::new(SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_and_bucket;

    #[test]
    fn sample_covers_one_week() {
        let cleaned = clean_and_bucket(sample_table()).unwrap();
        let ratings: Vec<i32> = cleaned.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![5, 3, 1, 4, 2]);
        assert!(cleaned.iter().all(|r| r.week_key() == "2025-11-17"));
    }

    #[test]
    fn generated_rows_are_seeded_and_in_range() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 26).unwrap();
        let first = generate_table(40, today, 7);
        let second = generate_table(40, today, 7);
        assert_eq!(first, second);
        assert_eq!(first.len(), 40);

        let cleaned = clean_and_bucket(first).unwrap();
        assert_eq!(cleaned.len(), 40);
        let earliest = today - Duration::days(SAMPLE_WEEKS * 7);
        assert!(cleaned.iter().all(|r| r.date <= today && r.date > earliest));
    }
}
