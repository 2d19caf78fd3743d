use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::loader::{missing_columns, TITLE_COLUMN};
use crate::models::{CleanedReview, RawTable};

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Normalizes column names, drops rows whose date or rating does not parse,
/// and buckets every surviving review into its ISO week. Row order is kept.
pub fn clean_and_bucket(table: RawTable) -> Result<Vec<CleanedReview>> {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| column.trim().to_lowercase())
        .collect();

    let missing = missing_columns(&columns);
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let table = RawTable::new(columns, table.rows);
    // Presence was checked above.
    let date_idx = table.column_index("date").unwrap_or_default();
    let rating_idx = table.column_index("rating").unwrap_or_default();
    let text_idx = table.column_index("review_text").unwrap_or_default();
    let title_idx = table.column_index(TITLE_COLUMN);

    let total = table.len();
    let mut bad_dates = 0usize;
    let mut bad_ratings = 0usize;
    let mut cleaned = Vec::with_capacity(total);

    for row in &table.rows {
        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

        let Some(date) = parse_review_date(cell(date_idx)) else {
            bad_dates += 1;
            continue;
        };
        let Some(rating) = parse_rating(cell(rating_idx)) else {
            bad_ratings += 1;
            continue;
        };

        let review_text = cell(text_idx).to_string();
        let review_title = title_idx
            .map(cell)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        let full_text = full_text(review_title.as_deref(), &review_text);

        cleaned.push(CleanedReview {
            date,
            rating,
            review_text,
            review_title,
            week_start: week_start(date),
            full_text,
        });
    }

    if bad_dates > 0 {
        warn!("Dropped {} rows with unparseable dates", bad_dates);
    }
    if bad_ratings > 0 {
        warn!("Dropped {} rows with unusable ratings", bad_ratings);
    }
    info!("Cleaned {} of {} reviews", cleaned.len(), total);

    Ok(cleaned)
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Days::new(u64::from(offset))
}

pub fn full_text(title: Option<&str>, text: &str) -> String {
    let title = title.map(str::trim).unwrap_or("");
    let text = text.trim();
    match (title.is_empty(), text.is_empty()) {
        (false, false) => format!("{title} - {text}"),
        (false, true) => title.to_string(),
        (true, _) => text.to_string(),
    }
}

pub fn parse_review_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Integral star rating in 1..=5; "4.0" style cells are accepted.
pub fn parse_rating(value: &str) -> Option<i32> {
    let value = value.trim();
    let rating = match value.parse::<i32>() {
        Ok(rating) => rating,
        Err(_) => {
            let float = value.parse::<f64>().ok()?;
            if float.fract() != 0.0 {
                return None;
            }
            float as i32
        }
    };
    (1..=5).contains(&rating).then_some(rating)
}
