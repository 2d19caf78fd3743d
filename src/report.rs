use std::fmt::Write;

use crate::models::{PipelineOutput, WeekBucket};

pub fn build_report(output: &PipelineOutput) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "# Weekly Review Pulse");
    let _ = writeln!(
        report,
        "Week starting {} ({} of {} reviews in range)",
        output.target_week, output.filtered_reviews, output.total_reviews
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "## Theme Stats");

    if output.themes_stats.is_empty() {
        let _ = writeln!(report, "No reviews recorded for this week.");
    } else {
        let _ = writeln!(report, "| Theme | Reviews | Avg rating | Negative | Negative share |");
        let _ = writeln!(report, "|---|---:|---:|---:|---:|");
        for stat in &output.themes_stats {
            let _ = writeln!(
                report,
                "| {} | {} | {:.2} | {} | {:.2} |",
                stat.theme, stat.review_count, stat.avg_rating, stat.negative_count, stat.neg_share
            );
        }
    }

    let _ = writeln!(report);
    let _ = writeln!(report, "## Weekly Note");
    let _ = writeln!(report);
    let _ = writeln!(report, "{}", output.weekly_note);

    let _ = writeln!(report);
    let _ = writeln!(report, "## Email");

    if output.email_subject.is_empty() && output.email_body.is_empty() {
        let _ = writeln!(report, "No email subject or body could be extracted.");
    } else {
        let _ = writeln!(report, "Subject: {}", output.email_subject);
        let _ = writeln!(report);
        let _ = writeln!(report, "```text");
        let _ = writeln!(report, "{}", output.email_body);
        let _ = writeln!(report, "```");
    }

    report
}

pub fn week_lines(buckets: &[WeekBucket]) -> Vec<String> {
    buckets
        .iter()
        .map(|bucket| {
            format!(
                "- {}: {} reviews (avg rating {:.2})",
                bucket.week_start, bucket.review_count, bucket.avg_rating
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Theme, ThemeStat};
    use chrono::NaiveDate;

    fn output(stats: Vec<ThemeStat>, subject: &str) -> PipelineOutput {
        PipelineOutput {
            target_week: "2025-11-17".to_string(),
            total_reviews: 12,
            filtered_reviews: 5,
            themes_stats: stats,
            weekly_note: "Pulse note".to_string(),
            email_subject: subject.to_string(),
            email_body: if subject.is_empty() { String::new() } else { "Pulse note".to_string() },
        }
    }

    #[test]
    fn report_lists_stats_and_email() {
        let report = build_report(&output(
            vec![ThemeStat {
                theme: Theme::PaymentsSip,
                review_count: 5,
                avg_rating: 2.4,
                negative_count: 3,
                neg_share: 0.6,
            }],
            "Weekly App Review Pulse - 2025-11-17",
        ));
        assert!(report.contains("Week starting 2025-11-17 (5 of 12 reviews in range)"));
        assert!(report.contains("| Payments & SIP | 5 | 2.40 | 3 | 0.60 |"));
        assert!(report.contains("Subject: Weekly App Review Pulse - 2025-11-17"));
    }

    #[test]
    fn report_handles_degraded_results() {
        let report = build_report(&output(Vec::new(), ""));
        assert!(report.contains("No reviews recorded for this week."));
        assert!(report.contains("No email subject or body could be extracted."));
    }

    #[test]
    fn week_lines_format_buckets() {
        let lines = week_lines(&[WeekBucket {
            week_start: NaiveDate::from_ymd_opt(2025, 11, 17).unwrap(),
            review_count: 5,
            avg_rating: 3.0,
        }]);
        assert_eq!(lines, vec!["- 2025-11-17: 5 reviews (avg rating 3.00)"]);
    }
}
