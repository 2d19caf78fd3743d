use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::classify::{tag_reviews, ReviewClassifier};
use crate::clean::clean_and_bucket;
use crate::extract::extract_report;
use crate::loader;
use crate::models::{PipelineOutput, RawTable};
use crate::pulse::PulseSynthesizer;
use crate::select::filter_target_week;
use crate::stats::theme_stats;

/// Loader → cleaner → week selector → classifier → aggregator →
/// synthesizer → extractor. Stateless; every run owns its input table.
pub struct Pipeline<'a> {
    classifier: &'a dyn ReviewClassifier,
    synthesizer: &'a dyn PulseSynthesizer,
    concurrency: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(classifier: &'a dyn ReviewClassifier, synthesizer: &'a dyn PulseSynthesizer) -> Self {
        Self {
            classifier,
            synthesizer,
            concurrency: 1,
        }
    }

    /// Maximum reviews classified at once. Output order never depends on it.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fails only on a schema error or a failing strategy; an empty week
    /// flows through as empty stats and a "no data" note.
    pub async fn run(&self, table: RawTable, target_week: &str) -> anyhow::Result<PipelineOutput> {
        let span = info_span!("pipeline", run_id = %Uuid::new_v4(), week = target_week);
        self.run_stages(table, target_week).instrument(span).await
    }

    async fn run_stages(&self, table: RawTable, target_week: &str) -> anyhow::Result<PipelineOutput> {
        let start = std::time::Instant::now();

        let raw = loader::load(table)?;
        let total_reviews = raw.len();

        let cleaned = clean_and_bucket(raw)?;
        let weekly = filter_target_week(cleaned, target_week);
        let filtered_reviews = weekly.len();

        let tagged = tag_reviews(self.classifier, weekly, self.concurrency).await?;
        let themes_stats = theme_stats(&tagged);

        let text = self
            .synthesizer
            .synthesize(&themes_stats, &tagged, target_week)
            .await?;
        let extraction = extract_report(&text);

        info!(
            "Pipeline finished - duration={:.2}s, total={}, filtered={}, themes={}, block={:?}",
            start.elapsed().as_secs_f32(),
            total_reviews,
            filtered_reviews,
            themes_stats.len(),
            extraction.outcome
        );

        Ok(PipelineOutput {
            target_week: target_week.to_string(),
            total_reviews,
            filtered_reviews,
            themes_stats,
            weekly_note: extraction.report.weekly_note,
            email_subject: extraction.report.email_subject,
            email_body: extraction.report.email_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RuleClassifier;
    use crate::error::PipelineError;
    use crate::models::Theme;
    use crate::pulse::TemplateSynthesizer;
    use crate::sample::sample_table;
    use async_trait::async_trait;

    struct FailingSynthesizer;

    #[async_trait]
    impl PulseSynthesizer for FailingSynthesizer {
        async fn synthesize(
            &self,
            _stats: &[crate::models::ThemeStat],
            _reviews: &[crate::models::TaggedReview],
            _week: &str,
        ) -> anyhow::Result<String> {
            anyhow::bail!("timed out")
        }
    }

    #[tokio::test]
    async fn sample_week_end_to_end() {
        let synthesizer = TemplateSynthesizer::default();
        let pipeline = Pipeline::new(&RuleClassifier, &synthesizer).with_concurrency(2);
        let output = pipeline.run(sample_table(), "2025-11-17").await.unwrap();

        assert_eq!(output.total_reviews, 5);
        assert_eq!(output.filtered_reviews, 5);
        assert!(!output.themes_stats.is_empty());
        assert!(!output.weekly_note.is_empty());
        assert_eq!(output.email_subject, "Weekly App Review Pulse - 2025-11-17");
        assert_eq!(output.email_body, output.weekly_note);

        let counted: usize = output.themes_stats.iter().map(|s| s.review_count).sum();
        assert_eq!(counted, 5);
        assert_eq!(output.themes_stats[0].theme, Theme::AppPerformanceBugs);
        assert_eq!(output.themes_stats[0].review_count, 4);
        assert_eq!(output.themes_stats[0].avg_rating, 3.5);
    }

    #[tokio::test]
    async fn other_week_yields_empty_stats() {
        let synthesizer = TemplateSynthesizer::default();
        let output = Pipeline::new(&RuleClassifier, &synthesizer)
            .run(sample_table(), "2025-11-24")
            .await
            .unwrap();

        assert_eq!(output.total_reviews, 5);
        assert_eq!(output.filtered_reviews, 0);
        assert!(output.themes_stats.is_empty());
        assert!(output.weekly_note.contains("No reviews were recorded"));
    }

    #[tokio::test]
    async fn schema_error_aborts_the_run() {
        let synthesizer = TemplateSynthesizer::default();
        let table = RawTable::new(vec!["date".to_string()], Vec::new());
        let err = Pipeline::new(&RuleClassifier, &synthesizer)
            .run(table, "2025-11-17")
            .await
            .unwrap_err();

        let schema = err.downcast_ref::<PipelineError>().unwrap();
        assert_eq!(
            schema,
            &PipelineError::Schema {
                missing: vec!["rating".to_string(), "review_text".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn synthesizer_failure_fails_the_run() {
        let err = Pipeline::new(&RuleClassifier, &FailingSynthesizer)
            .run(sample_table(), "2025-11-17")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
