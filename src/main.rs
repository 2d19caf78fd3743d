use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use review_pulse::classify::{ReviewClassifier, RuleClassifier};
use review_pulse::clean::clean_and_bucket;
use review_pulse::config::{LlmArgs, Strategy};
use review_pulse::llm::{ChatClient, LlmClassifier, LlmSynthesizer};
use review_pulse::pulse::{PulseSynthesizer, TemplateSynthesizer};
use review_pulse::{combine, loader, report, sample, select, Pipeline};

#[derive(Parser)]
#[command(name = "review-pulse")]
#[command(about = "Weekly theme and sentiment pulse for app-store reviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one week and write the pulse report
    Analyze {
        #[arg(long)]
        csv: PathBuf,
        /// Monday of the week to analyze (YYYY-MM-DD); defaults to last completed week
        #[arg(long)]
        week: Option<String>,
        #[arg(long, default_value = "pulse.md")]
        out: PathBuf,
        /// Also write the result bundle as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Strategy::Rules)]
        strategy: Strategy,
        #[arg(long, env = "PULSE_APP_NAME", default_value = "Groww App")]
        app_name: String,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// List the weeks present in a review CSV
    Weeks {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write a sample review CSV
    Sample {
        #[arg(long, default_value = "sample_reviews.csv")]
        out: PathBuf,
        /// Generate this many reviews over the past eight weeks instead of the fixed sample
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Merge several review CSVs into one
    Combine {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "all_reviews.csv")]
        out: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_week(week: &str) -> anyhow::Result<String> {
    let date = NaiveDate::parse_from_str(week.trim(), "%Y-%m-%d")
        .with_context(|| format!("--week must be a YYYY-MM-DD date, got {week:?}"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            csv,
            week,
            out,
            json,
            strategy,
            app_name,
            llm,
        } => {
            let (classifier, synthesizer, concurrency): (
                Box<dyn ReviewClassifier>,
                Box<dyn PulseSynthesizer>,
                usize,
            ) = match strategy {
                Strategy::Rules => (
                    Box::new(RuleClassifier),
                    Box::new(TemplateSynthesizer::new(&app_name)),
                    1,
                ),
                Strategy::Llm => {
                    let client = ChatClient::new(llm.into_config()?)?;
                    let concurrency = client.concurrency();
                    (
                        Box::new(LlmClassifier::new(client.clone(), &app_name)),
                        Box::new(LlmSynthesizer::new(client, &app_name)),
                        concurrency,
                    )
                }
            };

            let target_week = match week {
                Some(week) => parse_week(&week)?,
                None => select::default_target_week(),
            };
            info!("Analyzing {} for week starting {}", csv.display(), target_week);

            let table = loader::read_csv(&csv)?;
            let output = Pipeline::new(classifier.as_ref(), synthesizer.as_ref())
                .with_concurrency(concurrency)
                .run(table, &target_week)
                .await?;

            std::fs::write(&out, report::build_report(&output))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());

            if let Some(path) = json {
                let bundle = serde_json::to_string_pretty(&output)?;
                std::fs::write(&path, bundle)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Result bundle written to {}.", path.display());
            }

            if output.filtered_reviews == 0 {
                println!("No reviews found for week starting {target_week}.");
            }
        }
        Commands::Weeks { csv, limit } => {
            let table = loader::load(loader::read_csv(&csv)?)?;
            let cleaned = clean_and_bucket(table)?;
            let buckets = select::week_buckets(&cleaned);

            if buckets.is_empty() {
                println!("No dated reviews found in {}.", csv.display());
                return Ok(());
            }

            println!("Weeks by review volume (newest first):");
            for line in report::week_lines(&buckets).iter().take(limit) {
                println!("{line}");
            }
        }
        Commands::Sample { out, count, seed } => {
            let table = match count {
                Some(count) => sample::generate_table(count, Utc::now().date_naive(), seed),
                None => sample::sample_table(),
            };
            loader::write_csv(&out, &table)?;
            println!("Wrote {} sample reviews to {}.", table.len(), out.display());
        }
        Commands::Combine { inputs, out } => {
            let combined = combine::combine_files(&inputs)?;
            loader::write_csv(&out, &combined)?;
            println!(
                "Combined {} reviews from {} files into {}.",
                combined.len(),
                inputs.len(),
                out.display()
            );
        }
    }

    Ok(())
}
