//! CLI entry point for the class score report tool.
//!
//! Each subcommand runs one analysis pass over an exported score sheet (a
//! local CSV or Excel file, or a URL) and writes the derived table plus a JSON
//! report with the chart description.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use class_score_report::analyzers::{DEFAULT_QUESTION_PREFIX, LabelPolicy};
use class_score_report::config::{ColumnNames, Settings, TierConfig};
use class_score_report::fetch::{ReqwestClient, load_source};
use class_score_report::output::{print_json, print_pretty, save_accuracy_report, save_average_report};
use class_score_report::parser::RateScale;
use class_score_report::report::{AnalysisOptions, accuracy_report, average_report};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "class_score_report")]
#[command(about = "Per-class score statistics and charts from exported exam sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Path to a CSV, xlsx or xls export, or a URL to fetch
    #[arg(value_name = "FILE_OR_URL")]
    source: String,

    /// Directory for the derived CSV and JSON report (default: $REPORT_OUTPUT_DIR or "reports")
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Header of the class column
    #[arg(long, default_value = "班级")]
    class_column: String,

    /// How class codes are normalized
    #[arg(long, value_enum, default_value_t = LabelPolicy::Numeric)]
    label_policy: LabelPolicy,

    /// Log the full report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct QuestionArgs {
    /// Header of the question id column
    #[arg(long, default_value = "题号")]
    question_column: String,

    /// Header of the correctness rate column
    #[arg(long, default_value = "得分率")]
    rate_column: String,

    /// Question id prefix of single-choice questions
    #[arg(short, long, default_value = DEFAULT_QUESTION_PREFIX)]
    prefix: String,

    /// Scale of the rate column
    #[arg(long, value_enum, default_value_t = RateScale::Percent)]
    rate_scale: RateScale,
}

#[derive(Subcommand)]
enum Commands {
    /// Average total score per class, excluding students with a total of 0
    Averages {
        #[command(flatten)]
        input: InputArgs,

        /// Header of the total score column
        #[arg(long, default_value = "总分")]
        total_column: String,

        /// Color the chart by tier
        #[arg(long, default_value_t = false)]
        by_tier: bool,

        /// Tier config JSON (default: $TIERS_CONFIG, then the built-in tiers)
        #[arg(long)]
        tiers: Option<String>,
    },
    /// Mean correctness rate of single-choice questions per class
    Accuracy {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        question: QuestionArgs,
    },
    /// Single-choice accuracy with classes grouped and colored by tier
    Tiers {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        question: QuestionArgs,

        /// Tier config JSON (default: $TIERS_CONFIG, then the built-in tiers)
        #[arg(long)]
        tiers: Option<String>,
    },
    /// Show the tier configuration in use
    ListTiers {
        /// Tier config JSON (default: $TIERS_CONFIG, then the built-in tiers)
        #[arg(long)]
        tiers: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let settings = Settings::from_env();

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&settings.log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&settings.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("class_score_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let client = ReqwestClient::new()?;

    match cli.command {
        Commands::Averages {
            input,
            total_column,
            by_tier,
            tiers,
        } => {
            let options = AnalysisOptions {
                columns: ColumnNames {
                    total: total_column,
                    ..columns_for(&input)
                },
                label_policy: input.label_policy,
                ..AnalysisOptions::default()
            };
            let tier_config = if by_tier {
                Some(resolve_tiers(tiers, &settings)?)
            } else {
                None
            };

            let bytes = load_source(&client, &input.source).await?;
            let report = average_report(&input.source, &bytes, &options, tier_config.as_ref())?;

            for avg in &report.averages {
                let average = format!("{:.2}", avg.average);
                info!(class = %avg.class, average = %average, count = avg.count, "Class average");
            }
            emit(&report, input.json)?;

            let paths = save_average_report(&output_dir(&input, &settings), &report)?;
            log_paths(&paths);
        }
        Commands::Accuracy { input, question } => {
            let options = question_options(&input, question);
            let bytes = load_source(&client, &input.source).await?;
            let report = accuracy_report(&input.source, &bytes, &options, None)?;

            emit(&report, input.json)?;
            let paths = save_accuracy_report(
                &output_dir(&input, &settings),
                "question_accuracy",
                &report,
                &options.columns.class,
            )?;
            log_paths(&paths);
        }
        Commands::Tiers {
            input,
            question,
            tiers,
        } => {
            let tier_config = resolve_tiers(tiers, &settings)?;
            let options = question_options(&input, question);
            let bytes = load_source(&client, &input.source).await?;
            let report = accuracy_report(&input.source, &bytes, &options, Some(&tier_config))?;

            for tier in report.tiers.iter().flatten() {
                let classes: Vec<&str> = tier.classes.iter().map(|c| c.as_str()).collect();
                info!(tier = %tier.tier, color = %tier.color, classes = ?classes, "Tier");
            }
            emit(&report, input.json)?;

            let paths = save_accuracy_report(
                &output_dir(&input, &settings),
                "tiered_accuracy",
                &report,
                &options.columns.class,
            )?;
            log_paths(&paths);
        }
        Commands::ListTiers { tiers } => {
            let tier_config = resolve_tiers(tiers, &settings)?;

            info!(total = tier_config.tiers().len(), "Tier configuration");
            for tier in tier_config.tiers() {
                let classes: Vec<&str> = tier.classes.iter().map(|c| c.as_str()).collect();
                info!(tier = %tier.name, color = %tier.color, classes = ?classes, "Tier");
            }
        }
    }

    Ok(())
}

fn columns_for(input: &InputArgs) -> ColumnNames {
    ColumnNames {
        class: input.class_column.clone(),
        ..ColumnNames::default()
    }
}

fn question_options(input: &InputArgs, question: QuestionArgs) -> AnalysisOptions {
    AnalysisOptions {
        columns: ColumnNames {
            question: question.question_column,
            rate: question.rate_column,
            ..columns_for(input)
        },
        label_policy: input.label_policy,
        question_prefix: question.prefix,
        rate_scale: question.rate_scale,
    }
}

/// CLI flag first, then `TIERS_CONFIG`, then the built-in tiers.
fn resolve_tiers(flag: Option<String>, settings: &Settings) -> Result<TierConfig> {
    let path = flag.or_else(|| settings.tiers_config.clone());
    if let Some(ref path) = path {
        info!(path = %path, "Loading tier config");
    }
    TierConfig::resolve(path.as_deref())
}

fn output_dir(input: &InputArgs, settings: &Settings) -> PathBuf {
    PathBuf::from(
        input
            .output_dir
            .clone()
            .unwrap_or_else(|| settings.output_dir.clone()),
    )
}

fn emit<T: std::fmt::Debug + serde::Serialize>(report: &T, json: bool) -> Result<()> {
    if json {
        print_json(report)
    } else {
        print_pretty(report);
        Ok(())
    }
}

fn log_paths(paths: &[PathBuf]) {
    for path in paths {
        info!(path = %path.display(), "Wrote");
    }
}
