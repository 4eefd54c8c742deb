use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

use boombust::application::metadata::MetadataJoiner;
use boombust::application::model::PlayerPredictor;
use boombust::application::report::WeeklyReport;
use boombust::config::Config;
use boombust::domain::player::AugmentedRecord;
use boombust::infrastructure::csv_store;
use boombust::infrastructure::model_store::ModelStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rank a full week of players by over-performance probability", long_about = None)]
struct Args {
    /// Directory holding the model artifact
    #[arg(long, default_value = "data/models")]
    model_dir: PathBuf,

    /// Path to weekly performance CSV
    #[arg(long, default_value = "data/weekly_stats.csv")]
    input: PathBuf,

    /// Optional path to player metadata CSV
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Season to report on
    #[arg(long)]
    season: u16,

    /// Week to report on
    #[arg(long)]
    week: u8,

    /// Write the rendered report to this file as well as stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Export the ranked predictions as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    let config = Config::from_env()?;
    let store = ModelStore::new(&args.model_dir);
    let predictor = PlayerPredictor::open(&store, config.features, config.prediction)?;

    let records = csv_store::load_performance(&args.input)
        .with_context(|| format!("loading performance data from {}", args.input.display()))?;
    let week_records: Vec<_> = records
        .into_iter()
        .filter(|r| r.season == args.season && r.week == args.week)
        .collect();
    if week_records.is_empty() {
        bail!(
            "no rows for season {}, week {} in {}",
            args.season,
            args.week,
            args.input.display()
        );
    }
    info!(
        rows = week_records.len(),
        season = args.season,
        week = args.week,
        "reporting on week"
    );

    let augmented: Vec<AugmentedRecord> = match &args.metadata {
        Some(path) => {
            let joiner = MetadataJoiner::from_csv(path)
                .with_context(|| format!("loading metadata from {}", path.display()))?;
            joiner.join(week_records)
        }
        None => week_records.into_iter().map(AugmentedRecord::bare).collect(),
    };

    let mut report = WeeklyReport::new(args.season, args.week);
    for record in &augmented {
        report.push(predictor.predict(record));
    }

    let rendered = report.render();
    println!("{rendered}");

    if let Some(path) = &args.output {
        fs::write(path, &rendered)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    if let Some(path) = &args.csv {
        report.export_csv(path)?;
        info!(path = %path.display(), "rankings exported");
    }

    Ok(())
}
