use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

use boombust::application::features::FeatureEngineer;
use boombust::application::metadata::MetadataJoiner;
use boombust::application::model::ModelTrainer;
use boombust::config::Config;
use boombust::domain::player::AugmentedRecord;
use boombust::infrastructure::csv_store;
use boombust::infrastructure::model_store::ModelStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the over-performance model", long_about = None)]
struct Args {
    /// Path to weekly performance CSV
    #[arg(long, default_value = "data/weekly_stats.csv")]
    input: PathBuf,

    /// Optional path to player metadata CSV (age, games played/started)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Directory to write the model artifact into
    #[arg(long, default_value = "data/models")]
    model_dir: PathBuf,

    /// Number of trees in the random forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Maximum depth of trees
    #[arg(long)]
    max_depth: Option<u16>,

    /// Minimum samples required to split an internal node
    #[arg(long)]
    min_split: Option<usize>,

    /// Minimum samples required at a leaf node
    #[arg(long)]
    min_leaf: Option<usize>,

    /// Random seed for split, folds, and forest
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of rows held out for the test split
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Stratified cross-validation folds
    #[arg(long)]
    cv_folds: Option<usize>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(v) = args.n_trees {
        config.model.n_trees = v;
    }
    if let Some(v) = args.max_depth {
        config.model.max_depth = v;
    }
    if let Some(v) = args.min_split {
        config.model.min_samples_split = v;
    }
    if let Some(v) = args.min_leaf {
        config.model.min_samples_leaf = v;
    }
    if let Some(v) = args.seed {
        config.model.seed = v;
    }
    if let Some(v) = args.test_fraction {
        config.model.test_fraction = v;
    }
    if let Some(v) = args.cv_folds {
        config.model.cv_folds = v;
    }

    let records = csv_store::load_performance(&args.input)
        .with_context(|| format!("loading performance data from {}", args.input.display()))?;
    info!(rows = records.len(), input = %args.input.display(), "performance data loaded");

    let augmented: Vec<AugmentedRecord> = match &args.metadata {
        Some(path) => {
            let joiner = MetadataJoiner::from_csv(path)
                .with_context(|| format!("loading metadata from {}", path.display()))?;
            joiner.join(records)
        }
        None => {
            info!("no metadata supplied; context features default to neutral");
            records.into_iter().map(AugmentedRecord::bare).collect()
        }
    };

    let frame = FeatureEngineer::new(config.features.clone()).engineer(&augmented)?;
    info!(
        rows = frame.rows.len(),
        features = frame.schema.features.len(),
        "feature frame engineered"
    );

    let trainer = ModelTrainer::new(config.model.clone());
    let (model, report) = trainer.train(&frame)?;

    let m = &report.metrics;
    println!("\n══════════════════════════════════════════════════════");
    println!("  TRAINING RESULTS");
    println!("══════════════════════════════════════════════════════");
    println!("  Train rows:    {}", m.train_rows);
    println!("  Test rows:     {}", m.test_rows);
    println!(
        "  CV accuracy:   {:.4} ± {:.4}  ({} folds)",
        m.cv_accuracy_mean,
        m.cv_accuracy_std,
        m.cv_fold_accuracies.len()
    );
    println!("  Test accuracy: {:.4}", m.test_accuracy);
    println!("  Test AUC:      {:.4}", m.test_auc);

    println!("\n  Top features by permutation importance:");
    for fi in report.importance.iter().take(10) {
        println!("    {:<40} {:>8.4}", fi.feature, fi.importance);
    }
    println!("══════════════════════════════════════════════════════\n");

    let store = ModelStore::new(&args.model_dir);
    store.save(&model)?;
    println!("Model saved to {}", args.model_dir.display());

    Ok(())
}
