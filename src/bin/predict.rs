use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::prelude::*;

use boombust::application::model::PlayerPredictor;
use boombust::config::Config;
use boombust::domain::player::{AugmentedRecord, PerformanceRecord};
use boombust::domain::prediction::PredictionOutcome;
use boombust::infrastructure::model_store::ModelStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Predict over-performance for one player-week", long_about = None)]
struct Args {
    /// Directory holding the model artifact
    #[arg(long, default_value = "data/models")]
    model_dir: PathBuf,

    /// Player name
    #[arg(long)]
    player: String,

    /// Season
    #[arg(long)]
    season: u16,

    /// Week
    #[arg(long)]
    week: u8,

    /// Team abbreviation
    #[arg(long)]
    team: String,

    /// Pre-game fantasy point projection
    #[arg(long)]
    projection: f64,

    /// Fantasy points scored so far this week, if known
    #[arg(long, default_value_t = 0.0)]
    fantasy_points: f64,

    #[arg(long, default_value_t = 0.0)]
    rushing_yards: f64,

    #[arg(long, default_value_t = 0.0)]
    rushing_touchdowns: f64,

    #[arg(long, default_value_t = 0.0)]
    receptions: f64,

    #[arg(long, default_value_t = 0.0)]
    receiving_yards: f64,

    #[arg(long, default_value_t = 0.0)]
    receiving_touchdowns: f64,

    #[arg(long, default_value_t = 0.0)]
    fumbles_lost: f64,

    #[arg(long, default_value_t = 0.0)]
    carries: f64,

    #[arg(long, default_value_t = 0.0)]
    targets: f64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    let config = Config::from_env()?;
    let store = ModelStore::new(&args.model_dir);
    let predictor = PlayerPredictor::open(&store, config.features, config.prediction)?;

    let record = PerformanceRecord {
        player_name: args.player,
        player_id: None,
        season: args.season,
        week: args.week,
        position: None,
        team: args.team,
        opponent: None,
        rushing_yards: args.rushing_yards,
        rushing_touchdowns: args.rushing_touchdowns,
        receptions: args.receptions,
        receiving_yards: args.receiving_yards,
        receiving_touchdowns: args.receiving_touchdowns,
        fumbles_lost: args.fumbles_lost,
        carries: args.carries,
        targets: args.targets,
        fantasy_points: args.fantasy_points,
        projection: Some(args.projection),
        over_performed: None,
    };

    let result = match predictor.predict(&AugmentedRecord::bare(record)) {
        PredictionOutcome::Ok(result) => result,
        PredictionOutcome::Failed(failure) => {
            bail!(
                "prediction for {} (season {}, week {}) failed: {}",
                failure.player_name,
                failure.season,
                failure.week,
                failure.error
            );
        }
    };

    println!("\n══════════════════════════════════════════════════════");
    println!("  {} | season {}, week {}", result.player_name, result.season, result.week);
    println!("══════════════════════════════════════════════════════");
    println!("  Projection:      {:.1} pts", result.projection);
    println!(
        "  Prediction:      {}",
        if result.prediction == 1 { "OVER-PERFORM" } else { "UNDER-PERFORM" }
    );
    println!(
        "  Probability:     {:.1}%",
        result.over_perform_probability * 100.0
    );
    println!("  Confidence:      {}", result.confidence);
    println!("  Recommendation:  {}", result.recommendation);
    println!("\n  Key features:");
    for kf in &result.key_features {
        println!(
            "    {:<40} value {:>10.2}  importance {:.4}",
            kf.feature, kf.value, kf.importance
        );
    }
    println!("══════════════════════════════════════════════════════\n");

    Ok(())
}
