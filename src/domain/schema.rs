use serde::{Deserialize, Serialize};

use crate::domain::errors::FeatureMismatchError;
use crate::domain::player::PerformanceRecord;

/// Stats that receive rolling mean/std columns, in column order.
/// The engineered schema is derived from this list; reordering it is a
/// breaking change for persisted models.
pub const ROLLING_STATS: &[&str] = &[
    "rushing_yards",
    "rushing_touchdowns",
    "receptions",
    "receiving_yards",
    "receiving_touchdowns",
    "fantasy_points",
];

/// Stats that receive trend / week-change / consistency columns.
pub const TREND_STATS: &[&str] = &["fantasy_points", "rushing_yards", "receptions"];

/// Raw counting stats carried through as features unchanged.
pub const RAW_STATS: &[&str] = &[
    "rushing_yards",
    "rushing_touchdowns",
    "receptions",
    "receiving_yards",
    "receiving_touchdowns",
    "fumbles_lost",
    "carries",
    "targets",
];

/// Looks up a named raw stat on a record. Names outside the stat lists above
/// are a programming error.
pub fn stat_value(record: &PerformanceRecord, stat: &str) -> f64 {
    match stat {
        "rushing_yards" => record.rushing_yards,
        "rushing_touchdowns" => record.rushing_touchdowns,
        "receptions" => record.receptions,
        "receiving_yards" => record.receiving_yards,
        "receiving_touchdowns" => record.receiving_touchdowns,
        "fumbles_lost" => record.fumbles_lost,
        "carries" => record.carries,
        "targets" => record.targets,
        "fantasy_points" => record.fantasy_points,
        other => unreachable!("unknown stat column: {other}"),
    }
}

/// Explicit column contract between pipeline stages: which columns identify a
/// row, which one is the label, and which are model inputs (in order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub identifiers: Vec<String>,
    pub label: String,
    pub features: Vec<String>,
}

impl FeatureSchema {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            identifiers: vec![
                "player_name".to_string(),
                "season".to_string(),
                "week".to_string(),
                "team".to_string(),
            ],
            label: "target".to_string(),
            features,
        }
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f == name)
    }

    /// Verifies this schema's columns cover every column in `trained`, the
    /// feature list a model was fit on. Must be called before inference.
    pub fn covers(&self, trained: &[String]) -> Result<(), FeatureMismatchError> {
        let missing: Vec<String> = trained
            .iter()
            .filter(|name| !self.features.contains(name))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FeatureMismatchError { missing })
        }
    }
}

/// One engineered row: identifiers, raw outcome fields, the binary target,
/// and feature values aligned with the owning frame's schema.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub player_name: String,
    pub season: u16,
    pub week: u8,
    pub team: String,
    pub projection: Option<f64>,
    pub fantasy_points: f64,
    pub target: u8,
    pub values: Vec<f64>,
}

/// Engineered table: schema plus rows. Recomputed whole on every engineering
/// pass; rows are ordered (player, season, week).
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    /// Value of a named feature on one row, `None` if the schema lacks it.
    pub fn value(&self, row: &FeatureRow, feature: &str) -> Option<f64> {
        self.schema.feature_index(feature).map(|i| row.values[i])
    }
}
