use serde::{Deserialize, Serialize};

use crate::domain::errors::DataIntegrityError;

/// One player, one week: raw counting stats plus the pre-game projection and
/// the realized fantasy score. Maps 1:1 onto a CSV row.
///
/// Uniquely keyed by (player_name, season, week); immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub player_name: String,
    #[serde(default)]
    pub player_id: Option<String>,
    pub season: u16,
    pub week: u8,
    #[serde(default)]
    pub position: Option<String>,
    pub team: String,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub rushing_yards: f64,
    #[serde(default)]
    pub rushing_touchdowns: f64,
    #[serde(default)]
    pub receptions: f64,
    #[serde(default)]
    pub receiving_yards: f64,
    #[serde(default)]
    pub receiving_touchdowns: f64,
    #[serde(default)]
    pub fumbles_lost: f64,
    #[serde(default)]
    pub carries: f64,
    #[serde(default)]
    pub targets: f64,
    pub fantasy_points: f64,
    #[serde(default)]
    pub projection: Option<f64>,
    #[serde(default)]
    pub over_performed: Option<bool>,
}

impl PerformanceRecord {
    /// Binary label: did the player beat the projection?
    ///
    /// An explicit `over_performed` flag wins; otherwise derived from
    /// `fantasy_points > projection`. A row with neither is a hard error.
    pub fn derive_target(&self) -> Result<u8, DataIntegrityError> {
        if let Some(flag) = self.over_performed {
            return Ok(flag as u8);
        }
        match self.projection {
            Some(projection) => Ok((self.fantasy_points > projection) as u8),
            None => Err(DataIntegrityError::UndefinedTarget {
                player: self.player_name.clone(),
                season: self.season,
                week: self.week,
            }),
        }
    }
}

/// Per-player, per-season age and participation counts from the auxiliary
/// metadata source. At most one row per (player, season).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub player_name: String,
    pub season: u16,
    pub age: f64,
    pub games_played: f64,
    pub games_started: f64,
}

/// A performance record with joined metadata. `metadata_estimated` is set
/// when the age/games values were extrapolated from an earlier season rather
/// than read directly.
#[derive(Debug, Clone)]
pub struct AugmentedRecord {
    pub record: PerformanceRecord,
    pub age: Option<f64>,
    pub games_played: Option<f64>,
    pub games_started: Option<f64>,
    pub metadata_estimated: bool,
}

impl AugmentedRecord {
    /// Wraps a record with no metadata; derived feature columns impute to 0.
    pub fn bare(record: PerformanceRecord) -> Self {
        Self {
            record,
            age: None,
            games_played: None,
            games_started: None,
            metadata_estimated: false,
        }
    }
}
