//! Derives model features from raw weekly performance records.
//!
//! The pass is a deterministic function of the full input set: rows are
//! re-grouped per player and re-sorted by (season, week) internally, so
//! ingestion order never changes the output. Rolling windows run over a
//! player's whole ordered history, crossing season boundaries.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::application::features::rolling::{rolling_mean, rolling_std, trend_delta, week_change};
use crate::config::FeatureConfig;
use crate::domain::errors::DataIntegrityError;
use crate::domain::player::AugmentedRecord;
use crate::domain::schema::{
    FeatureFrame, FeatureRow, FeatureSchema, RAW_STATS, ROLLING_STATS, TREND_STATS, stat_value,
};

#[derive(Debug)]
pub struct FeatureEngineer {
    config: FeatureConfig,
    team_vocabulary: Option<Vec<String>>,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            team_vocabulary: None,
        }
    }

    /// Pins the one-hot team columns to a known vocabulary instead of the
    /// teams present in the input. Required at inference time so a single
    /// row still emits every `team_*` column the model was trained on.
    pub fn with_team_vocabulary(mut self, teams: Vec<String>) -> Self {
        let teams: BTreeSet<String> = teams.into_iter().collect();
        self.team_vocabulary = Some(teams.into_iter().collect());
        self
    }

    /// Full engineering pass: one output row per input row, with feature
    /// values aligned to the returned schema.
    pub fn engineer(&self, records: &[AugmentedRecord]) -> Result<FeatureFrame, DataIntegrityError> {
        if records.is_empty() {
            return Err(DataIntegrityError::EmptyTable);
        }

        let teams: Vec<String> = match &self.team_vocabulary {
            Some(teams) => teams.clone(),
            None => records
                .iter()
                .map(|r| r.record.team.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };
        let schema = self.build_schema(&teams);

        let mut groups: BTreeMap<&str, Vec<&AugmentedRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.record.player_name.as_str())
                .or_default()
                .push(record);
        }

        let mut rows = Vec::with_capacity(records.len());
        for group in groups.values_mut() {
            group.sort_by_key(|r| (r.record.season, r.record.week));
            self.engineer_player(group, &schema, &teams, &mut rows)?;
        }

        info!(
            rows = rows.len(),
            features = schema.features.len(),
            "feature engineering complete"
        );
        Ok(FeatureFrame { schema, rows })
    }

    /// Feature column names in their fixed order. `player_columns` must
    /// produce a series for every name listed here.
    fn build_schema(&self, teams: &[String]) -> FeatureSchema {
        let mut features: Vec<String> = Vec::new();

        for stat in RAW_STATS {
            features.push(stat.to_string());
        }
        features.push("player_age".to_string());
        features.push("games_played".to_string());
        features.push("games_started".to_string());
        features.push("metadata_estimated".to_string());

        for &window in &self.windows() {
            for stat in ROLLING_STATS {
                features.push(format!("{stat}_rolling_{window}"));
                features.push(format!("{stat}_rolling_{window}_std"));
            }
        }
        for stat in TREND_STATS {
            features.push(format!("{stat}_trend_3v3"));
            features.push(format!("{stat}_week_change"));
            features.push(format!("{stat}_consistency"));
        }

        features.push("projection_error".to_string());
        features.push("projection_accuracy_rolling_5".to_string());
        features.push("projection_vs_recent".to_string());
        features.push("projection_confidence".to_string());

        features.push("season_week".to_string());
        features.push("early_season".to_string());
        features.push("late_season".to_string());

        for team in teams {
            features.push(format!("team_{team}"));
        }

        FeatureSchema::new(features)
    }

    fn windows(&self) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        self.config
            .rolling_windows
            .iter()
            .copied()
            .filter(|w| seen.insert(*w))
            .collect()
    }

    /// Engineers one player's (season, week)-ordered run of records.
    fn engineer_player(
        &self,
        group: &[&AugmentedRecord],
        schema: &FeatureSchema,
        teams: &[String],
        out: &mut Vec<FeatureRow>,
    ) -> Result<(), DataIntegrityError> {
        let columns = self.player_columns(group, teams);

        for (i, augmented) in group.iter().enumerate() {
            let record = &augmented.record;
            let target = record.derive_target()?;
            let values = schema
                .features
                .iter()
                .map(|name| {
                    let v = columns.get(name.as_str()).map_or(0.0, |series| series[i]);
                    // Missing-value post-pass: numeric features impute to 0.
                    if v.is_finite() { v } else { 0.0 }
                })
                .collect();

            out.push(FeatureRow {
                player_name: record.player_name.clone(),
                season: record.season,
                week: record.week,
                team: record.team.clone(),
                projection: record.projection,
                fantasy_points: record.fantasy_points,
                target,
                values,
            });
        }
        Ok(())
    }

    /// One series per feature column for a single player's ordered run.
    fn player_columns(
        &self,
        group: &[&AugmentedRecord],
        teams: &[String],
    ) -> BTreeMap<String, Vec<f64>> {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let series = |stat: &str| -> Vec<f64> {
            group.iter().map(|r| stat_value(&r.record, stat)).collect()
        };

        for stat in RAW_STATS {
            columns.insert(stat.to_string(), series(stat));
        }

        columns.insert(
            "player_age".to_string(),
            group.iter().map(|r| r.age.unwrap_or(0.0)).collect(),
        );
        columns.insert(
            "games_played".to_string(),
            group.iter().map(|r| r.games_played.unwrap_or(0.0)).collect(),
        );
        columns.insert(
            "games_started".to_string(),
            group.iter().map(|r| r.games_started.unwrap_or(0.0)).collect(),
        );
        columns.insert(
            "metadata_estimated".to_string(),
            group
                .iter()
                .map(|r| if r.metadata_estimated { 1.0 } else { 0.0 })
                .collect(),
        );

        for &window in &self.windows() {
            for stat in ROLLING_STATS {
                let values = series(stat);
                columns.insert(format!("{stat}_rolling_{window}"), rolling_mean(&values, window));
                columns.insert(
                    format!("{stat}_rolling_{window}_std"),
                    rolling_std(&values, window),
                );
            }
        }

        for stat in TREND_STATS {
            let values = series(stat);
            columns.insert(format!("{stat}_trend_3v3"), trend_delta(&values, 3));
            columns.insert(format!("{stat}_week_change"), week_change(&values));
            columns.insert(
                format!("{stat}_consistency"),
                rolling_std(&values, 5).iter().map(|s| 1.0 / (1.0 + s)).collect(),
            );
        }

        // Projection features. The 3-week windows here are part of the
        // contract and do not follow the configured window list.
        let fantasy = series("fantasy_points");
        let errors: Vec<f64> = group
            .iter()
            .map(|r| {
                r.record
                    .projection
                    .map_or(0.0, |p| r.record.fantasy_points - p)
            })
            .collect();
        let recent_mean = rolling_mean(&fantasy, 3);
        let recent_std = rolling_std(&fantasy, 3);
        columns.insert("projection_error".to_string(), errors.clone());
        columns.insert(
            "projection_accuracy_rolling_5".to_string(),
            rolling_mean(&errors, 5),
        );
        columns.insert(
            "projection_vs_recent".to_string(),
            group
                .iter()
                .zip(&recent_mean)
                .map(|(r, mean)| r.record.projection.unwrap_or(0.0) - mean)
                .collect(),
        );
        columns.insert(
            "projection_confidence".to_string(),
            recent_std.iter().map(|s| 1.0 / (1.0 + s)).collect(),
        );

        columns.insert(
            "season_week".to_string(),
            group.iter().map(|r| r.record.week as f64).collect(),
        );
        columns.insert(
            "early_season".to_string(),
            group
                .iter()
                .map(|r| if r.record.week <= 4 { 1.0 } else { 0.0 })
                .collect(),
        );
        columns.insert(
            "late_season".to_string(),
            group
                .iter()
                .map(|r| if r.record.week >= 14 { 1.0 } else { 0.0 })
                .collect(),
        );

        for team in teams {
            columns.insert(
                format!("team_{team}"),
                group
                    .iter()
                    .map(|r| if r.record.team == *team { 1.0 } else { 0.0 })
                    .collect(),
            );
        }

        columns
    }
}
