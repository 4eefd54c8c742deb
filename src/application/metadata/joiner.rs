//! Joins per-season age and participation metadata onto performance records.
//!
//! Matching is deterministic: normalized-name equality, then a fixed set of
//! name-variant rewrites (punctuation stripped, generational suffix dropped).
//! There is no probabilistic scoring; a name either matches or it doesn't.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{info, warn};

use crate::domain::errors::PipelineError;
use crate::domain::player::{AugmentedRecord, MetadataRecord, PerformanceRecord};
use crate::infrastructure::csv_store;

/// Games assumed per extrapolated season when participation counts must be
/// carried forward past the last recorded season.
const GAMES_PER_SEASON: f64 = 16.0;

const SUFFIX_TOKENS: &[&str] = &["jr", "sr", "iii", "ii"];

pub struct MetadataJoiner {
    /// Season-sorted metadata rows, indexed under every name variant.
    by_player: HashMap<String, Vec<MetadataRecord>>,
}

impl MetadataJoiner {
    pub fn new(metadata: Vec<MetadataRecord>) -> Self {
        let mut by_player: HashMap<String, Vec<MetadataRecord>> = HashMap::new();
        for record in metadata {
            for variant in name_variants(&record.player_name) {
                by_player.entry(variant).or_default().push(record.clone());
            }
        }
        for seasons in by_player.values_mut() {
            seasons.sort_by_key(|m| m.season);
        }
        Self { by_player }
    }

    /// Loads the metadata table from CSV. An absent file is a fatal setup
    /// error, not a per-record miss.
    pub fn from_csv(path: &Path) -> Result<Self, PipelineError> {
        Ok(Self::new(csv_store::load_metadata(path)?))
    }

    /// Augments every record with age/tenure columns where a name match
    /// exists, extrapolating forward for seasons past the last known one.
    /// Emits match-rate diagnostics.
    pub fn join(&self, records: Vec<PerformanceRecord>) -> Vec<AugmentedRecord> {
        let players: BTreeSet<String> =
            records.iter().map(|r| r.player_name.clone()).collect();
        let total_players = players.len();

        let mut unmatched: Vec<&str> = Vec::new();
        let mut matched_players = 0usize;
        for player in &players {
            if self.lookup(player).is_some() {
                matched_players += 1;
            } else {
                unmatched.push(player);
            }
        }

        let augmented = records
            .into_iter()
            .map(|record| match self.lookup(&record.player_name) {
                Some(seasons) => resolve_season(record, seasons),
                None => AugmentedRecord::bare(record),
            })
            .collect();

        info!(
            matched = matched_players,
            total = total_players,
            coverage_pct = if total_players > 0 {
                matched_players as f64 / total_players as f64 * 100.0
            } else {
                0.0
            },
            "metadata join complete"
        );
        if !unmatched.is_empty() {
            warn!(
                count = unmatched.len(),
                players = ?&unmatched[..unmatched.len().min(10)],
                "players without metadata"
            );
        }

        augmented
    }

    fn lookup(&self, name: &str) -> Option<&[MetadataRecord]> {
        for variant in name_variants(name) {
            if let Some(seasons) = self.by_player.get(&variant) {
                return Some(seasons);
            }
        }
        None
    }
}

/// Picks the metadata row for the record's season, or extrapolates forward
/// from the latest known season. Seasons earlier than all known metadata
/// stay unmatched.
fn resolve_season(record: PerformanceRecord, seasons: &[MetadataRecord]) -> AugmentedRecord {
    if let Some(exact) = seasons.iter().find(|m| m.season == record.season) {
        return AugmentedRecord {
            age: Some(exact.age),
            games_played: Some(exact.games_played),
            games_started: Some(exact.games_started),
            metadata_estimated: false,
            record,
        };
    }

    let latest = seasons
        .iter()
        .filter(|m| m.season < record.season)
        .max_by_key(|m| m.season);
    match latest {
        Some(latest) => {
            let gap = (record.season - latest.season) as f64;
            AugmentedRecord {
                age: Some(latest.age + gap),
                games_played: Some(latest.games_played + gap * GAMES_PER_SEASON),
                games_started: Some(latest.games_started + gap * GAMES_PER_SEASON),
                metadata_estimated: true,
                record,
            }
        }
        None => AugmentedRecord::bare(record),
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Deterministic rewrites tried in order: normalized, punctuation stripped,
/// generational suffix dropped, and suffix dropped after stripping.
fn name_variants(name: &str) -> Vec<String> {
    let base = normalize_name(name);
    let stripped = base.replace(['\'', '.'], "");

    let mut variants = vec![
        base.clone(),
        base.replace('\'', ""),
        base.replace('.', ""),
        strip_suffix_token(&base),
        strip_suffix_token(&stripped),
    ];
    variants.retain(|v| !v.is_empty());

    let mut seen = BTreeSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}

/// Drops a trailing generational suffix token ("jr", "sr", "ii", "iii"),
/// with or without a trailing period.
fn strip_suffix_token(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if let Some(last) = tokens.last() {
        let bare = last.trim_end_matches('.');
        if tokens.len() > 1 && SUFFIX_TOKENS.contains(&bare) {
            return tokens[..tokens.len() - 1].join(" ");
        }
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::player::fixtures::record;

    fn meta(name: &str, season: u16, age: f64, games: f64) -> MetadataRecord {
        MetadataRecord {
            player_name: name.to_string(),
            season,
            age,
            games_played: games,
            games_started: games - 2.0,
        }
    }

    #[test]
    fn test_exact_season_match() {
        let joiner = MetadataJoiner::new(vec![meta("Christian McCaffrey", 2022, 26.0, 80.0)]);
        let out = joiner.join(vec![record("Christian McCaffrey", 2022, 1, 20.0, 18.0)]);

        assert_eq!(out[0].age, Some(26.0));
        assert_eq!(out[0].games_played, Some(80.0));
        assert!(!out[0].metadata_estimated);
    }

    #[test]
    fn test_punctuation_variant_matches() {
        let joiner = MetadataJoiner::new(vec![meta("A.J. Brown", 2022, 25.0, 48.0)]);
        let out = joiner.join(vec![record("AJ Brown", 2022, 1, 20.0, 18.0)]);
        assert_eq!(out[0].age, Some(25.0));
    }

    #[test]
    fn test_generational_suffix_variant_matches() {
        let joiner = MetadataJoiner::new(vec![meta("Odell Beckham Jr.", 2022, 30.0, 100.0)]);
        let out = joiner.join(vec![record("Odell Beckham", 2022, 1, 12.0, 14.0)]);
        assert_eq!(out[0].age, Some(30.0));

        // And the other direction: suffix on the performance side.
        let joiner = MetadataJoiner::new(vec![meta("Kenneth Walker", 2022, 22.0, 16.0)]);
        let out = joiner.join(vec![record("Kenneth Walker III", 2022, 1, 12.0, 14.0)]);
        assert_eq!(out[0].age, Some(22.0));
    }

    #[test]
    fn test_forward_extrapolation_flags_estimate() {
        let joiner = MetadataJoiner::new(vec![meta("Derrick Henry", 2021, 27.0, 90.0)]);
        let out = joiner.join(vec![record("Derrick Henry", 2023, 1, 20.0, 18.0)]);

        assert_eq!(out[0].age, Some(29.0));
        assert_eq!(out[0].games_played, Some(90.0 + 32.0));
        assert_eq!(out[0].games_started, Some(88.0 + 32.0));
        assert!(out[0].metadata_estimated);
    }

    #[test]
    fn test_no_backward_extrapolation() {
        let joiner = MetadataJoiner::new(vec![meta("Bijan Robinson", 2023, 21.0, 16.0)]);
        let out = joiner.join(vec![record("Bijan Robinson", 2021, 1, 8.0, 10.0)]);
        assert_eq!(out[0].age, None);
        assert!(!out[0].metadata_estimated);
    }

    #[test]
    fn test_unmatched_player_keeps_null_metadata() {
        let joiner = MetadataJoiner::new(vec![meta("Derrick Henry", 2022, 28.0, 100.0)]);
        let out = joiner.join(vec![record("Unknown Player", 2022, 1, 10.0, 9.0)]);
        assert_eq!(out[0].age, None);
        assert_eq!(out[0].games_played, None);
        assert!(!out[0].metadata_estimated);
    }

    #[test]
    fn test_suffix_only_stripped_at_end_of_name() {
        // "ii" inside a name token must not be rewritten.
        assert_eq!(strip_suffix_token("patrick skiiles"), "patrick skiiles");
        assert_eq!(strip_suffix_token("kenneth walker iii"), "kenneth walker");
        assert_eq!(strip_suffix_token("odell beckham jr."), "odell beckham");
    }
}
