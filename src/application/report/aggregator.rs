//! Collects per-player predictions for one week, ranks them, and buckets
//! them into actionable tiers. Pure transformation over already-computed
//! results; the only I/O is the optional CSV export of the finished rows.

use std::cmp::Ordering;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::domain::errors::PipelineError;
use crate::domain::prediction::{
    PredictionFailure, PredictionOutcome, PredictionResult, Recommendation,
};

const RULE: &str = "--------------------------------------------------";

pub struct WeeklyReport {
    pub season: u16,
    pub week: u8,
    results: Vec<PredictionResult>,
    failures: Vec<PredictionFailure>,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    rank: usize,
    player_name: &'a str,
    season: u16,
    week: u8,
    projection: f64,
    prediction: u8,
    over_perform_probability: f64,
    confidence: String,
    recommendation: String,
}

impl WeeklyReport {
    pub fn new(season: u16, week: u8) -> Self {
        Self {
            season,
            week,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Adds one prediction outcome. Failures are kept for the report but
    /// never abort the batch.
    pub fn push(&mut self, outcome: PredictionOutcome) {
        match outcome {
            PredictionOutcome::Ok(result) => self.results.push(result),
            PredictionOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn results(&self) -> &[PredictionResult] {
        &self.results
    }

    pub fn failures(&self) -> &[PredictionFailure] {
        &self.failures
    }

    /// Results sorted descending by over-perform probability; ties break by
    /// name so the ranking is deterministic.
    pub fn ranked(&self) -> Vec<&PredictionResult> {
        let mut ranked: Vec<&PredictionResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| {
            b.over_perform_probability
                .partial_cmp(&a.over_perform_probability)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        ranked
    }

    /// All results in one recommendation tier, ranked.
    pub fn tier(&self, recommendation: Recommendation) -> Vec<&PredictionResult> {
        self.ranked()
            .into_iter()
            .filter(|r| r.recommendation == recommendation)
            .collect()
    }

    /// The top-ranked result and its probability margin over the runner-up
    /// (0 when there is no runner-up).
    pub fn favored_pick(&self) -> Option<(&PredictionResult, f64)> {
        let ranked = self.ranked();
        let top = ranked.first()?;
        let margin = ranked
            .get(1)
            .map(|second| top.over_perform_probability - second.over_perform_probability)
            .unwrap_or(0.0);
        Some((top, margin))
    }

    /// Ranked summary plus tier groupings, as report text.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let ranked = self.ranked();

        lines.push("=".repeat(80));
        lines.push(format!(
            "WEEKLY OVER-PERFORMANCE REPORT - WEEK {}, {}",
            self.week, self.season
        ));
        lines.push("=".repeat(80));
        lines.push(format!(
            "Generated: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(format!("Total players: {}", ranked.len()));
        lines.push(String::new());

        let over: usize = ranked.iter().filter(|r| r.prediction == 1).count();
        lines.push("SUMMARY".to_string());
        lines.push(RULE.to_string());
        lines.push(format!("Over-perform predictions:  {over}"));
        lines.push(format!(
            "Under-perform predictions: {}",
            ranked.len() - over
        ));
        if !ranked.is_empty() {
            let avg: f64 = ranked
                .iter()
                .map(|r| r.over_perform_probability)
                .sum::<f64>()
                / ranked.len() as f64;
            lines.push(format!("Average over-perform probability: {:.1}%", avg * 100.0));
        }
        if let Some((top, margin)) = self.favored_pick() {
            lines.push(format!(
                "Favored pick: {} ({:.1}%, margin {:.1}pp over runner-up)",
                top.player_name,
                top.over_perform_probability * 100.0,
                margin * 100.0
            ));
        }
        lines.push(String::new());

        for (heading, tier) in [
            ("STRONG STARTS", Recommendation::StrongStart),
            ("CONSIDER STARTING", Recommendation::ConsiderStarting),
            ("CONSIDER BENCHING", Recommendation::ConsiderBenching),
            ("AVOID", Recommendation::Avoid),
        ] {
            let members = self.tier(tier);
            if members.is_empty() {
                continue;
            }
            lines.push(heading.to_string());
            lines.push(RULE.to_string());
            for r in members {
                lines.push(format!(
                    "  {:<22} projection {:>5.1} | over-perform {:>5.1}% | confidence {}",
                    r.player_name,
                    r.projection,
                    r.over_perform_probability * 100.0,
                    r.confidence
                ));
            }
            lines.push(String::new());
        }

        lines.push("FULL RANKINGS (by over-perform probability)".to_string());
        lines.push(RULE.to_string());
        lines.push(format!(
            "{:<5} {:<22} {:>10} {:>13} {:>11}  {}",
            "Rank", "Player", "Projection", "Over-Perform", "Confidence", "Recommendation"
        ));
        for (rank, r) in ranked.iter().enumerate() {
            lines.push(format!(
                "{:<5} {:<22} {:>10.1} {:>12.1}% {:>11}  {}",
                rank + 1,
                r.player_name,
                r.projection,
                r.over_perform_probability * 100.0,
                r.confidence.to_string(),
                r.recommendation
            ));
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push("FAILED PREDICTIONS".to_string());
            lines.push(RULE.to_string());
            for f in &self.failures {
                lines.push(format!("  {:<22} {}", f.player_name, f.error));
            }
        }

        lines.push("=".repeat(80));
        lines.join("\n")
    }

    /// Writes the ranked rows as CSV.
    pub fn export_csv(&self, path: &Path) -> Result<(), PipelineError> {
        let persistence = |e: &dyn std::fmt::Display| PipelineError::Persistence {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut writer = csv::Writer::from_path(path).map_err(|e| persistence(&e))?;
        for (rank, r) in self.ranked().iter().enumerate() {
            writer
                .serialize(ExportRow {
                    rank: rank + 1,
                    player_name: &r.player_name,
                    season: r.season,
                    week: r.week,
                    projection: r.projection,
                    prediction: r.prediction,
                    over_perform_probability: r.over_perform_probability,
                    confidence: r.confidence.to_string(),
                    recommendation: r.recommendation.to_string(),
                })
                .map_err(|e| persistence(&e))?;
        }
        writer.flush().map_err(|e| persistence(&e))?;
        Ok(())
    }
}
