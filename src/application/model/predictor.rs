//! Online prediction for a single player-week.
//!
//! Loads a persisted model once at construction and re-runs the training
//! feature pipeline on each incoming record. Structural problems with the
//! model artifact are fatal; anything that goes wrong for one record is
//! converted into a labeled failure so batch callers keep going.

use tracing::warn;

use crate::application::features::FeatureEngineer;
use crate::application::model::TrainedModel;
use crate::config::{FeatureConfig, PredictionConfig};
use crate::domain::errors::{PipelineError, SetupError};
use crate::domain::player::AugmentedRecord;
use crate::domain::prediction::{
    ConfidenceTier, KeyFeature, PredictionFailure, PredictionOutcome, PredictionResult,
    Recommendation,
};
use crate::infrastructure::model_store::ModelStore;

#[derive(Debug)]
pub struct PlayerPredictor {
    model: TrainedModel,
    engineer: FeatureEngineer,
    top_features: usize,
}

impl PlayerPredictor {
    pub fn new(
        model: TrainedModel,
        features: FeatureConfig,
        prediction: PredictionConfig,
    ) -> Self {
        let engineer =
            FeatureEngineer::new(features).with_team_vocabulary(model.team_vocabulary());
        Self {
            model,
            engineer,
            top_features: prediction.top_features,
        }
    }

    /// Loads the persisted model. A missing or incomplete artifact is fatal
    /// here, before any prediction is attempted.
    pub fn open(
        store: &ModelStore,
        features: FeatureConfig,
        prediction: PredictionConfig,
    ) -> Result<Self, SetupError> {
        let model = store.load()?;
        Ok(Self::new(model, features, prediction))
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.model.feature_columns
    }

    /// Predicts one record, isolating any failure to that record.
    pub fn predict(&self, record: &AugmentedRecord) -> PredictionOutcome {
        match self.predict_record(record) {
            Ok(result) => PredictionOutcome::Ok(result),
            Err(e) => {
                warn!(
                    player = %record.record.player_name,
                    error = %e,
                    "prediction failed"
                );
                PredictionOutcome::Failed(PredictionFailure {
                    player_name: record.record.player_name.clone(),
                    season: record.record.season,
                    week: record.record.week,
                    error: e.to_string(),
                })
            }
        }
    }

    fn predict_record(&self, record: &AugmentedRecord) -> Result<PredictionResult, PipelineError> {
        let projection = record
            .record
            .projection
            .ok_or_else(|| PipelineError::model("predict", "record has no projection"))?;

        // Single-row history: rolling features degrade to the one observation.
        let frame = self.engineer.engineer(std::slice::from_ref(record))?;

        // The persisted feature list must be fully covered before any
        // inference call.
        frame.schema.covers(&self.model.feature_columns)?;

        let row = frame
            .rows
            .first()
            .ok_or_else(|| PipelineError::model("predict", "engineered frame is empty"))?;
        let features: Vec<f64> = self
            .model
            .feature_columns
            .iter()
            .map(|name| frame.value(row, name).unwrap_or(0.0))
            .collect();

        let probability = self.model.probability(&features)?;
        let prediction = (probability >= 0.5) as u8;

        let key_features = self
            .model
            .importance
            .iter()
            .take(self.top_features)
            .map(|fi| KeyFeature {
                feature: fi.feature.clone(),
                value: frame.value(row, &fi.feature).unwrap_or(0.0),
                importance: fi.importance,
            })
            .collect();

        Ok(PredictionResult {
            player_name: record.record.player_name.clone(),
            season: record.record.season,
            week: record.record.week,
            projection,
            prediction,
            over_perform_probability: probability,
            confidence: ConfidenceTier::from_probability(probability),
            recommendation: Recommendation::derive(prediction, probability),
            key_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::model::fixtures::tiny_forest;
    use crate::application::model::{FeatureImportance, ModelTrainer};
    use crate::config::{FeatureConfig, ModelConfig};
    use crate::domain::player::fixtures::record;

    fn trained_model() -> TrainedModel {
        // A real model over the engineered schema, trained on a small but
        // separable dataset.
        let mut records = Vec::new();
        for p in 0..4 {
            let name = format!("Player {p}");
            for week in 1..=10u8 {
                let mut rec = record(&name, 2023, week, 0.0, 14.0);
                let strong = (week as usize + p) % 2 == 0;
                rec.rushing_yards = if strong { 120.0 } else { 30.0 };
                rec.fantasy_points = if strong { 20.0 } else { 8.0 };
                records.push(AugmentedRecord::bare(rec));
            }
        }
        let frame = FeatureEngineer::new(FeatureConfig::default())
            .engineer(&records)
            .unwrap();
        let config = ModelConfig {
            n_trees: 20,
            ..ModelConfig::default()
        };
        let (model, _) = ModelTrainer::new(config).train(&frame).unwrap();
        model
    }

    fn predictor(model: TrainedModel) -> PlayerPredictor {
        PlayerPredictor::new(model, FeatureConfig::default(), PredictionConfig::default())
    }

    #[test]
    fn test_single_record_prediction_succeeds() {
        let predictor = predictor(trained_model());
        let mut rec = record("New Guy", 2023, 11, 20.0, 14.0);
        rec.rushing_yards = 120.0;

        match predictor.predict(&AugmentedRecord::bare(rec)) {
            PredictionOutcome::Ok(result) => {
                assert!((0.0..=1.0).contains(&result.over_perform_probability));
                assert_eq!(result.projection, 14.0);
                assert_eq!(result.key_features.len(), 5);
                assert_eq!(
                    result.prediction,
                    (result.over_perform_probability >= 0.5) as u8
                );
            }
            PredictionOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[test]
    fn test_feature_mismatch_is_raised_before_inference() {
        let mut model = trained_model();
        model.feature_columns.push("made_up_column".to_string());
        let predictor = predictor(model);

        match predictor.predict(&AugmentedRecord::bare(record("CMC", 2023, 11, 20.0, 14.0))) {
            PredictionOutcome::Failed(f) => {
                assert!(f.error.contains("made_up_column"));
                assert!(f.error.contains("trained feature list"));
            }
            PredictionOutcome::Ok(_) => panic!("mismatch must not silently reindex"),
        }
    }

    #[test]
    fn test_missing_projection_is_a_labeled_failure() {
        let predictor = predictor(trained_model());
        let mut rec = record("CMC", 2023, 11, 20.0, 14.0);
        rec.projection = None;

        match predictor.predict(&AugmentedRecord::bare(rec)) {
            PredictionOutcome::Failed(f) => {
                assert_eq!(f.player_name, "CMC");
                assert!(f.error.contains("projection"));
            }
            PredictionOutcome::Ok(_) => panic!("expected a labeled failure"),
        }
    }

    #[test]
    fn test_unknown_team_yields_zero_indicators_not_mismatch() {
        let predictor = predictor(trained_model());
        let mut rec = record("CMC", 2023, 11, 20.0, 14.0);
        rec.team = "XYZ".to_string();

        assert!(matches!(
            predictor.predict(&AugmentedRecord::bare(rec)),
            PredictionOutcome::Ok(_)
        ));
    }

    #[test]
    fn test_key_features_reuse_global_importance_order() {
        let model = TrainedModel {
            forest: tiny_forest(),
            feature_columns: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            importance: vec![
                FeatureImportance { feature: "b".to_string(), importance: 0.4 },
                FeatureImportance { feature: "c".to_string(), importance: 0.1 },
                FeatureImportance { feature: "a".to_string(), importance: 0.0 },
            ],
        };
        // Importance order is global, not re-ranked per record.
        let names: Vec<&str> = model
            .importance
            .iter()
            .take(2)
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
