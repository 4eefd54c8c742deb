mod predictor;
mod trainer;

pub use predictor::PlayerPredictor;
pub use trainer::{FeatureImportance, ModelTrainer, TrainingMetrics, TrainingReport};

use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::domain::errors::PipelineError;

/// The fitted ensemble. A forest regressor over the 0/1 target: the
/// tree-vote average is the positive-class probability.
pub type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// A fitted ensemble plus the exact ordered feature-column list it was
/// trained on and its global importance ranking. The column list is the
/// inference contract: columns supplied at predict time must match it in
/// order, verified before every inference call.
#[derive(Debug)]
pub struct TrainedModel {
    pub(crate) forest: Forest,
    pub feature_columns: Vec<String>,
    pub importance: Vec<FeatureImportance>,
}

impl TrainedModel {
    /// Positive-class probability for one feature vector, ordered per
    /// `feature_columns`.
    pub fn probability(&self, features: &[f64]) -> Result<f64, PipelineError> {
        let matrix = DenseMatrix::from_2d_vec(&vec![features.to_vec()])
            .map_err(|e| PipelineError::model("matrix", e))?;
        let predictions = self
            .forest
            .predict(&matrix)
            .map_err(|e| PipelineError::model("predict", e))?;
        predictions
            .first()
            .map(|p| p.clamp(0.0, 1.0))
            .ok_or_else(|| PipelineError::model("predict", "empty prediction output"))
    }

    /// The team one-hot vocabulary recovered from the trained columns, so
    /// single-row inference can re-create the exact `team_*` set.
    pub fn team_vocabulary(&self) -> Vec<String> {
        self.feature_columns
            .iter()
            .filter_map(|name| name.strip_prefix("team_"))
            .map(str::to_string)
            .collect()
    }
}


#[cfg(test)]
pub(crate) mod fixtures {
    use super::Forest;
    use smartcore::ensemble::random_forest_regressor::{
        RandomForestRegressor, RandomForestRegressorParameters,
    };
    use smartcore::linalg::basic::matrix::DenseMatrix;

    /// A minimal fitted forest for tests that need a real model value.
    pub fn tiny_forest() -> Forest {
        let x = DenseMatrix::from_2d_vec(&vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 1.0, 1.0],
        ])
        .unwrap();
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(5)
            .with_seed(42);
        RandomForestRegressor::fit(&x, &y, params).unwrap()
    }
}
