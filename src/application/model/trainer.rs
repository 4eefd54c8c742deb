//! Fits and evaluates the over-performance forest.
//!
//! Training fails fast on structural problems (empty table, single-class
//! target); evaluation reports stratified k-fold CV accuracy on the train
//! split plus held-out accuracy and ROC-AUC, and ranks features by seeded
//! permutation importance on the held-out split.

use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::application::model::{Forest, TrainedModel};
use crate::config::ModelConfig;
use crate::domain::errors::{DataIntegrityError, PipelineError};
use crate::domain::schema::FeatureFrame;

/// One feature's global importance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingMetrics {
    pub train_rows: usize,
    pub test_rows: usize,
    pub cv_fold_accuracies: Vec<f64>,
    pub cv_accuracy_mean: f64,
    pub cv_accuracy_std: f64,
    pub test_accuracy: f64,
    pub test_auc: f64,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub metrics: TrainingMetrics,
    pub importance: Vec<FeatureImportance>,
}

pub struct ModelTrainer {
    config: ModelConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Full train/evaluate cycle over an engineered frame.
    pub fn train(&self, frame: &FeatureFrame) -> Result<(TrainedModel, TrainingReport), PipelineError> {
        if frame.rows.is_empty() {
            return Err(DataIntegrityError::EmptyTable.into());
        }
        let labels: Vec<u8> = frame.rows.iter().map(|r| r.target).collect();
        let (train_idx, test_idx) =
            stratified_split(&labels, self.config.test_fraction, self.config.seed)?;
        info!(
            train = train_idx.len(),
            test = test_idx.len(),
            features = frame.schema.features.len(),
            "stratified split"
        );

        let cv_fold_accuracies = self.cross_validate(frame, &labels, &train_idx)?;
        let (cv_accuracy_mean, cv_accuracy_std) = mean_and_std(&cv_fold_accuracies);

        let forest = self.fit(frame, &train_idx)?;

        let test_probs = predict_rows(&forest, frame, &test_idx)?;
        let test_labels: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();
        let test_accuracy = accuracy(&test_probs, &test_labels);
        let test_auc = roc_auc(&test_probs, &test_labels);

        let importance =
            self.permutation_importance(&forest, frame, &test_idx, &test_labels, test_accuracy)?;

        let metrics = TrainingMetrics {
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            cv_fold_accuracies,
            cv_accuracy_mean,
            cv_accuracy_std,
            test_accuracy,
            test_auc,
        };
        info!(
            cv_accuracy = metrics.cv_accuracy_mean,
            test_accuracy = metrics.test_accuracy,
            test_auc = metrics.test_auc,
            "training complete"
        );

        let model = TrainedModel {
            forest,
            feature_columns: frame.schema.features.clone(),
            importance: importance.clone(),
        };
        Ok((model, TrainingReport { metrics, importance }))
    }

    fn fit(&self, frame: &FeatureFrame, idx: &[usize]) -> Result<Forest, PipelineError> {
        let x = matrix(frame, idx)?;
        let y: Vec<f64> = idx.iter().map(|&i| frame.rows[i].target as f64).collect();
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.config.n_trees)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_seed(self.config.seed);
        RandomForestRegressor::fit(&x, &y, params).map_err(|e| PipelineError::model("fit", e))
    }

    /// Stratified k-fold accuracy over the training split only.
    fn cross_validate(
        &self,
        frame: &FeatureFrame,
        labels: &[u8],
        train_idx: &[usize],
    ) -> Result<Vec<f64>, PipelineError> {
        let folds = stratified_folds(labels, train_idx, self.config.cv_folds, self.config.seed);
        let mut accuracies = Vec::with_capacity(folds.len());
        for holdout in &folds {
            let rest: Vec<usize> = train_idx
                .iter()
                .copied()
                .filter(|i| !holdout.contains(i))
                .collect();
            if holdout.is_empty() || rest.len() < 2 {
                continue;
            }
            let forest = self.fit(frame, &rest)?;
            let probs = predict_rows(&forest, frame, holdout)?;
            let fold_labels: Vec<u8> = holdout.iter().map(|&i| labels[i]).collect();
            accuracies.push(accuracy(&probs, &fold_labels));
        }
        Ok(accuracies)
    }

    /// Accuracy drop on the held-out split when one column is shuffled,
    /// ranked descending. Seeded per column for reproducibility.
    fn permutation_importance(
        &self,
        forest: &Forest,
        frame: &FeatureFrame,
        test_idx: &[usize],
        test_labels: &[u8],
        baseline_accuracy: f64,
    ) -> Result<Vec<FeatureImportance>, PipelineError> {
        let base_rows: Vec<Vec<f64>> = test_idx
            .iter()
            .map(|&i| frame.rows[i].values.clone())
            .collect();

        let mut importance = Vec::with_capacity(frame.schema.features.len());
        for (j, feature) in frame.schema.features.iter().enumerate() {
            let mut rows = base_rows.clone();
            let mut column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(j as u64 + 1));
            column.shuffle(&mut rng);
            for (row, v) in rows.iter_mut().zip(column) {
                row[j] = v;
            }

            let x = DenseMatrix::from_2d_vec(&rows)
                .map_err(|e| PipelineError::model("matrix", e))?;
            let probs = forest
                .predict(&x)
                .map_err(|e| PipelineError::model("predict", e))?;
            importance.push(FeatureImportance {
                feature: feature.clone(),
                importance: baseline_accuracy - accuracy(&probs, test_labels),
            });
        }

        importance.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        Ok(importance)
    }
}

fn matrix(frame: &FeatureFrame, idx: &[usize]) -> Result<DenseMatrix<f64>, PipelineError> {
    let rows: Vec<Vec<f64>> = idx.iter().map(|&i| frame.rows[i].values.clone()).collect();
    DenseMatrix::from_2d_vec(&rows).map_err(|e| PipelineError::model("matrix", e))
}

fn predict_rows(
    forest: &Forest,
    frame: &FeatureFrame,
    idx: &[usize],
) -> Result<Vec<f64>, PipelineError> {
    let x = matrix(frame, idx)?;
    forest
        .predict(&x)
        .map_err(|e| PipelineError::model("predict", e))
}

/// Seeded stratified split into (train, test) index sets. Each class
/// contributes `test_fraction` of its rows (at least one, never all).
fn stratified_split(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), DataIntegrityError> {
    let mut negatives: Vec<usize> = Vec::new();
    let mut positives: Vec<usize> = Vec::new();
    for (i, &label) in labels.iter().enumerate() {
        if label == 1 {
            positives.push(i);
        } else {
            negatives.push(i);
        }
    }
    if positives.is_empty() {
        return Err(DataIntegrityError::SingleClass { class: 0 });
    }
    if negatives.is_empty() {
        return Err(DataIntegrityError::SingleClass { class: 1 });
    }
    for (class, group) in [(0u8, &negatives), (1u8, &positives)] {
        if group.len() < 2 {
            return Err(DataIntegrityError::SparseClass {
                class,
                count: group.len(),
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for group in [&mut negatives, &mut positives] {
        group.shuffle(&mut rng);
        let take = ((group.len() as f64 * test_fraction).round() as usize)
            .clamp(1, group.len() - 1);
        test.extend_from_slice(&group[..take]);
        train.extend_from_slice(&group[take..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Distributes the training indices into k folds, class by class, after a
/// seeded shuffle, so every fold keeps roughly the overall class balance.
fn stratified_folds(labels: &[u8], train_idx: &[usize], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.clamp(2, train_idx.len().max(2));
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = train_idx
            .iter()
            .copied()
            .filter(|&i| labels[i] == class)
            .collect();
        members.shuffle(&mut rng);
        for (pos, i) in members.into_iter().enumerate() {
            folds[pos % k].push(i);
        }
    }
    folds.retain(|f| !f.is_empty());
    folds
}

/// Fraction of rows where thresholding the probability at 0.5 recovers the
/// label.
fn accuracy(probs: &[f64], labels: &[u8]) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    let correct = probs
        .iter()
        .zip(labels)
        .filter(|&(p, &l)| (*p >= 0.5) as u8 == l)
        .count();
    correct as f64 / probs.len() as f64
}

/// Rank-based ROC-AUC with averaged ranks for ties. 0.5 when only one class
/// is present.
fn roc_auc(probs: &[f64], labels: &[u8]) -> f64 {
    let n = probs.len();
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = (0..n).filter(|&i| labels[i] == 1).map(|i| ranks[i]).sum();
    (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() as f64 - 1.0).max(1.0);
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::features::FeatureEngineer;
    use crate::config::FeatureConfig;
    use crate::domain::player::AugmentedRecord;
    use crate::domain::player::fixtures::record;

    /// Frame where over-performance tracks rushing yards, both classes well
    /// represented.
    fn training_frame() -> FeatureFrame {
        let mut records = Vec::new();
        for p in 0..4 {
            let name = format!("Player {p}");
            for week in 1..=12u8 {
                let mut rec = record(&name, 2023, week, 0.0, 14.0);
                let strong = (week as usize + p) % 2 == 0;
                rec.rushing_yards = if strong { 110.0 + week as f64 } else { 35.0 };
                rec.fantasy_points = if strong { 19.5 + p as f64 } else { 8.0 };
                records.push(AugmentedRecord::bare(rec));
            }
        }
        FeatureEngineer::new(FeatureConfig::default())
            .engineer(&records)
            .unwrap()
    }

    #[test]
    fn test_single_class_target_is_rejected() {
        let records: Vec<AugmentedRecord> = (1..=10u8)
            .map(|week| AugmentedRecord::bare(record("CMC", 2023, week, 25.0, 20.0)))
            .collect();
        let frame = FeatureEngineer::new(FeatureConfig::default())
            .engineer(&records)
            .unwrap();
        assert!(frame.rows.iter().all(|r| r.target == 1));

        let err = ModelTrainer::new(ModelConfig::default())
            .train(&frame)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DataIntegrity(DataIntegrityError::SingleClass { class: 1 })
        ));
    }

    #[test]
    fn test_stratified_split_is_seeded_and_disjoint() {
        let labels = [0, 1, 0, 1, 0, 1, 0, 1, 0, 1];
        let (train_a, test_a) = stratified_split(&labels, 0.2, 42).unwrap();
        let (train_b, test_b) = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);

        let mut all: Vec<usize> = train_a.iter().chain(&test_a).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        // One test row per class at this fraction.
        assert_eq!(test_a.len(), 2);
        let test_labels: Vec<u8> = test_a.iter().map(|&i| labels[i]).collect();
        assert!(test_labels.contains(&0));
        assert!(test_labels.contains(&1));
    }

    #[test]
    fn test_sparse_class_is_rejected() {
        let labels = [0, 0, 0, 0, 1];
        let err = stratified_split(&labels, 0.2, 42).unwrap_err();
        assert!(matches!(
            err,
            DataIntegrityError::SparseClass { class: 1, count: 1 }
        ));
    }

    #[test]
    fn test_roc_auc_extremes_and_ties() {
        assert_eq!(roc_auc(&[0.9, 0.8, 0.3, 0.2], &[1, 1, 0, 0]), 1.0);
        assert_eq!(roc_auc(&[0.2, 0.3, 0.8, 0.9], &[1, 1, 0, 0]), 0.0);
        // All tied scores: no discrimination.
        assert_eq!(roc_auc(&[0.5, 0.5, 0.5, 0.5], &[1, 0, 1, 0]), 0.5);
    }

    #[test]
    fn test_accuracy_thresholds_at_half() {
        assert_eq!(accuracy(&[0.9, 0.5, 0.2, 0.4], &[1, 1, 0, 1]), 0.75);
    }

    #[test]
    fn test_train_produces_model_and_consistent_report() {
        let frame = training_frame();
        let config = ModelConfig {
            n_trees: 20,
            ..ModelConfig::default()
        };
        let (model, report) = ModelTrainer::new(config).train(&frame).unwrap();

        assert_eq!(model.feature_columns, frame.schema.features);
        assert_eq!(report.importance.len(), frame.schema.features.len());
        for pair in report.importance.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }

        let m = &report.metrics;
        assert_eq!(m.train_rows + m.test_rows, frame.rows.len());
        assert!((0.0..=1.0).contains(&m.test_accuracy));
        assert!((0.0..=1.0).contains(&m.test_auc));
        assert!((0.0..=1.0).contains(&m.cv_accuracy_mean));
        assert!(!m.cv_fold_accuracies.is_empty());

        // The separable signal should be learnable.
        assert!(m.test_accuracy > 0.5);
    }

    #[test]
    fn test_training_is_reproducible_under_fixed_seed() {
        let frame = training_frame();
        let config = ModelConfig {
            n_trees: 10,
            ..ModelConfig::default()
        };
        let (_, report_a) = ModelTrainer::new(config.clone()).train(&frame).unwrap();
        let (_, report_b) = ModelTrainer::new(config).train(&frame).unwrap();
        assert_eq!(report_a.metrics.test_accuracy, report_b.metrics.test_accuracy);
        assert_eq!(report_a.metrics.test_auc, report_b.metrics.test_auc);
    }
}
