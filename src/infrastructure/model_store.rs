//! Persistence for the trained model.
//!
//! Two files live together in the model directory: the serialized forest
//! (with its importance ranking) and a plain-text sidecar listing the
//! feature columns in training order, one per line. Both are written to
//! temporary files and atomically renamed into place, and loading without
//! both is an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::model::{FeatureImportance, Forest, TrainedModel};
use crate::domain::errors::{PipelineError, SetupError};

const FOREST_FILE: &str = "over_performance_forest.json";
const FEATURES_FILE: &str = "feature_columns.txt";

#[derive(Serialize)]
struct ArtifactRef<'a> {
    forest: &'a Forest,
    importance: &'a [FeatureImportance],
}

#[derive(Deserialize)]
struct Artifact {
    forest: Forest,
    importance: Vec<FeatureImportance>,
}

pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn forest_path(&self) -> PathBuf {
        self.dir.join(FOREST_FILE)
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(FEATURES_FILE)
    }

    /// Persists model and sidecar, replacing any previous artifact
    /// atomically (write-then-rename).
    pub fn save(&self, model: &TrainedModel) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| self.persistence(&self.dir, e))?;

        let forest_json = serde_json::to_vec(&ArtifactRef {
            forest: &model.forest,
            importance: &model.importance,
        })
        .map_err(|e| self.persistence(&self.forest_path(), e))?;
        self.write_atomic(&self.forest_path(), &forest_json)?;

        let mut sidecar = model.feature_columns.join("\n");
        sidecar.push('\n');
        self.write_atomic(&self.features_path(), sidecar.as_bytes())?;

        info!(
            forest = %self.forest_path().display(),
            features = model.feature_columns.len(),
            "model artifact saved"
        );
        Ok(())
    }

    /// Loads model plus sidecar. Either file missing means the artifact is
    /// unusable.
    pub fn load(&self) -> Result<TrainedModel, SetupError> {
        for path in [self.forest_path(), self.features_path()] {
            if !path.exists() {
                return Err(SetupError::MissingFile { path });
            }
        }

        let forest_json =
            fs::read(self.forest_path()).map_err(|e| SetupError::Unreadable {
                path: self.forest_path(),
                reason: e.to_string(),
            })?;
        let artifact: Artifact =
            serde_json::from_slice(&forest_json).map_err(|e| SetupError::IncompleteArtifact {
                dir: self.dir.clone(),
                reason: format!("forest deserialization failed: {e}"),
            })?;

        let sidecar =
            fs::read_to_string(self.features_path()).map_err(|e| SetupError::Unreadable {
                path: self.features_path(),
                reason: e.to_string(),
            })?;
        let feature_columns: Vec<String> = sidecar
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if feature_columns.is_empty() {
            return Err(SetupError::IncompleteArtifact {
                dir: self.dir.clone(),
                reason: "feature column sidecar is empty".to_string(),
            });
        }

        info!(
            forest = %self.forest_path().display(),
            features = feature_columns.len(),
            "model artifact loaded"
        );
        Ok(TrainedModel {
            forest: artifact.forest,
            feature_columns,
            importance: artifact.importance,
        })
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| self.persistence(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| self.persistence(path, e))?;
        Ok(())
    }

    fn persistence(&self, path: &Path, e: impl ToString) -> PipelineError {
        PipelineError::Persistence {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}
