use std::path::PathBuf;
use thiserror::Error;

/// Fatal environment problems detected before any data is processed.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("required file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("model artifact at {dir} is incomplete: {reason}")]
    IncompleteArtifact { dir: PathBuf, reason: String },

    #[error("failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Structural problems in the input data. Batch operations fail fast on these.
#[derive(Debug, Error)]
pub enum DataIntegrityError {
    #[error("required column missing from input: {column}")]
    MissingColumn { column: String },

    #[error("input table has no rows")]
    EmptyTable,

    #[error(
        "cannot derive target for {player} (season {season}, week {week}): \
         needs an over_performed flag or both fantasy_points and projection"
    )]
    UndefinedTarget {
        player: String,
        season: u16,
        week: u8,
    },

    #[error("stratified split undefined: every row has target {class}")]
    SingleClass { class: u8 },

    #[error("stratified split undefined: target class {class} has only {count} row(s)")]
    SparseClass { class: u8, count: usize },

    #[error("malformed row in {path}: {reason}")]
    MalformedRow { path: PathBuf, reason: String },
}

/// Engineered columns do not cover the feature list the model was trained on.
/// Raised at predict time, before any inference call.
#[derive(Debug, Error)]
#[error("engineered columns do not cover trained feature list, missing: {}", missing.join(", "))]
pub struct FeatureMismatchError {
    pub missing: Vec<String>,
}

/// Umbrella error for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    #[error(transparent)]
    FeatureMismatch(#[from] FeatureMismatchError),

    #[error("model {operation} failed: {reason}")]
    Model { operation: String, reason: String },

    #[error("failed to persist artifact to {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn model(operation: &str, reason: impl ToString) -> Self {
        Self::Model {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_target_formatting() {
        let err = DataIntegrityError::UndefinedTarget {
            player: "Saquon Barkley".to_string(),
            season: 2023,
            week: 7,
        };

        let msg = err.to_string();
        assert!(msg.contains("Saquon Barkley"));
        assert!(msg.contains("2023"));
        assert!(msg.contains("week 7"));
    }

    #[test]
    fn test_feature_mismatch_lists_missing_columns() {
        let err = FeatureMismatchError {
            missing: vec!["team_KC".to_string(), "player_age".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("team_KC"));
        assert!(msg.contains("player_age"));
    }

    #[test]
    fn test_single_class_formatting() {
        let msg = DataIntegrityError::SingleClass { class: 1 }.to_string();
        assert!(msg.contains("target 1"));
    }
}
