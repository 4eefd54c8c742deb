//! Delimited-text loading for the performance and metadata tables.
//!
//! A missing file is a fatal setup error; a header missing a required column
//! is a data-integrity error raised before any row is parsed.

use std::path::Path;

use tracing::info;

use crate::domain::errors::{DataIntegrityError, PipelineError, SetupError};
use crate::domain::player::{MetadataRecord, PerformanceRecord};

const REQUIRED_PERFORMANCE_COLUMNS: &[&str] =
    &["player_name", "season", "week", "team", "fantasy_points"];

const REQUIRED_METADATA_COLUMNS: &[&str] =
    &["player_name", "season", "age", "games_played", "games_started"];

/// Loads the weekly performance table. Empty tables are rejected: there is
/// nothing to engineer or train on.
pub fn load_performance(path: &Path) -> Result<Vec<PerformanceRecord>, PipelineError> {
    let mut reader = open(path)?;
    check_headers(&mut reader, path, REQUIRED_PERFORMANCE_COLUMNS)?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: PerformanceRecord = result.map_err(|e| DataIntegrityError::MalformedRow {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        rows.push(record);
    }
    if rows.is_empty() {
        return Err(DataIntegrityError::EmptyTable.into());
    }
    info!(rows = rows.len(), path = %path.display(), "loaded performance table");
    Ok(rows)
}

/// Loads the per-season metadata table. An empty table is allowed; it just
/// means no joins will match.
pub fn load_metadata(path: &Path) -> Result<Vec<MetadataRecord>, PipelineError> {
    let mut reader = open(path)?;
    check_headers(&mut reader, path, REQUIRED_METADATA_COLUMNS)?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: MetadataRecord = result.map_err(|e| DataIntegrityError::MalformedRow {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        rows.push(record);
    }
    info!(rows = rows.len(), path = %path.display(), "loaded metadata table");
    Ok(rows)
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, SetupError> {
    if !path.exists() {
        return Err(SetupError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    csv::Reader::from_path(path).map_err(|e| SetupError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn check_headers(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
    required: &[&str],
) -> Result<(), PipelineError> {
    let headers = reader.headers().map_err(|e| SetupError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(DataIntegrityError::MissingColumn {
                column: column.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct TempCsv {
        path: PathBuf,
    }

    impl TempCsv {
        fn write(name: &str, content: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "boombust-csv-{}-{}.csv",
                std::process::id(),
                name
            ));
            fs::write(&path, content).unwrap();
            Self { path }
        }
    }

    impl Drop for TempCsv {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn test_load_performance_with_optional_columns_absent() {
        let csv = TempCsv::write(
            "minimal",
            "player_name,season,week,team,fantasy_points,projection\n\
             Christian McCaffrey,2023,1,SF,22.5,18.0\n\
             Derrick Henry,2023,1,TEN,11.0,\n",
        );
        let rows = load_performance(&csv.path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].projection, Some(18.0));
        assert_eq!(rows[1].projection, None);
        assert_eq!(rows[0].rushing_yards, 0.0);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = TempCsv::write(
            "no-points",
            "player_name,season,week,team\nChristian McCaffrey,2023,1,SF\n",
        );
        let err = load_performance(&csv.path).unwrap_err();
        match err {
            PipelineError::DataIntegrity(DataIntegrityError::MissingColumn { column }) => {
                assert_eq!(column, "fantasy_points");
            }
            other => panic!("expected MissingColumn, got {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_a_setup_error() {
        let err = load_performance(Path::new("/nonexistent/weekly.csv")).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Setup(SetupError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_empty_performance_table_is_rejected() {
        let csv = TempCsv::write("empty", "player_name,season,week,team,fantasy_points\n");
        let err = load_performance(&csv.path).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DataIntegrity(DataIntegrityError::EmptyTable)
        ));
    }

    #[test]
    fn test_load_metadata() {
        let csv = TempCsv::write(
            "meta",
            "player_name,season,age,games_played,games_started\n\
             Christian McCaffrey,2023,27,96,90\n",
        );
        let rows = load_metadata(&csv.path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].age, 27.0);
    }
}
