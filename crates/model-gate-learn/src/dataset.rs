//! Tabular dataset loading
//!
//! Datasets are read from CSV with a header row. The `target` column holds
//! the binary label and the `id` column is an identifier; both are excluded
//! from the feature matrix. Every other column must be numeric.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{LearnError, LearnResult};

/// Column holding the binary label
pub const TARGET_COLUMN: &str = "target";

/// Identifier column excluded from features
pub const ID_COLUMN: &str = "id";

/// File read when the data path names a directory
pub const DEFAULT_DATA_FILE: &str = "insurance.csv";

const MISSING_MARKERS: &[&str] = &["", "na", "nan", "null", "none"];

/// Feature matrix with binary targets, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Build a dataset from parts
    pub fn new(
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> LearnResult<Self> {
        if rows.len() != targets.len() {
            return Err(LearnError::ShapeMismatch(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            return Err(LearnError::ShapeMismatch(format!(
                "row {} has {} values, expected {}",
                index + 1,
                row.len(),
                feature_names.len()
            )));
        }
        if let Some((index, value)) = targets
            .iter()
            .enumerate()
            .find(|(_, t)| **t != 0.0 && **t != 1.0)
        {
            return Err(LearnError::InvalidTarget {
                row: index + 1,
                value: value.to_string(),
            });
        }

        Ok(Self {
            feature_names,
            rows,
            targets,
        })
    }

    /// Load a CSV file, or `insurance.csv` inside a directory
    pub fn from_csv_path(path: impl AsRef<Path>) -> LearnResult<Self> {
        let file_path = resolve_data_file(path.as_ref());
        info!(path = %file_path.display(), "Loading dataset");

        let file = File::open(&file_path).map_err(|e| LearnError::io(&file_path, e))?;
        let dataset = Self::from_reader(file)?;

        info!(
            rows = dataset.n_rows(),
            features = dataset.n_features(),
            positive_rate = dataset.positive_rate(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse CSV content with a header row
    pub fn from_reader<R: Read>(reader: R) -> LearnResult<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let target_index = headers
            .iter()
            .position(|h| h == TARGET_COLUMN)
            .ok_or_else(|| LearnError::MissingColumn(TARGET_COLUMN.to_string()))?;
        let id_index = headers.iter().position(|h| h == ID_COLUMN);
        if id_index.is_none() {
            warn!(column = ID_COLUMN, "Identifier column not present; nothing to drop");
        }

        let feature_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_index && Some(*i) != id_index)
            .map(|(i, h)| (i, h.clone()))
            .collect();
        if feature_columns.is_empty() {
            return Err(LearnError::EmptyDataset("no feature columns".to_string()));
        }

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for (index, record) in csv.records().enumerate() {
            let record = record?;
            let row_number = index + 1;

            let target = record.get(target_index).unwrap_or_default();
            targets.push(parse_target(row_number, target)?);

            let mut row = Vec::with_capacity(feature_columns.len());
            for (column_index, name) in &feature_columns {
                let cell = record.get(*column_index).unwrap_or_default();
                row.push(parse_feature(name, row_number, cell)?);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(LearnError::EmptyDataset("no data rows".to_string()));
        }
        debug!(
            columns = ?feature_columns.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>(),
            "Parsed feature columns"
        );

        Ok(Self {
            feature_names: feature_columns.into_iter().map(|(_, n)| n).collect(),
            rows,
            targets,
        })
    }

    /// Feature column names in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Feature values of one row
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Labels, each 0.0 or 1.0
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Fraction of positive labels
    pub fn positive_rate(&self) -> f64 {
        if self.targets.is_empty() {
            return 0.0;
        }
        self.targets.iter().sum::<f64>() / self.targets.len() as f64
    }

    /// New dataset holding the given rows in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

/// Path of the CSV file to read for a data path
pub fn resolve_data_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_DATA_FILE)
    } else {
        path.to_path_buf()
    }
}

fn parse_feature(column: &str, row: usize, value: &str) -> LearnResult<f64> {
    let lowered = value.to_ascii_lowercase();
    if MISSING_MARKERS.contains(&lowered.as_str()) {
        return Ok(f64::NAN);
    }
    match lowered.as_str() {
        "true" => return Ok(1.0),
        "false" => return Ok(0.0),
        _ => {}
    }
    value.parse::<f64>().map_err(|_| LearnError::NonNumeric {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

fn parse_target(row: usize, value: &str) -> LearnResult<f64> {
    let invalid = || LearnError::InvalidTarget {
        row,
        value: value.to_string(),
    };
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(1.0),
        "false" => Ok(0.0),
        other => match other.parse::<f64>() {
            Ok(v) if v == 0.0 || v == 1.0 => Ok(v),
            _ => Err(invalid()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "id,age,smoker,bmi,target\n\
                       1,34,true,22.5,0\n\
                       2,51,false,,1\n\
                       3,29,false,NA,0\n";

    #[test]
    fn test_parses_features_and_drops_id_and_target() {
        let dataset = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(dataset.feature_names(), &["age", "smoker", "bmi"]);
        assert_eq!(dataset.n_rows(), 3);
        assert_eq!(dataset.targets(), &[0.0, 1.0, 0.0]);
        assert_eq!(dataset.row(0), &[34.0, 1.0, 22.5]);
        assert!(dataset.row(1)[2].is_nan());
        assert!(dataset.row(2)[2].is_nan());
    }

    #[test]
    fn test_missing_id_column_is_allowed() {
        let dataset = Dataset::from_reader("x,target\n1.5,1\n2.5,0\n".as_bytes()).unwrap();
        assert_eq!(dataset.feature_names(), &["x"]);
    }

    #[test]
    fn test_missing_target_column() {
        let err = Dataset::from_reader("id,x\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LearnError::MissingColumn(c) if c == "target"));
    }

    #[test]
    fn test_non_numeric_feature() {
        let err = Dataset::from_reader("x,target\nabc,1\n".as_bytes()).unwrap_err();
        match err {
            LearnError::NonNumeric { column, row, value } => {
                assert_eq!(column, "x");
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_binary_target() {
        let err = Dataset::from_reader("x,target\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LearnError::InvalidTarget { row: 1, .. }));
    }

    #[test]
    fn test_boolean_targets() {
        let dataset = Dataset::from_reader("x,target\n1,True\n2,false\n".as_bytes()).unwrap();
        assert_eq!(dataset.targets(), &[1.0, 0.0]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = Dataset::from_reader("x,target\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LearnError::EmptyDataset(_)));
    }

    #[test]
    fn test_directory_path_reads_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(DEFAULT_DATA_FILE)).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let dataset = Dataset::from_csv_path(dir.path()).unwrap();
        assert_eq!(dataset.n_rows(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::from_csv_path(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LearnError::Io { .. }));
    }

    #[test]
    fn test_subset_preserves_order() {
        let dataset = Dataset::from_reader(CSV.as_bytes()).unwrap();
        let subset = dataset.subset(&[2, 0]);
        assert_eq!(subset.targets(), &[0.0, 0.0]);
        assert_eq!(subset.row(1)[0], 34.0);
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let err = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![1.0]],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, LearnError::ShapeMismatch(_)));
    }
}
