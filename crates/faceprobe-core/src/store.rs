//! Enrollment model store — reads persisted face encodings.
//!
//! The model file is a JSON array of enrollment records, each carrying a
//! label and at least one raw encoding vector (Howdy-compatible layout).
//! The first vector of each record is used. Partial or inconsistent
//! enrollment data fails the whole load: an authentication decision must
//! not be made against a half-trusted gallery.

use crate::types::{Encoding, EnrolledFace, ModelSet};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("model file {path} is malformed: {message}")]
    Malformed { path: String, message: String },
    #[error("enrollment record {index} ({label}) has no encoding vectors")]
    EmptyRecord { index: usize, label: String },
    #[error(
        "enrollment record {index} ({label}) has dimensionality {found}, expected {expected}"
    )]
    DimensionMismatch {
        index: usize,
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("model file {path} contains no enrollments")]
    NoEnrollments { path: String },
}

/// One on-disk enrollment record. Unknown fields (timestamps, ids) are
/// ignored; a missing label or data field fails the parse.
#[derive(Deserialize)]
struct EnrollmentRecord {
    label: String,
    data: Vec<Vec<f64>>,
}

/// Load the enrolled model set from `path`.
///
/// Returns exactly one [`EnrolledFace`] per record, in file order. Fails
/// when the file is missing, unparseable, empty, or when any record's
/// vector dimensionality disagrees with the first record's.
pub fn load_model_set(path: &Path) -> Result<ModelSet, ModelLoadError> {
    let raw = std::fs::read(path).map_err(|source| ModelLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let records: Vec<EnrollmentRecord> =
        serde_json::from_slice(&raw).map_err(|err| ModelLoadError::Malformed {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

    if records.is_empty() {
        return Err(ModelLoadError::NoEnrollments {
            path: path.display().to_string(),
        });
    }

    let mut faces = Vec::with_capacity(records.len());
    let mut expected_dim = None;

    for (index, record) in records.into_iter().enumerate() {
        let Some(vector) = record.data.into_iter().next() else {
            return Err(ModelLoadError::EmptyRecord {
                index,
                label: record.label,
            });
        };

        match expected_dim {
            None => expected_dim = Some(vector.len()),
            Some(expected) if vector.len() != expected => {
                return Err(ModelLoadError::DimensionMismatch {
                    index,
                    label: record.label,
                    expected,
                    found: vector.len(),
                });
            }
            Some(_) => {}
        }

        faces.push(EnrolledFace {
            label: record.label,
            encoding: Encoding::new(vector),
        });
    }

    let set = ModelSet::new(faces);
    tracing::info!(
        path = %path.display(),
        enrollments = set.len(),
        dim = set.dim(),
        "loaded model set"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_model(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_returns_records_in_input_order() {
        let file = write_model(
            r#"[
                {"label": "alice", "data": [[0.1, 0.2]], "time": 1},
                {"label": "alice-glasses", "data": [[0.3, 0.4], [9.0, 9.0]]},
                {"label": "bob", "data": [[0.5, 0.6]]}
            ]"#,
        );

        let set = load_model_set(file.path()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.dim(), 2);
        let labels: Vec<_> = set.faces().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["alice", "alice-glasses", "bob"]);
        // only the first vector of each record is used
        assert_eq!(set.faces()[1].encoding.values, vec![0.3, 0.4]);
    }

    #[test]
    fn load_fails_on_missing_file() {
        let err = load_model_set(Path::new("/nonexistent/models.dat")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Read { .. }));
    }

    #[test]
    fn load_fails_on_malformed_json() {
        let file = write_model("not json at all");
        let err = load_model_set(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Malformed { .. }));
    }

    #[test]
    fn load_fails_on_record_missing_label() {
        let file = write_model(r#"[{"data": [[0.1]]}]"#);
        let err = load_model_set(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Malformed { .. }));
    }

    #[test]
    fn load_fails_on_zero_entries() {
        let file = write_model("[]");
        let err = load_model_set(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::NoEnrollments { .. }));
    }

    #[test]
    fn load_fails_on_record_without_vectors() {
        let file = write_model(r#"[{"label": "alice", "data": []}]"#);
        let err = load_model_set(file.path()).unwrap_err();
        match err {
            ModelLoadError::EmptyRecord { index, label } => {
                assert_eq!(index, 0);
                assert_eq!(label, "alice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_fails_on_dimension_mismatch() {
        let file = write_model(
            r#"[
                {"label": "alice", "data": [[0.1, 0.2, 0.3]]},
                {"label": "bob", "data": [[0.4, 0.5]]}
            ]"#,
        );
        let err = load_model_set(file.path()).unwrap_err();
        match err {
            ModelLoadError::DimensionMismatch {
                index,
                expected,
                found,
                ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
