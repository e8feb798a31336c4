//! Persistence layer for saving and loading distance matrices.
//!
//! Matrices are stored as plain text, one comma-separated row per line.
//! See [`format`] for the exact value formatting.
//!
//! # Example
//!
//! ```no_run
//! use forge_meanshift::persistence::Persistable;
//! use forge_meanshift::DenseMatrix;
//!
//! let m = DenseMatrix::new(3, 3);
//! m.save("distances.csv")?;
//!
//! let loaded = DenseMatrix::load("distances.csv")?;
//! # Ok::<(), forge_meanshift::MeanShiftError>(())
//! ```

pub mod format;

use crate::error::{MeanShiftError, Result};
use crate::matrix::{DenseMatrix, DistanceMatrix};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Trait for types that can be persisted to disk.
pub trait Persistable: Sized {
    /// Save to a file, replacing any existing content.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn save(&self, path: impl AsRef<Path>) -> Result<()>;

    /// Load from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is malformed.
    fn load(path: impl AsRef<Path>) -> Result<Self>;
}

impl Persistable for DenseMatrix {
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        for i in 0..self.rows() {
            if i > 0 {
                writer.write_all(b"\n")?;
            }
            writer.write_all(format::format_row(self.row(i)).as_bytes())?;
        }

        writer.flush()?;
        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut rows: Vec<Vec<f32>> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let row = format::parse_row(&line, idx + 1)?;
            if let Some(first) = rows.first() {
                if row.len() != first.len() {
                    return Err(MeanShiftError::invalid_format(
                        idx + 1,
                        format!("expected {} columns, found {}", first.len(), row.len()),
                    ));
                }
            }
            rows.push(row);
        }

        DenseMatrix::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");

        let m = DenseMatrix::from_rows(vec![
            vec![0.0, 1.5, 0.125],
            vec![1.5, 0.0, 2.0],
            vec![0.125, 2.0, 0.0],
        ])
        .unwrap();
        m.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0,1.5,0.125\n1.5,0,2\n0.125,2,0");

        let loaded = DenseMatrix::load(&path).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn test_load_rejects_ragged_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "0,1\n1,0,3\n").unwrap();

        let err = DenseMatrix::load(file.path()).unwrap_err();
        assert!(matches!(err, MeanShiftError::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DenseMatrix::load("/nonexistent/forge-meanshift/matrix.csv").unwrap_err();
        assert!(matches!(err, MeanShiftError::Io(_)));
    }
}
