use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsReadError {
    /// The measurement set directory isn't there.
    #[error("Measurement set {0} does not exist")]
    NotFound(PathBuf),

    #[error("Couldn't open table {path}: {err}")]
    TableOpen { path: PathBuf, err: String },

    /// An error from casacore while reading a column.
    #[error("casacore error reading column {column} of table {table}: {err}")]
    Casacore {
        table: String,
        column: String,
        err: String,
    },

    /// Not every row of an array column had the same cell shape.
    #[error("Column {column} of table {table} has cells of shape {got:?} after cells of shape {expected:?}")]
    RaggedColumn {
        table: String,
        column: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Column {column} squeezed to {got} dimensions, but this is only valid for {expected}")]
    BadRank {
        column: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
