//! Column access for measurement sets.
//!
//! Everything that touches casacore goes through [`read_column`]. Arrays come
//! back in the axis order that CASA's `tb.getcol` uses: the cell axes in
//! casacore order, then the row axis last. e.g. `UVW` is `(3, num_rows)` and
//! `DATA` is `(num_pols, num_chans, num_rows)`.

use std::{fmt::Display, path::Path};

use log::{debug, trace};
use ndarray::prelude::*;
use rubbl_casatables::{CasaDataType, CasaScalarData, Table, TableOpenMode};

use super::MsReadError;

/// The name to use for the main table of a measurement set.
pub const MAIN_TABLE: &str = "";

/// What a single row of a column holds. casacore doesn't tell us this cheaply
/// and we always know which columns we want, so callers declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// One value per row, e.g. `ANTENNA1`.
    Scalar,

    /// A 1D cell per row, e.g. `UVW` or `CHAN_FREQ`.
    Vector,

    /// A 2D cell per row, e.g. `DATA`.
    Matrix,
}

/// Open a measurement set table read only. If `table` is empty, then open the
/// main table.
///
/// The returned [`Table`] is closed when it is dropped.
pub(crate) fn read_table(ms: &Path, table: &str) -> Result<Table, MsReadError> {
    if !ms.is_dir() {
        return Err(MsReadError::NotFound(ms.to_path_buf()));
    }
    let path = if table.is_empty() {
        ms.to_path_buf()
    } else {
        ms.join(table)
    };
    trace!("Opening table {}", path.display());
    Table::open(&path, TableOpenMode::Read).map_err(|e| MsReadError::TableOpen {
        path,
        err: e.to_string(),
    })
}

fn table_name(table: &str) -> &str {
    if table.is_empty() {
        "MAIN"
    } else {
        table
    }
}

fn casacore_error<'a, E: Display>(
    table: &'a str,
    column: &'a str,
) -> impl Fn(E) -> MsReadError + 'a {
    move |e| MsReadError::Casacore {
        table: table_name(table).to_string(),
        column: column.to_string(),
        err: e.to_string(),
    }
}

/// Read a whole column out of a measurement set table, with all length-1 axes
/// removed (like numpy's `squeeze`).
///
/// # Arguments
///
/// * `ms` - the path to the measurement set.
/// * `table` - the sub-table to read from, e.g. "SPECTRAL_WINDOW". Use
///   [`MAIN_TABLE`] for the main table.
/// * `column` - the column name.
/// * `kind` - the shape of a single cell of the column.
pub fn read_column<T>(
    ms: &Path,
    table: &str,
    column: &str,
    kind: ColumnKind,
) -> Result<ArrayD<T>, MsReadError>
where
    T: CasaScalarData + Copy,
    Array2<T>: CasaDataType,
{
    debug!(
        "Reading {column} from {} of {}",
        table_name(table),
        ms.display()
    );
    let by_row = {
        let mut t = read_table(ms, table)?;
        let num_rows = t.n_rows();
        trace!("{} has {num_rows} rows", table_name(table));

        match kind {
            ColumnKind::Scalar => {
                let values: Vec<T> = t
                    .get_col_as_vec(column)
                    .map_err(casacore_error(table, column))?;
                Array1::from(values).into_dyn()
            }

            ColumnKind::Vector => {
                let mut values = vec![];
                let mut cell_len: Option<usize> = None;
                for i_row in 0..num_rows {
                    let cell: Vec<T> = t
                        .get_cell_as_vec(column, i_row)
                        .map_err(casacore_error(table, column))?;
                    check_cell_shape(&mut cell_len, cell.len(), table, column)?;
                    values.extend(cell);
                }
                Array2::from_shape_vec((num_rows as usize, cell_len.unwrap_or(0)), values)?
                    .into_dyn()
            }

            ColumnKind::Matrix => {
                // Array cells have to come through the row API; the
                // table-level `get_cell` only knows about scalar cells.
                let mut cells: Vec<Array2<T>> = Vec::with_capacity(num_rows as usize);
                t.for_each_row(|row| {
                    let cell: Array2<T> = row.get_cell(column)?;
                    cells.push(cell);
                    Ok(())
                })
                .map_err(casacore_error(table, column))?;

                let mut values = vec![];
                let mut cell_dim: Option<(usize, usize)> = None;
                for cell in &cells {
                    check_cell_shape(&mut cell_dim, cell.dim(), table, column)?;
                    values.extend(cell.iter().copied());
                }
                let (d0, d1) = cell_dim.unwrap_or((0, 0));
                Array3::from_shape_vec((num_rows as usize, d0, d1), values)?.into_dyn()
            }
        }
        // `t` is dropped (and the table closed) here, even on an early
        // return above.
    };

    // rubbl gives cells with their axes reversed relative to casacore, and
    // the row axis goes last, so reversing everything gets the CASA order.
    let casa_ordered = by_row.reversed_axes();
    let squeezed = squeeze(casa_ordered);
    trace!("{column} has shape {:?}", squeezed.shape());
    Ok(squeezed)
}

fn check_cell_shape<S: Copy + PartialEq + CellShape>(
    expected: &mut Option<S>,
    got: S,
    table: &str,
    column: &str,
) -> Result<(), MsReadError> {
    match expected {
        None => {
            *expected = Some(got);
            Ok(())
        }
        Some(e) if *e == got => Ok(()),
        Some(e) => Err(MsReadError::RaggedColumn {
            table: table_name(table).to_string(),
            column: column.to_string(),
            expected: CellShape::dims(*e),
            got: got.dims(),
        }),
    }
}

trait CellShape {
    fn dims(self) -> Vec<usize>;
}

impl CellShape for usize {
    fn dims(self) -> Vec<usize> {
        vec![self]
    }
}

impl CellShape for (usize, usize) {
    fn dims(self) -> Vec<usize> {
        vec![self.0, self.1]
    }
}

/// Remove all length-1 axes from an array. An array with a single element
/// becomes 0-dimensional.
pub fn squeeze<T>(mut array: ArrayD<T>) -> ArrayD<T> {
    for i_axis in (0..array.ndim()).rev() {
        if array.len_of(Axis(i_axis)) == 1 {
            array = array.index_axis_move(Axis(i_axis), 0);
        }
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeeze_removes_only_unit_axes() {
        let a = ArrayD::<f64>::zeros(IxDyn(&[1, 4, 1, 3]));
        assert_eq!(squeeze(a).shape(), &[4, 3]);

        let a = ArrayD::<f64>::zeros(IxDyn(&[2, 5]));
        assert_eq!(squeeze(a).shape(), &[2, 5]);
    }

    #[test]
    fn squeeze_single_element_is_0d() {
        let a = ArrayD::from_shape_vec(IxDyn(&[1, 1]), vec![7]).unwrap();
        let s = squeeze(a);
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.first(), Some(&7));
    }

    #[test]
    fn squeeze_keeps_values_in_order() {
        let a = ArrayD::from_shape_vec(IxDyn(&[3, 1]), vec![1, 2, 3]).unwrap();
        assert_eq!(squeeze(a).iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_ms_is_not_found() {
        let result = read_table(Path::new("/does/not/exist.ms"), MAIN_TABLE);
        assert!(matches!(result, Err(MsReadError::NotFound(_))));
    }
}
