//! Sparse assembly of ragged per-column data.
//!
//! Per-sample peak data arrives as one variable-length list of row indices
//! (regions) and a parallel list of values per sample. These helpers turn that
//! ragged layout into `sprs` matrices in CSC storage, so that columns can be
//! sliced and stacked cheaply when assays score datasets in batches.
//!
//! Row indices may repeat within a column. Every `(index, value)` pair is kept
//! as a candidate entry in the triplet stage, and repeated cells are summed when
//! the triplets are compressed.
use sprs::{CsMat, TriMat};

use crate::errors::ShapeError;

fn validate_ragged(
    indices: &[Vec<usize>],
    values: &[Vec<f64>],
    col_length: usize,
) -> Result<(), ShapeError> {
    if indices.len() != values.len() {
        return Err(ShapeError::ColumnCountMismatch {
            indices: indices.len(),
            values: values.len(),
        });
    }

    for (column, (index_column, value_column)) in indices.iter().zip(values.iter()).enumerate() {
        if index_column.len() != value_column.len() {
            return Err(ShapeError::RaggedLengthMismatch {
                column,
                indices: index_column.len(),
                values: value_column.len(),
            });
        }
        if let Some(&index) = index_column.iter().find(|&&i| i >= col_length) {
            return Err(ShapeError::IndexOutOfBounds {
                column,
                index,
                col_length,
            });
        }
    }

    Ok(())
}

///
/// Build the triplet form of a `(col_length, N)` matrix from ragged columns.
///
/// Column `j` receives exactly the entries `(indices[j][k], values[j][k])`;
/// nothing is sorted, merged or dropped at this stage, so the number of
/// triplets is the total length of all value columns.
///
/// # Arguments
/// - indices: row indices, one sequence per column
/// - values: values parallel to `indices`
/// - col_length: number of rows of the output
pub fn assemble_triplets(
    indices: &[Vec<usize>],
    values: &[Vec<f64>],
    col_length: usize,
) -> Result<TriMat<f64>, ShapeError> {
    validate_ragged(indices, values, col_length)?;

    let nnz: usize = values.iter().map(|v| v.len()).sum();
    let mut triplets = TriMat::with_capacity((col_length, indices.len()), nnz);

    for (col, (index_column, value_column)) in indices.iter().zip(values.iter()).enumerate() {
        for (&row, &value) in index_column.iter().zip(value_column.iter()) {
            triplets.add_triplet(row, col, value);
        }
    }

    Ok(triplets)
}

///
/// Convert ragged columns into a CSC matrix of shape `(col_length, N)`.
///
/// Empty columns become all-zero columns. Repeated row indices within a
/// column are summed into one stored entry.
///
pub fn ragged_to_sparse(
    indices: &[Vec<usize>],
    values: &[Vec<f64>],
    col_length: usize,
) -> Result<CsMat<f64>, ShapeError> {
    Ok(assemble_triplets(indices, values, col_length)?.to_csc())
}

///
/// Concatenate matrices column-wise. All inputs need the same row count.
///
pub fn stack_columns(mats: &[CsMat<f64>]) -> Result<CsMat<f64>, ShapeError> {
    let Some(first) = mats.first() else {
        return Err(ShapeError::EmptyStack);
    };

    let rows = first.rows();
    if let Some(bad) = mats.iter().find(|m| m.rows() != rows) {
        return Err(ShapeError::RowCountMismatch {
            expected: rows,
            got: bad.rows(),
        });
    }

    let cscs: Vec<CsMat<f64>> = mats.iter().map(|m| m.to_csc()).collect();
    let views: Vec<_> = cscs.iter().map(|m| m.view()).collect();

    Ok(sprs::hstack(&views))
}

///
/// Select a subset of columns, in the order given, as a new CSC matrix.
///
pub fn select_columns(mat: &CsMat<f64>, cols: &[usize]) -> Result<CsMat<f64>, ShapeError> {
    let csc = mat.to_csc();
    let mut triplets = TriMat::new((csc.rows(), cols.len()));

    for (new_col, &col) in cols.iter().enumerate() {
        let column = csc
            .outer_view(col)
            .ok_or(ShapeError::ColumnOutOfBounds {
                column: col,
                cols: csc.cols(),
            })?;
        for (row, &value) in column.iter() {
            triplets.add_triplet(row, new_col, value);
        }
    }

    Ok(triplets.to_csc())
}

///
/// Select a subset of rows, in the order given, as a new CSR matrix.
///
pub fn select_rows(mat: &CsMat<f64>, rows: &[usize]) -> Result<CsMat<f64>, ShapeError> {
    let csr = mat.to_csr();
    let mut triplets = TriMat::new((rows.len(), csr.cols()));

    for (new_row, &row) in rows.iter().enumerate() {
        let values = csr.outer_view(row).ok_or(ShapeError::RowOutOfBounds {
            row,
            rows: csr.rows(),
        })?;
        for (col, &value) in values.iter() {
            triplets.add_triplet(new_row, col, value);
        }
    }

    Ok(triplets.to_csr())
}

///
/// Dense values of one CSC column at the requested rows.
///
/// # Arguments
/// - mat: matrix in CSC storage
/// - col: column to read
/// - rows: rows to extract, in output order
pub fn dense_column(mat: &CsMat<f64>, col: usize, rows: &[usize]) -> Result<Vec<f64>, ShapeError> {
    let column = mat.outer_view(col).ok_or(ShapeError::ColumnOutOfBounds {
        column: col,
        cols: mat.cols(),
    })?;

    let mut full = vec![0.0; mat.rows()];
    for (row, &value) in column.iter() {
        full[row] = value;
    }
    rows.iter()
        .map(|&r| {
            full.get(r).copied().ok_or(ShapeError::RowOutOfBounds {
                row: r,
                rows: mat.rows(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn ragged() -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
        (
            vec![vec![0, 3], vec![], vec![4, 1, 2]],
            vec![vec![1.0, 2.0], vec![], vec![0.5, 0.25, 3.0]],
        )
    }

    #[rstest]
    fn test_shape_and_candidate_count(ragged: (Vec<Vec<usize>>, Vec<Vec<f64>>)) {
        let (indices, values) = ragged;
        let triplets = assemble_triplets(&indices, &values, 5).unwrap();
        assert_eq!(triplets.shape(), (5, 3));
        assert_eq!(triplets.nnz(), 5);

        let mat = ragged_to_sparse(&indices, &values, 5).unwrap();
        assert_eq!(mat.shape(), (5, 3));
        assert!(mat.is_csc());
        assert_eq!(mat.get(3, 0), Some(&2.0));
        assert_eq!(mat.get(2, 2), Some(&3.0));
    }

    #[rstest]
    fn test_empty_column_is_zero(ragged: (Vec<Vec<usize>>, Vec<Vec<f64>>)) {
        let (indices, values) = ragged;
        let mat = ragged_to_sparse(&indices, &values, 5).unwrap();
        assert_eq!(dense_column(&mat, 1, &[0, 1, 2, 3, 4]).unwrap(), vec![0.0; 5]);
    }

    #[rstest]
    fn test_dense_column_out_of_bounds(ragged: (Vec<Vec<usize>>, Vec<Vec<f64>>)) {
        let (indices, values) = ragged;
        let mat = ragged_to_sparse(&indices, &values, 5).unwrap();

        assert_eq!(
            dense_column(&mat, 3, &[0]).unwrap_err(),
            ShapeError::ColumnOutOfBounds { column: 3, cols: 3 }
        );
        assert_eq!(
            dense_column(&mat, 0, &[0, 5]).unwrap_err(),
            ShapeError::RowOutOfBounds { row: 5, rows: 5 }
        );
    }

    #[rstest]
    fn test_duplicates_are_summed() {
        let indices = vec![vec![2, 2, 0]];
        let values = vec![vec![1.5, 2.0, 1.0]];

        let triplets = assemble_triplets(&indices, &values, 3).unwrap();
        assert_eq!(triplets.nnz(), 3);

        let mat = ragged_to_sparse(&indices, &values, 3).unwrap();
        assert_eq!(mat.get(2, 0), Some(&3.5));
        assert_eq!(mat.nnz(), 2);
    }

    #[rstest]
    #[case(vec![vec![0, 5]], vec![vec![1.0, 1.0]])]
    #[case(vec![vec![7]], vec![vec![1.0]])]
    fn test_out_of_range_index(#[case] indices: Vec<Vec<usize>>, #[case] values: Vec<Vec<f64>>) {
        let result = ragged_to_sparse(&indices, &values, 5);
        assert!(matches!(result, Err(ShapeError::IndexOutOfBounds { .. })));
    }

    #[rstest]
    fn test_length_mismatch() {
        let result = ragged_to_sparse(&[vec![0, 1]], &[vec![1.0]], 5);
        assert_eq!(
            result.unwrap_err(),
            ShapeError::RaggedLengthMismatch {
                column: 0,
                indices: 2,
                values: 1
            }
        );
    }

    #[rstest]
    fn test_stack_and_select(ragged: (Vec<Vec<usize>>, Vec<Vec<f64>>)) {
        let (indices, values) = ragged;
        let mat = ragged_to_sparse(&indices, &values, 5).unwrap();

        let stacked = stack_columns(&[mat.clone(), mat.clone()]).unwrap();
        assert_eq!(stacked.shape(), (5, 6));
        assert_eq!(stacked.get(4, 5), Some(&0.5));

        let selected = select_columns(&stacked, &[5, 0]).unwrap();
        assert_eq!(selected.shape(), (5, 2));
        assert_eq!(dense_column(&selected, 0, &[1, 2, 4]).unwrap(), vec![0.25, 3.0, 0.5]);
        assert_eq!(dense_column(&selected, 1, &[0, 3]).unwrap(), vec![1.0, 2.0]);
    }

    #[rstest]
    fn test_stack_rejects_row_mismatch() {
        let a = ragged_to_sparse(&[vec![0]], &[vec![1.0]], 2).unwrap();
        let b = ragged_to_sparse(&[vec![0]], &[vec![1.0]], 3).unwrap();
        assert!(matches!(
            stack_columns(&[a, b]),
            Err(ShapeError::RowCountMismatch { .. })
        ));
        assert_eq!(stack_columns(&[]).unwrap_err(), ShapeError::EmptyStack);
    }

    #[rstest]
    fn test_select_rows() {
        let mat = ragged_to_sparse(&[vec![0, 2], vec![1]], &[vec![1.0, 3.0], vec![2.0]], 3).unwrap();
        let rows = select_rows(&mat, &[2, 1]).unwrap();
        assert_eq!(rows.shape(), (2, 2));
        assert_eq!(rows.get(0, 0), Some(&3.0));
        assert_eq!(rows.get(1, 1), Some(&2.0));
        assert!(matches!(
            select_rows(&mat, &[3]),
            Err(ShapeError::RowOutOfBounds { row: 3, rows: 3 })
        ));
    }
}
