//! Utilities for converting between our matrix formats and external libraries

use ndarray::Array2;
use sprs::CsMat;

use crate::error::EwiseResult;
use crate::matrix::sparse::Matrix;
use crate::matrix::types::Scalar;

/// Converts a matrix to sprs CsMat format
///
/// A matrix stored by column becomes a CSC matrix and one stored by row a
/// CSR matrix. Values are cast to `T`; every format is accepted.
pub fn to_sprs<T: Scalar>(matrix: &Matrix) -> EwiseResult<CsMat<T>> {
    let tuples = matrix.to_tuples::<T>()?;
    let mut indptr = vec![0; matrix.vdim() + 1];
    let mut indices = Vec::with_capacity(tuples.len());
    let mut data = Vec::with_capacity(tuples.len());
    for &(i, j, v) in &tuples {
        indptr[j + 1] += 1;
        indices.push(i);
        data.push(v);
    }
    for k in 0..matrix.vdim() {
        indptr[k + 1] += indptr[k];
    }

    Ok(if matrix.by_col() {
        CsMat::new_csc((matrix.vlen(), matrix.vdim()), indptr, indices, data)
    } else {
        CsMat::new((matrix.vdim(), matrix.vlen()), indptr, indices, data)
    })
}

/// Converts sprs CsMat to a sparse matrix with the same orientation
pub fn from_sprs<T: Scalar>(matrix: &CsMat<T>) -> EwiseResult<Matrix> {
    let (rows, cols) = matrix.shape();
    let (vlen, vdim) = if matrix.is_csc() {
        (rows, cols)
    } else {
        (cols, rows)
    };

    let mut p = Vec::with_capacity(vdim + 1);
    let mut i = Vec::with_capacity(matrix.nnz());
    let mut x = Vec::with_capacity(matrix.nnz());
    p.push(0);
    for vector in matrix.outer_iterator() {
        for (idx, &v) in vector.iter() {
            i.push(idx);
            x.push(v);
        }
        p.push(i.len());
    }

    Ok(Matrix::sparse(vlen, vdim, p, i, x)?.with_orientation(matrix.is_csc()))
}

/// Expands a matrix into a dense array, absent entries set to zero
pub fn to_dense<T: Scalar>(matrix: &Matrix) -> EwiseResult<Array2<T>> {
    let (nrows, ncols) = matrix.shape();
    let mut dense = Array2::from_elem((nrows, ncols), T::zero());
    for (i, j, v) in matrix.to_tuples::<T>()? {
        if matrix.by_col() {
            dense[[i, j]] = v;
        } else {
            dense[[j, i]] = v;
        }
    }
    Ok(dense)
}

/// Builds a full matrix stored by column from a dense array
pub fn from_dense<T: Scalar>(dense: &Array2<T>) -> EwiseResult<Matrix> {
    let (nrows, ncols) = dense.dim();
    let x: Vec<T> = dense.t().iter().copied().collect();
    Matrix::full(nrows, ncols, x)
}
