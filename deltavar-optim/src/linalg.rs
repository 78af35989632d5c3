//! Small dense linear algebra on `Vec<Vec<F>>` matrices (`a[row][col]`).
//!
//! Sizes here are `D × D` and `M × M` with `D`, `M` tiny, so plain loops win
//! over pulling in a BLAS.

use num_traits::Float;

/// Relative pivot tolerance for [`lu_factor`].
const PIVOT_TOL: f64 = 1e-12;

/// Result of LU factorization with partial pivoting.
///
/// Stores the combined L/U factors in a single matrix (L below diagonal,
/// U on and above diagonal) plus the row permutation.
pub struct LuFactors<F> {
    lu: Vec<Vec<F>>,
    /// `perm[i]` is the original row index for factored row `i`.
    perm: Vec<usize>,
    n: usize,
}

/// Factorize an `n x n` matrix via LU decomposition with partial pivoting.
///
/// Returns `None` if the matrix has a non-finite entry or is singular, i.e. a
/// pivot falls below `1e-12` times the largest absolute entry.
// Explicit indexing is clearer for pivoted LU: row/col indices drive pivot search and elimination
#[allow(clippy::needless_range_loop)]
pub fn lu_factor<F: Float>(a: &[Vec<F>]) -> Option<LuFactors<F>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    if a.iter().flatten().any(|v| !v.is_finite()) {
        return None;
    }

    let scale = a
        .iter()
        .flatten()
        .fold(F::zero(), |acc, &v| acc.max(v.abs()));
    let eps = F::from(PIVOT_TOL).unwrap_or_else(F::epsilon) * scale;

    let mut lu: Vec<Vec<F>> = a.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();

    for col in 0..n {
        let mut max_val = lu[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let v = lu[row][col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if max_val <= eps {
            return None;
        }

        if max_row != col {
            lu.swap(col, max_row);
            perm.swap(col, max_row);
        }

        let pivot = lu[col][col];

        for row in (col + 1)..n {
            let factor = lu[row][col] / pivot;
            lu[row][col] = factor;
            for j in (col + 1)..n {
                let val = lu[col][j];
                lu[row][j] = lu[row][j] - factor * val;
            }
        }
    }

    Some(LuFactors { lu, perm, n })
}

/// Solve `A * x = b` using a pre-computed LU factorization.
// Explicit indexing is clearer for forward/back substitution with permuted indices
#[allow(clippy::needless_range_loop)]
pub fn lu_back_solve<F: Float>(factors: &LuFactors<F>, b: &[F]) -> Vec<F> {
    let n = factors.n;
    debug_assert_eq!(b.len(), n);

    let mut y = vec![F::zero(); n];
    for i in 0..n {
        y[i] = b[factors.perm[i]];
    }

    // L has unit diagonal
    for i in 1..n {
        for j in 0..i {
            let l_ij = factors.lu[i][j];
            let y_j = y[j];
            y[i] = y[i] - l_ij * y_j;
        }
    }

    let mut x = vec![F::zero(); n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum = sum - factors.lu[i][j] * x[j];
        }
        x[i] = sum / factors.lu[i][i];
    }

    x
}

/// Explicit inverse, column by column from one factorization.
///
/// Returns `None` if the matrix is singular.
pub fn invert<F: Float>(a: &[Vec<F>]) -> Option<Vec<Vec<F>>> {
    let factors = lu_factor(a)?;
    let n = a.len();
    let mut inv = vec![vec![F::zero(); n]; n];
    let mut e = vec![F::zero(); n];
    for j in 0..n {
        e.iter_mut().for_each(|v| *v = F::zero());
        e[j] = F::one();
        let col = lu_back_solve(&factors, &e);
        for (row, &v) in inv.iter_mut().zip(col.iter()) {
            row[j] = v;
        }
    }
    Some(inv)
}

/// Lower Cholesky factor `L` with `A = L Lᵀ` of a symmetric matrix.
///
/// Positive semi-definite input is accepted: a diagonal that cancels to within
/// `tol` of zero produces a zero column. Returns `None` if a diagonal goes
/// below `-tol` or an entry is non-finite.
#[allow(clippy::needless_range_loop)]
pub fn cholesky<F: Float>(a: &[Vec<F>], tol: F) -> Option<Vec<Vec<F>>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let mut l = vec![vec![F::zero(); n]; n];
    for j in 0..n {
        let mut d = a[j][j];
        for k in 0..j {
            d = d - l[j][k] * l[j][k];
        }
        if !d.is_finite() || d < -tol {
            return None;
        }
        if d <= tol {
            continue;
        }
        let ljj = d.sqrt();
        l[j][j] = ljj;
        for i in (j + 1)..n {
            let mut s = a[i][j];
            for k in 0..j {
                s = s - l[i][k] * l[j][k];
            }
            l[i][j] = s / ljj;
        }
    }
    Some(l)
}

/// Transpose an m × n matrix.
pub fn transpose<F: Float>(mat: &[Vec<F>]) -> Vec<Vec<F>> {
    if mat.is_empty() {
        return vec![];
    }
    let rows = mat.len();
    let cols = mat[0].len();
    let mut result = vec![vec![F::zero(); rows]; cols];
    for (i, row) in mat.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            result[j][i] = v;
        }
    }
    result
}

/// Matrix product `A · B`.
pub fn matmul<F: Float>(a: &[Vec<F>], b: &[Vec<F>]) -> Vec<Vec<F>> {
    let inner = b.len();
    let cols = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|row| {
            assert_eq!(
                row.len(),
                inner,
                "matmul: left has {} columns, right has {} rows",
                row.len(),
                inner
            );
            (0..cols)
                .map(|j| {
                    row.iter()
                        .zip(b.iter())
                        .fold(F::zero(), |acc, (&a_ik, b_k)| acc + a_ik * b_k[j])
                })
                .collect()
        })
        .collect()
}
