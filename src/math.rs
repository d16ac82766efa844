use num_complex::Complex64;
use num_traits::Zero;
use sprs::{prod, CsMat, MulAcc, TriMat};

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Computes the infinity norm: `max(abs(a))`. Zero for an empty slice.
pub(crate) fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |max, v| {
        let abs = v.abs();
        if abs > max || abs.is_nan() {
            abs
        } else {
            max
        }
    })
}

/// Sparse matrix-vector product.
pub(crate) fn mul_vec<T>(a: &CsMat<T>, x: &[T]) -> Vec<T>
where
    T: MulAcc + Zero + Clone,
{
    let mut y = vec![T::zero(); a.rows()];
    let a = a.view();
    if a.is_csr() {
        prod::mul_acc_mat_vec_csr(a, x, &mut y[..]);
    } else {
        prod::mul_acc_mat_vec_csc(a, x, &mut y[..]);
    }
    y
}

/// Transposed sparse matrix-vector product.
pub(crate) fn mul_vec_t<T>(a: &CsMat<T>, x: &[T]) -> Vec<T>
where
    T: MulAcc + Zero + Clone,
{
    let mut y = vec![T::zero(); a.cols()];
    let at = a.transpose_view();
    if at.is_csr() {
        prod::mul_acc_mat_vec_csr(at, x, &mut y[..]);
    } else {
        prod::mul_acc_mat_vec_csc(at, x, &mut y[..]);
    }
    y
}

/// Extracts the submatrix `a[rows, cols]`.
pub(crate) fn select(a: &CsMat<f64>, rows: &[usize], cols: &[usize]) -> CsMat<f64> {
    let row_pos = positions(a.rows(), rows);
    let col_pos = positions(a.cols(), cols);

    let mut sub = TriMat::new((rows.len(), cols.len()));
    for (&v, (i, j)) in a.iter() {
        if let (Some(r), Some(c)) = (row_pos[i], col_pos[j]) {
            sub.add_triplet(r, c, v);
        }
    }
    sub.to_csr()
}

/// Maps each index in `idx` to its position in the slice.
pub(crate) fn positions(n: usize, idx: &[usize]) -> Vec<Option<usize>> {
    let mut pos = vec![None; n];
    for (k, &i) in idx.iter().enumerate() {
        pos[i] = Some(k);
    }
    pos
}
