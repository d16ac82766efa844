use faer::prelude::*;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::SparseColMat;
use faer::Mat;
use sprs::CsMat;

/// Solves `A x = b` for square `A`.
pub trait LinearSolver: Sync {
    fn solve(&self, a_mat: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>, String>;
}

/// Sparse LU decomposition with partial pivoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLU;

impl SparseLU {
    /// Factorizes `a_mat` once for repeated solves.
    pub fn factor(&self, a_mat: &CsMat<f64>) -> Result<Factorization, String> {
        let n = a_mat.rows();
        if a_mat.cols() != n {
            return Err(format!(
                "matrix must be square: {}x{}",
                a_mat.rows(),
                a_mat.cols()
            ));
        }
        if n == 0 {
            return Ok(Factorization { n, lu: None });
        }

        let triplets: Vec<(usize, usize, f64)> =
            a_mat.iter().map(|(&v, (i, j))| (i, j, v)).collect();
        let mat = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|e| format!("invalid sparse matrix: {:?}", e))?;

        let symbolic = SymbolicLu::try_new(mat.symbolic())
            .map_err(|e| format!("symbolic factorization failed: {:?}", e))?;
        let lu = Lu::try_new_with_symbolic(symbolic, mat.as_ref())
            .map_err(|e| format!("matrix is singular: {:?}", e))?;

        Ok(Factorization { n, lu: Some(lu) })
    }
}

impl LinearSolver for SparseLU {
    fn solve(&self, a_mat: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>, String> {
        self.factor(a_mat)?.solve(b)
    }
}

/// LU factors of a square matrix.
pub struct Factorization {
    n: usize,
    lu: Option<Lu<usize, f64>>,
}

impl Factorization {
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, String> {
        if b.len() != self.n {
            return Err(format!("dimension mismatch: {} != {}", b.len(), self.n));
        }
        let lu = match &self.lu {
            Some(lu) => lu,
            None => return Ok(Vec::new()),
        };
        let rhs = Mat::<f64>::from_fn(self.n, 1, |i, _| b[i]);
        let x = lu.solve(rhs.as_ref());

        let x: Vec<f64> = (0..self.n).map(|i| x.read(i, 0)).collect();
        if x.iter().any(|v| !v.is_finite()) {
            return Err("matrix is singular".to_string());
        }
        Ok(x)
    }
}
