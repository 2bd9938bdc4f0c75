//! Dense row-major matrix for the similarity computation

use paperrank_common::config::ZeroVectorPolicy;
use paperrank_common::errors::{AppError, Result, VectorSide};
use tracing::warn;

/// Row-major `f32` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Build from embedding rows, checking every row has `expected_dim` values
    pub fn from_rows(rows: Vec<Vec<f32>>, expected_dim: usize) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * expected_dim);

        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != expected_dim {
                return Err(AppError::DimensionMismatch {
                    row,
                    expected: expected_dim,
                    actual: values.len(),
                });
            }
            data.extend(values);
        }

        Ok(Self {
            rows: n,
            cols: expected_dim,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    fn row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Scale every row to unit L2 norm.
    ///
    /// The norm is accumulated in f64, so tiny or huge f32 components
    /// neither underflow nor overflow. A row whose norm is zero or not
    /// finite (NaN or infinite components) is degenerate. Under
    /// `Reject` the first one fails the call; under `ZeroSimilarity` it is
    /// set to all zeros. Returns the indices of degenerate rows.
    pub fn normalize_rows(&mut self, side: VectorSide, policy: ZeroVectorPolicy) -> Result<Vec<usize>> {
        let mut degenerate = Vec::new();

        for index in 0..self.rows {
            let row = self.row_mut(index);
            let norm = row.iter().map(|&v| f64::from(v) * f64::from(v)).sum::<f64>().sqrt();

            if norm > 0.0 && norm.is_finite() {
                row.iter_mut().for_each(|v| *v = (f64::from(*v) / norm) as f32);
                continue;
            }

            match policy {
                ZeroVectorPolicy::Reject => {
                    return Err(AppError::DegenerateVector { side, index });
                }
                ZeroVectorPolicy::ZeroSimilarity => {
                    row.fill(0.0);
                    warn!(side = %side, index, "Zero-norm embedding, scoring it as similarity 0");
                    degenerate.push(index);
                }
            }
        }

        Ok(degenerate)
    }

    /// `self · otherᵀ`: entry `[i][j]` is the dot product of row `i` of
    /// `self` and row `j` of `other`
    pub fn matmul_transpose(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.cols {
            return Err(AppError::DimensionMismatch {
                row: 0,
                expected: self.cols,
                actual: other.cols,
            });
        }

        let mut data = Vec::with_capacity(self.rows * other.rows);
        for i in 0..self.rows {
            let a = self.row(i);
            for j in 0..other.rows {
                let b = other.row(j);
                data.push(dot(a, b) as f32);
            }
        }

        Ok(Matrix {
            rows: self.rows,
            cols: other.rows,
            data,
        })
    }

    /// `scale * Σ_j self[i][j] * weights[j]` for every row `i`
    pub fn weighted_row_sums(&self, weights: &[f32], scale: f32) -> Result<Vec<f32>> {
        if weights.len() != self.cols {
            return Err(AppError::LengthMismatch {
                what: "recency weights",
                expected: self.cols,
                actual: weights.len(),
            });
        }

        Ok((0..self.rows)
            .map(|i| (dot(self.row(i), weights) * f64::from(scale)) as f32)
            .collect())
    }
}

/// Dot product accumulated in f64
fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_from_rows_checks_dimension() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![1.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            AppError::DimensionMismatch { row: 1, expected: 2, actual: 1 }
        ));

        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 2));
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_normalize_rows() {
        let mut m = Matrix::from_rows(vec![vec![3.0, 4.0], vec![0.0, -2.0]], 2).unwrap();
        let degenerate = m.normalize_rows(VectorSide::Corpus, ZeroVectorPolicy::Reject).unwrap();

        assert!(degenerate.is_empty());
        assert!(approx(m.row(0)[0], 0.6) && approx(m.row(0)[1], 0.8));
        assert!(approx(m.row(1)[1], -1.0));
    }

    #[test]
    fn test_normalize_tiny_and_huge_components() {
        let mut m = Matrix::from_rows(vec![vec![1e-30, 2e-30], vec![1e20, 2e20]], 2).unwrap();
        let degenerate = m.normalize_rows(VectorSide::Corpus, ZeroVectorPolicy::Reject).unwrap();

        assert!(degenerate.is_empty());
        for index in 0..2 {
            let row = m.row(index);
            assert!((row[0] - 0.447_213_6).abs() < 1e-6, "row {index}: {row:?}");
            assert!((row[1] - 0.894_427_2).abs() < 1e-6, "row {index}: {row:?}");
        }
    }

    #[test]
    fn test_infinite_component_is_degenerate() {
        let mut m = Matrix::from_rows(vec![vec![f32::INFINITY, 1.0]], 2).unwrap();
        let err = m.normalize_rows(VectorSide::Corpus, ZeroVectorPolicy::Reject).unwrap_err();
        assert!(matches!(err, AppError::DegenerateVector { index: 0, .. }));
    }

    #[test]
    fn test_zero_row_rejected() {
        let mut m = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 0.0]], 2).unwrap();
        let err = m
            .normalize_rows(VectorSide::Candidate, ZeroVectorPolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::DegenerateVector { side: VectorSide::Candidate, index: 1 }
        ));
    }

    #[test]
    fn test_zero_row_zero_similarity() {
        let mut m = Matrix::from_rows(vec![vec![0.0, 0.0], vec![f32::NAN, 1.0]], 2).unwrap();
        let degenerate = m
            .normalize_rows(VectorSide::Corpus, ZeroVectorPolicy::ZeroSimilarity)
            .unwrap();

        assert_eq!(degenerate, vec![0, 1]);
        assert!(m.row(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_matmul_transpose() {
        let a = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]], 2).unwrap();
        let b = Matrix::from_rows(vec![vec![2.0, 3.0], vec![-1.0, 4.0]], 2).unwrap();
        let product = a.matmul_transpose(&b).unwrap();

        assert_eq!((product.rows(), product.cols()), (3, 2));
        assert_eq!(product.row(0), &[2.0, -1.0]);
        assert_eq!(product.row(1), &[3.0, 4.0]);
        assert_eq!(product.row(2), &[5.0, 3.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let a = Matrix::from_rows(vec![vec![1.0, 0.0]], 2).unwrap();
        let b = Matrix::from_rows(vec![vec![1.0, 0.0, 0.0]], 3).unwrap();
        assert!(a.matmul_transpose(&b).is_err());
    }

    #[test]
    fn test_weighted_row_sums() {
        let sim = Matrix::from_rows(vec![vec![1.0, 0.5], vec![0.0, -1.0]], 2).unwrap();
        let scores = sim.weighted_row_sums(&[0.75, 0.25], 10.0).unwrap();

        assert!(approx(scores[0], 8.75));
        assert!(approx(scores[1], -2.5));
        assert!(sim.weighted_row_sums(&[1.0], 10.0).is_err());
    }
}
