//! Non-negative least squares.
//!
//! Finds `x >= 0` minimizing `||Ax - b||_2` with the active-set method of
//! Lawson & Hanson (Solving Least Squares Problems, 1974, ch. 23). The
//! unconstrained sub-problems on the passive set are solved through the
//! normal equations with partially pivoted Gaussian elimination, which is
//! adequate for the small, well-conditioned organism sets FOCUS works with.

use ndarray::{Array1, Array2, Axis};

use crate::error::{FocusError, Result};

/// Anything that can solve `min ||Ax - b||, x >= 0`.
pub trait LeastSquaresSolver {
    fn solve(&self, a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>>;
}

/// Lawson-Hanson active-set solver.
#[derive(Debug, Clone, Copy)]
pub struct LawsonHanson {
    /// Outer+inner iteration cap; `None` means `3 * columns`.
    pub max_iterations: Option<usize>,
    /// Dual-feasibility tolerance on the gradient.
    pub tolerance: f64,
}

impl Default for LawsonHanson {
    fn default() -> Self {
        Self {
            max_iterations: None,
            tolerance: 1e-12,
        }
    }
}

impl LeastSquaresSolver for LawsonHanson {
    fn solve(&self, a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let (m, n) = a.dim();
        if m != b.len() {
            return Err(FocusError::invalid_input(
                "nnls",
                format!("design matrix has {m} rows but target has {} entries", b.len()),
            ));
        }
        let max_iter = self.max_iterations.unwrap_or(3 * n.max(1));

        let mut x = Array1::<f64>::zeros(n);
        let mut passive = vec![false; n];
        let mut iterations = 0usize;

        loop {
            // Gradient of the residual norm: w = A^T (b - Ax)
            let residual = b - &a.dot(&x);
            let w = a.t().dot(&residual);

            let candidate = (0..n)
                .filter(|&j| !passive[j] && w[j] > self.tolerance)
                .max_by(|&i, &j| w[i].total_cmp(&w[j]).then(j.cmp(&i)));
            let j = match candidate {
                Some(j) => j,
                None => break,
            };
            passive[j] = true;

            loop {
                iterations += 1;
                if iterations > max_iter {
                    return Err(FocusError::SolverFailure(format!(
                        "NNLS did not converge within {max_iter} iterations"
                    )));
                }

                let s = solve_passive(a, b, &passive)?;

                let infeasible: Vec<usize> =
                    (0..n).filter(|&i| passive[i] && s[i] <= 0.0).collect();
                if infeasible.is_empty() {
                    x = s;
                    break;
                }

                // Step from x towards s until the first passive variable hits zero.
                let alpha = infeasible
                    .iter()
                    .filter(|&&i| x[i] - s[i] > 0.0)
                    .map(|&i| x[i] / (x[i] - s[i]))
                    .fold(f64::INFINITY, f64::min);
                let alpha = if alpha.is_finite() { alpha } else { 0.0 };
                x = &x + &((&s - &x) * alpha);

                for i in 0..n {
                    if passive[i] && x[i] <= self.tolerance {
                        passive[i] = false;
                        x[i] = 0.0;
                    }
                }
            }
        }

        Ok(x)
    }
}

/// Unconstrained least squares restricted to the passive columns; zeros elsewhere.
fn solve_passive(a: &Array2<f64>, b: &Array1<f64>, passive: &[bool]) -> Result<Array1<f64>> {
    let cols: Vec<usize> = (0..passive.len()).filter(|&i| passive[i]).collect();
    let mut full = Array1::<f64>::zeros(passive.len());
    if cols.is_empty() {
        return Ok(full);
    }

    let ap = a.select(Axis(1), &cols);
    let ata = ap.t().dot(&ap);
    let atb = ap.t().dot(b);
    let z = gaussian_solve(ata, atb)?;

    for (k, &col) in cols.iter().enumerate() {
        full[col] = z[k];
    }
    Ok(full)
}

/// Solve the square system `m z = rhs` in place with partial pivoting.
fn gaussian_solve(mut m: Array2<f64>, mut rhs: Array1<f64>) -> Result<Array1<f64>> {
    let n = rhs.len();
    let scale = m.iter().fold(0.0f64, |acc, v| acc.max(v.abs())).max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);
        if m[[pivot, col]].abs() <= scale * 1e-14 {
            return Err(FocusError::SolverFailure(
                "singular sub-problem: reference profiles are linearly dependent".to_string(),
            ));
        }
        if pivot != col {
            for k in 0..n {
                m.swap([col, k], [pivot, k]);
            }
            rhs.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[[row, k]] * z[k]).sum();
        z[row] = (rhs[row] - tail) / m[[row, row]];
    }
    Ok(z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_exact_non_negative_solution() {
        let a = array![[0.5, 0.0], [0.5, 0.0], [0.0, 0.5], [0.0, 0.5]];
        let b = array![0.25, 0.25, 0.25, 0.25];
        let x = LawsonHanson::default().solve(&a, &b).unwrap();
        assert!(close(x[0], 0.5) && close(x[1], 0.5));
    }

    #[test]
    fn test_negative_unconstrained_solution_is_clamped() {
        // Unconstrained optimum is x = [2, -1]; the constrained one drops column 2.
        let a = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let b = array![2.0, -1.0, 1.0];
        let x = LawsonHanson::default().solve(&a, &b).unwrap();
        assert!(x.iter().all(|&v| v >= 0.0));
        assert!(close(x[1], 0.0));
        assert!(close(x[0], 1.5));
    }

    #[test]
    fn test_all_negative_target_gives_zero() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![-1.0, -2.0];
        let x = LawsonHanson::default().solve(&a, &b).unwrap();
        assert_eq!(x, array![0.0, 0.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 2.0, 3.0];
        assert!(matches!(
            LawsonHanson::default().solve(&a, &b),
            Err(FocusError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_iteration_cap_is_solver_failure() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 1.0];
        let solver = LawsonHanson {
            max_iterations: Some(1),
            ..LawsonHanson::default()
        };
        assert!(matches!(solver.solve(&a, &b), Err(FocusError::SolverFailure(_))));
    }
}
