// src/composition.rs

use ndarray::Array1;

use crate::error::{FocusError, Result};
use crate::nnls::LeastSquaresSolver;
use crate::reference::ReferenceMatrix;

/// Estimated relative abundance of every reference organism.
#[derive(Debug, Clone)]
pub struct Composition {
    /// One weight per organism, summing to 1 unless `degenerate`.
    pub weights: Vec<f64>,
    /// The solve explained nothing (all weights zero).
    pub degenerate: bool,
}

/// Explain `profile` as a non-negative mix of the reference organisms.
pub fn solve_composition<S: LeastSquaresSolver + ?Sized>(
    reference: &ReferenceMatrix,
    profile: &[f64],
    solver: &S,
) -> Result<Composition> {
    if profile.len() != reference.kmers().len() {
        return Err(FocusError::invalid_input(
            "composition",
            format!(
                "query profile has {} k-mers but the reference has {}",
                profile.len(),
                reference.kmers().len()
            ),
        ));
    }

    let b = Array1::from(profile.to_vec());
    let raw = solver.solve(reference.matrix(), &b)?;

    if raw.iter().any(|w| !w.is_finite()) {
        return Err(FocusError::SolverFailure(
            "solution contains non-finite weights".to_string(),
        ));
    }

    let total: f64 = raw.sum();
    if total <= 0.0 {
        log::warn!("No reference organism explains the query profile; all weights are zero");
        return Ok(Composition {
            weights: vec![0.0; raw.len()],
            degenerate: true,
        });
    }

    Ok(Composition {
        weights: raw.iter().map(|w| w / total).collect(),
        degenerate: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nnls::LawsonHanson;
    use ndarray::Array2;
    use std::io::Cursor;

    fn two_organism_reference() -> ReferenceMatrix {
        let text = "K\tP\tC\tO\tF\tG\tS\tT\tAAAA\tAAAC\tAAAG\tAAAT\n\
                    Bacteria\tP1\tC1\tO1\tF1\tG1\tS1\tT1\t1\t1\t0\t0\n\
                    Bacteria\tP2\tC2\tO2\tF2\tG2\tS2\tT2\t0\t0\t1\t1\n";
        ReferenceMatrix::from_reader(Cursor::new(text), "test").unwrap()
    }

    #[test]
    fn test_even_mixture() {
        let reference = two_organism_reference();
        let comp = solve_composition(&reference, &[0.25; 4], &LawsonHanson::default()).unwrap();
        assert!(!comp.degenerate);
        assert!((comp.weights[0] - 0.5).abs() < 1e-9);
        assert!((comp.weights[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let reference = two_organism_reference();
        let comp =
            solve_composition(&reference, &[0.1, 0.3, 0.5, 0.1], &LawsonHanson::default()).unwrap();
        let sum: f64 = comp.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(comp.weights.iter().all(|&w| w >= 0.0));
        assert!(comp.weights[1] > comp.weights[0]);
    }

    struct ZeroSolver;

    impl LeastSquaresSolver for ZeroSolver {
        fn solve(&self, a: &Array2<f64>, _b: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(Array1::zeros(a.ncols()))
        }
    }

    #[test]
    fn test_zero_solution_is_degenerate() {
        let reference = two_organism_reference();
        let comp = solve_composition(&reference, &[0.25; 4], &ZeroSolver).unwrap();
        assert!(comp.degenerate);
        assert_eq!(comp.weights, vec![0.0, 0.0]);
    }

    #[test]
    fn test_profile_length_mismatch() {
        let reference = two_organism_reference();
        assert!(matches!(
            solve_composition(&reference, &[0.5, 0.5], &LawsonHanson::default()),
            Err(FocusError::InvalidInput { .. })
        ));
    }
}
