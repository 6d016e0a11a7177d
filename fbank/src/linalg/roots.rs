use core::f64::consts::PI;

use crate::kernel::{ExecInvariantViolation, KernelLifecycle};
use nalgebra::linalg::Schur;
use nalgebra::Complex;

use super::{CompanionBuild1D, CompanionConfig, CompanionKernel};

/// Relative tolerance used when snapping eigen-solver output onto exact
/// real values and exact conjugate pairs.
pub const ROOT_SNAP_TOLERANCE: f64 = 1e-8;

/// QR sweeps allowed per companion-matrix dimension before the eigenvalue
/// iteration is declared stuck.
const SCHUR_SWEEPS_PER_DIM: usize = 100;

/// Roots of a real polynomial given highest power first.
///
/// Leading zeros are ignored, trailing zeros contribute roots at the origin
/// and the rest come from the eigenvalues of the companion matrix. Binomials
/// `c0 z^m + cm` (comb filters) are solved in closed form, since unshifted QR
/// stalls on their cyclic companion matrix. The output is passed through
/// [`snap_conjugates`], so complex roots always come in exact conjugate pairs.
pub fn polyroots(coeffs: &[f64]) -> Result<Vec<Complex<f64>>, ExecInvariantViolation> {
    let first = coeffs
        .iter()
        .position(|c| *c != 0.0)
        .ok_or(ExecInvariantViolation::InvalidState {
            reason: "polynomial has no non-zero coefficient",
        })?;
    let trimmed = &coeffs[first..];
    let trailing = trimmed.iter().rev().take_while(|c| **c == 0.0).count();
    let core = &trimmed[..trimmed.len() - trailing];

    let mut roots = Vec::with_capacity(trimmed.len().saturating_sub(1));
    if core.len() >= 2 && core[1..core.len() - 1].iter().all(|c| *c == 0.0) {
        roots.extend(binomial_roots(core[0], core[core.len() - 1], core.len() - 1));
    } else if core.len() >= 2 {
        let kernel = CompanionKernel::try_new(CompanionConfig {
            expected_len: Some(core.len()),
        })?;
        let matrix = kernel.run(core)?;
        let max_niter = SCHUR_SWEEPS_PER_DIM * matrix.nrows();
        let schur = Schur::try_new(matrix, f64::EPSILON, max_niter).ok_or(
            ExecInvariantViolation::InvalidState {
                reason: "companion eigenvalue iteration did not converge",
            },
        )?;
        roots.extend(schur.complex_eigenvalues().iter().copied());
    }
    roots.extend(core::iter::repeat(Complex::new(0.0, 0.0)).take(trailing));
    Ok(snap_conjugates(roots, ROOT_SNAP_TOLERANCE))
}

/// The `m` roots of `lead * z^m + constant`, spaced evenly on a circle.
fn binomial_roots(lead: f64, constant: f64, m: usize) -> impl Iterator<Item = Complex<f64>> {
    let w = -constant / lead;
    let radius = w.abs().powf(1.0 / m as f64);
    let offset = if w < 0.0 { PI / m as f64 } else { 0.0 };
    (0..m).map(move |k| Complex::from_polar(radius, offset + 2.0 * PI * k as f64 / m as f64))
}

/// Force nearly-real values onto the real axis and nearly-conjugate values
/// into exact conjugate pairs. Order is preserved.
pub fn snap_conjugates(mut roots: Vec<Complex<f64>>, tol: f64) -> Vec<Complex<f64>> {
    for r in roots.iter_mut() {
        if r.im.abs() <= tol * r.norm().max(1.0) {
            r.im = 0.0;
        }
    }
    let mut matched = vec![false; roots.len()];
    for i in 0..roots.len() {
        if matched[i] || roots[i].im == 0.0 {
            continue;
        }
        let target = roots[i].conj();
        let partner = (0..roots.len())
            .filter(|&j| j != i && !matched[j] && roots[j].im != 0.0)
            .min_by(|&a, &b| {
                (roots[a] - target)
                    .norm()
                    .total_cmp(&(roots[b] - target).norm())
            });
        if let Some(j) = partner {
            if (roots[j] - target).norm() <= tol * target.norm().max(1.0) * 100.0 {
                roots[j] = target;
                matched[i] = true;
                matched[j] = true;
            }
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sorted_re(mut roots: Vec<Complex<f64>>) -> Vec<f64> {
        roots.sort_by(|a, b| a.re.total_cmp(&b.re));
        roots.into_iter().map(|r| r.re).collect()
    }

    #[test]
    fn real_roots_from_companion() {
        // (z - 2)(z - 3)(z - 5)
        let roots = polyroots(&[1.0, -10.0, 31.0, -30.0]).expect("roots");
        let re = sorted_re(roots.clone());
        assert_abs_diff_eq!(re[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(re[1], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(re[2], 5.0, epsilon = 1e-9);
        assert!(roots.iter().all(|r| r.im == 0.0));
    }

    #[test]
    fn complex_roots_are_exact_conjugates() {
        // z^2 - 2 r cos(t) z + r^2 with r = 0.9, t = 0.7
        let (r, t) = (0.9f64, 0.7f64);
        let roots = polyroots(&[1.0, -2.0 * r * t.cos(), r * r]).expect("roots");
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0], roots[1].conj());
        assert_abs_diff_eq!(roots[0].norm(), r, epsilon = 1e-12);
    }

    #[test]
    fn leading_and_trailing_zeros() {
        let roots = polyroots(&[0.0, 1.0, -1.0, 0.0, 0.0]).expect("roots");
        assert_eq!(roots.len(), 3);
        let re = sorted_re(roots);
        assert_eq!(re, vec![0.0, 0.0, 1.0]);

        assert!(polyroots(&[0.0, 0.0]).is_err());
        assert!(polyroots(&[2.0]).expect("constant").is_empty());
    }

    #[test]
    fn comb_denominator_roots() {
        // z^10 + 0.5, the denominator shape of a ten-tap comb
        let mut coeffs = vec![0.0; 11];
        coeffs[0] = 1.0;
        coeffs[10] = 0.5;
        let roots = polyroots(&coeffs).expect("roots");
        assert_eq!(roots.len(), 10);
        for r in &roots {
            assert_abs_diff_eq!(r.norm(), 0.5f64.powf(0.1), epsilon = 1e-12);
            assert_abs_diff_eq!((r.powu(10) + 0.5).norm(), 0.0, epsilon = 1e-12);
            assert!(roots.contains(&r.conj()));
        }
        assert!(roots.iter().all(|r| r.im != 0.0));

        // 2 z^5 - 2 z has real roots at -1, 0 and 1
        let roots = polyroots(&[2.0, 0.0, 0.0, 0.0, -2.0, 0.0]).expect("roots");
        assert_eq!(roots.len(), 5);
        let real: Vec<f64> = sorted_re(roots.iter().filter(|r| r.im == 0.0).copied().collect());
        assert_eq!(real.len(), 3);
        assert_abs_diff_eq!(real[0], -1.0, epsilon = 1e-12);
        assert_eq!(real[1], 0.0);
        assert_abs_diff_eq!(real[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn snapping_keeps_unpaired_values() {
        let roots = vec![Complex::new(0.5, 0.5), Complex::new(0.1, 1e-14)];
        let snapped = snap_conjugates(roots, 1e-8);
        assert_eq!(snapped[0], Complex::new(0.5, 0.5));
        assert_eq!(snapped[1], Complex::new(0.1, 0.0));
    }
}
