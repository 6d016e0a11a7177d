//! Direct form II transposed filtering with `b / a` coefficients.

use crate::kernel::ExecInvariantViolation;

/// Filter `x` through `b / a`, both in ascending powers of `z^-1`.
///
/// Coefficients are normalized by `a[0]`; the filter starts at rest.
///
/// ```
/// use fbank::signal::filter::lfilter;
///
/// let y = lfilter(&[5., 4., 1., 2.], &[1.], &[1., 2., 3., 4., 3., 5., 6.]).unwrap();
/// assert_eq!(y, vec![5., 14., 24., 36., 38., 47., 61.]);
/// ```
pub fn lfilter(b: &[f64], a: &[f64], x: &[f64]) -> Result<Vec<f64>, ExecInvariantViolation> {
    if b.is_empty() || a.is_empty() {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "lfilter numerator and denominator must be non-empty",
        });
    }
    let a0 = a[0];
    if a0 == 0.0 || !a0.is_finite() {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "leading denominator coefficient must be finite and non-zero",
        });
    }
    let order = b.len().max(a.len());
    let mut bn = vec![0.0; order];
    let mut an = vec![0.0; order];
    bn.iter_mut().zip(b).for_each(|(dst, c)| *dst = c / a0);
    an.iter_mut().zip(a).for_each(|(dst, c)| *dst = c / a0);

    // The last slot stays zero and terminates the delay line.
    let mut state = vec![0.0; order];
    let y = x
        .iter()
        .map(|&xn| {
            let yn = bn[0] * xn + state[0];
            for k in 1..order {
                state[k - 1] = bn[k] * xn - an[k] * yn + state[k];
            }
            yn
        })
        .collect();
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fir_is_a_convolution() {
        let y = lfilter(&[5., 4., 1., 2.], &[1.], &[1., 2., 3., 4., 3., 5., 6.]).expect("lfilter");
        assert_eq!(y, vec![5., 14., 24., 36., 38., 47., 61.]);
    }

    #[test]
    fn one_pole_impulse_response_decays_geometrically() {
        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        // y[n] = x[n] + 0.5 y[n-1], scaled by a0 = 2
        let y = lfilter(&[2.0], &[2.0, -1.0], &impulse).expect("lfilter");
        for (n, v) in y.iter().enumerate() {
            assert_abs_diff_eq!(*v, 0.5f64.powi(n as i32), epsilon = 1e-15);
        }
    }

    #[test]
    fn degenerate_coefficients_are_rejected() {
        assert!(lfilter(&[], &[1.0], &[1.0]).is_err());
        assert!(lfilter(&[1.0], &[0.0, 1.0], &[1.0]).is_err());
    }
}
