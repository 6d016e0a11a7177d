//! Window functions used to taper FIR kernels.
//!
//! Symmetric windows (`sym = true`) are what FIR design wants; periodic
//! windows are the first `n` points of a symmetric window of length `n + 1`.

mod kernels;

pub use kernels::*;

use crate::special::bessel_i0;
use core::f64::consts::PI;

/// Window families available to design kernels.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Window {
    /// Rectangular window.
    Boxcar,
    /// Triangular window (non-zero end points).
    Triangle,
    /// Hann window.
    Hann,
    /// Hamming window.
    Hamming,
    /// Blackman window.
    #[default]
    Blackman,
    /// Minimum 4-term Blackman-Harris window according to Nuttall.
    Nuttall,
    /// Kaiser window.
    Kaiser {
        /// Shape parameter `beta`.
        beta: f64,
    },
    /// General weighted sum of cosines.
    GeneralCosine {
        /// Coefficients for weighted cosine terms.
        weights: Vec<f64>,
    },
}

impl Window {
    /// Sample the window at `n` points.
    pub fn build(&self, n: usize, sym: bool) -> Vec<f64> {
        match n {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }
        let m = if sym { n } else { n + 1 };
        let mut w = match self {
            Window::Boxcar => vec![1.0; m],
            Window::Triangle => triangle(m),
            Window::Hann => general_cosine(m, &[0.5, 0.5]),
            Window::Hamming => general_cosine(m, &[0.54, 0.46]),
            Window::Blackman => general_cosine(m, &[0.42, 0.5, 0.08]),
            Window::Nuttall => general_cosine(m, &[0.3635819, 0.4891775, 0.1365995, 0.0106411]),
            Window::Kaiser { beta } => kaiser(m, *beta),
            Window::GeneralCosine { weights } => general_cosine(m, weights),
        };
        w.truncate(n);
        w
    }

    /// Multiply `samples` in place by a symmetric window of matching length.
    pub fn apply(&self, samples: &mut [f64]) {
        let w = self.build(samples.len(), true);
        samples.iter_mut().zip(w).for_each(|(s, w)| *s *= w);
    }
}

fn general_cosine(m: usize, a: &[f64]) -> Vec<f64> {
    let denom = (m - 1) as f64;
    (0..m)
        .map(|i| {
            let fac = 2.0 * PI * i as f64 / denom;
            a.iter()
                .enumerate()
                .map(|(k, ak)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * ak * (k as f64 * fac).cos()
                })
                .sum::<f64>()
        })
        .collect()
}

fn triangle(m: usize) -> Vec<f64> {
    let half = (m + 1) / 2;
    let rising: Vec<f64> = (1..=half)
        .map(|k| {
            if m % 2 == 0 {
                (2 * k - 1) as f64 / m as f64
            } else {
                2.0 * k as f64 / (m + 1) as f64
            }
        })
        .collect();
    let mirrored = if m % 2 == 0 {
        rising.iter().rev().copied().collect::<Vec<_>>()
    } else {
        rising.iter().rev().skip(1).copied().collect::<Vec<_>>()
    };
    rising.into_iter().chain(mirrored).collect()
}

fn kaiser(m: usize, beta: f64) -> Vec<f64> {
    let alpha = (m - 1) as f64 / 2.0;
    let denom = bessel_i0(beta);
    (0..m)
        .map(|i| {
            let r = (i as f64 - alpha) / alpha;
            bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denom
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn blackman_is_symmetric_with_zero_ends() {
        let w = Window::Blackman.build(9, true);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-12);
        for i in 0..9 {
            assert_abs_diff_eq!(w[i], w[8 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn hamming_matches_scipy() {
        // scipy.signal.windows.hamming(5)
        let w = Window::Hamming.build(5, true);
        let expected = [0.08, 0.54, 1.0, 0.54, 0.08];
        w.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(a, b, epsilon = 1e-12));
    }

    #[test]
    fn triangle_odd_and_even() {
        let odd = Window::Triangle.build(5, true);
        let expected = [1.0 / 3.0, 2.0 / 3.0, 1.0, 2.0 / 3.0, 1.0 / 3.0];
        odd.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(a, b, epsilon = 1e-12));

        let even = Window::Triangle.build(4, true);
        let expected = [0.25, 0.75, 0.75, 0.25];
        even.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(a, b, epsilon = 1e-12));
    }

    #[test]
    fn periodic_hann_drops_last_point() {
        let w = Window::Hann.build(4, false);
        let expected = [0.0, 0.5, 1.0, 0.5];
        w.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(a, b, epsilon = 1e-12));
    }

    #[test]
    fn kaiser_zero_beta_is_boxcar() {
        let w = Window::Kaiser { beta: 0.0 }.build(6, true);
        w.iter().for_each(|x| assert_abs_diff_eq!(*x, 1.0, epsilon = 1e-12));
    }

    #[test]
    fn degenerate_lengths() {
        assert!(Window::Hann.build(0, true).is_empty());
        assert_eq!(Window::Blackman.build(1, true), vec![1.0]);
    }
}
