//! Frequency response of coefficient sets on the unit circle.
//!
//! Frequencies are in radians per sample; `freqz` samples `n` points evenly
//! on `[0, π)`.

use nalgebra::Complex;

use super::design::Sos;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D};
use crate::signal::traits::{Freqz1D, SosFreqz1D};

/// Evaluate `Σ c[k] e^{-jωk}`.
fn evaluate_polynomial(coeffs: &[f64], omega: f64) -> Complex<f64> {
    let z = Complex::from_polar(1.0, -omega);
    let mut acc = Complex::new(0.0, 0.0);
    let mut zpow = Complex::new(1.0, 0.0);
    for &c in coeffs {
        acc += zpow * c;
        zpow *= z;
    }
    acc
}

/// `B(e^{jω}) / A(e^{jω})` for coefficients in ascending powers of `z^-1`.
pub fn evaluate_response(b: &[f64], a: &[f64], omega: f64) -> Complex<f64> {
    evaluate_polynomial(b, omega) / evaluate_polynomial(a, omega)
}

/// Response of an FIR kernel at `omega`.
pub fn evaluate_fir(kernel: &[f64], omega: f64) -> Complex<f64> {
    evaluate_polynomial(kernel, omega)
}

fn freqz_impl(b: &[f64], a: &[f64], n: usize) -> (Vec<f64>, Vec<Complex<f64>>) {
    (0..n)
        .map(|i| {
            let omega = core::f64::consts::PI * i as f64 / n as f64;
            (omega, evaluate_response(b, a, omega))
        })
        .unzip()
}

fn sosfreqz_impl(sos: &[Sos], n: usize) -> (Vec<f64>, Vec<Complex<f64>>) {
    let w: Vec<f64> = (0..n)
        .map(|i| core::f64::consts::PI * i as f64 / n as f64)
        .collect();
    let h = w
        .iter()
        .map(|&omega| {
            sos.iter()
                .map(|sec| evaluate_response(sec.b(), sec.a(), omega))
                .product()
        })
        .collect();
    (w, h)
}

/// Constructor config for [`FreqzKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqzConfig {
    /// Number of frequency points on `[0, π)`.
    pub n: usize,
}

/// Frequency response of `b / a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqzKernel {
    n: usize,
}

impl KernelLifecycle for FreqzKernel {
    type Config = FreqzConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.n == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "n",
                reason: "n must be > 0",
            });
        }
        Ok(Self { n: config.n })
    }
}

fn check_len<T>(out: &[T], arg: &'static str, expected: usize) -> Result<(), ExecInvariantViolation> {
    if out.len() != expected {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg,
            expected,
            got: out.len(),
        });
    }
    Ok(())
}

impl Freqz1D for FreqzKernel {
    fn run_into<I1, I2, OW, OH>(
        &self,
        b: &I1,
        a: &I2,
        w: &mut OW,
        h: &mut OH,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
        OW: Write1D<f64> + ?Sized,
        OH: Write1D<Complex<f64>> + ?Sized,
    {
        let (ww, hh) = self.run_alloc(b, a)?;
        let w_out = w.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        check_len(w_out, "w", self.n)?;
        w_out.copy_from_slice(&ww);
        let h_out = h.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        check_len(h_out, "h", self.n)?;
        h_out.copy_from_slice(&hh);
        Ok(())
    }

    fn run_alloc<I1, I2>(
        &self,
        b: &I1,
        a: &I2,
    ) -> Result<(Vec<f64>, Vec<Complex<f64>>), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let b = b.read_slice().map_err(ExecInvariantViolation::from)?;
        let a = a.read_slice().map_err(ExecInvariantViolation::from)?;
        if b.is_empty() || a.is_empty() {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "freqz numerator and denominator must be non-empty",
            });
        }
        Ok(freqz_impl(b, a, self.n))
    }
}

/// Constructor config for [`SosFreqzKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosFreqzConfig {
    /// Number of frequency points on `[0, π)`.
    pub n: usize,
}

/// Frequency response of a section cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosFreqzKernel {
    n: usize,
}

impl KernelLifecycle for SosFreqzKernel {
    type Config = SosFreqzConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.n == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "n",
                reason: "n must be > 0",
            });
        }
        Ok(Self { n: config.n })
    }
}

impl SosFreqz1D for SosFreqzKernel {
    fn run_into<OW, OH>(
        &self,
        sos: &[Sos],
        w: &mut OW,
        h: &mut OH,
    ) -> Result<(), ExecInvariantViolation>
    where
        OW: Write1D<f64> + ?Sized,
        OH: Write1D<Complex<f64>> + ?Sized,
    {
        let (ww, hh) = self.run_alloc(sos)?;
        let w_out = w.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        check_len(w_out, "w", self.n)?;
        w_out.copy_from_slice(&ww);
        let h_out = h.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        check_len(h_out, "h", self.n)?;
        h_out.copy_from_slice(&hh);
        Ok(())
    }

    fn run_alloc(&self, sos: &[Sos]) -> Result<(Vec<f64>, Vec<Complex<f64>>), ExecInvariantViolation> {
        if sos.is_empty() {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "sosfreqz requires at least one section",
            });
        }
        Ok(sosfreqz_impl(sos, self.n))
    }
}

/// Frequency response of digital filter coefficients.
///
/// Empty coefficients or `n == 0` give empty output.
pub fn freqz(b: &[f64], a: &[f64], n: usize) -> (Vec<f64>, Vec<Complex<f64>>) {
    let kernel = match FreqzKernel::try_new(FreqzConfig { n }) {
        Ok(kernel) => kernel,
        Err(_) => return (Vec::new(), Vec::new()),
    };
    kernel.run_alloc(b, a).unwrap_or_default()
}

/// Frequency response of a section cascade.
pub fn sosfreqz(sos: &[Sos], n: usize) -> (Vec<f64>, Vec<Complex<f64>>) {
    let kernel = match SosFreqzKernel::try_new(SosFreqzConfig { n }) {
        Ok(kernel) => kernel,
        Err(_) => return (Vec::new(), Vec::new()),
    };
    kernel.run_alloc(sos).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moving_average_has_unit_dc_gain() {
        let (w, h) = freqz(&[0.5, 0.5], &[1.0], 32);
        assert_eq!(w.len(), 32);
        assert_abs_diff_eq!(h[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(h[0].im, 0.0, epsilon = 1e-12);
        // |cos(ω/2)| at ω = π/2
        assert_abs_diff_eq!(h[16].norm(), 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn fir_matches_response_with_unit_denominator() {
        let kernel = [0.1, 0.2, 0.4, 0.2, 0.1];
        for omega in [0.0, 0.3, 1.2, 3.0] {
            let a = evaluate_fir(&kernel, omega);
            let b = evaluate_response(&kernel, &[1.0], omega);
            assert_abs_diff_eq!((a - b).norm(), 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn freqz_kernel_checks_output_shape() {
        assert!(FreqzKernel::try_new(FreqzConfig { n: 0 }).is_err());
        let kernel = FreqzKernel::try_new(FreqzConfig { n: 32 }).expect("valid config");
        let mut w = vec![0.0; 31];
        let mut h = vec![Complex::new(0.0, 0.0); 32];
        let err = kernel
            .run_into(&[0.5, 0.5], &[1.0], &mut w, &mut h)
            .expect_err("short frequency buffer");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { arg: "w", .. }));
        assert!(freqz(&[], &[1.0], 8).0.is_empty());
    }

    #[test]
    fn cascade_response_is_product_of_sections() {
        let first = Sos::from_coefficients([0.5, 0.5, 0.0], [1.0, -0.3, 0.0]).expect("section");
        let second = Sos::from_coefficients([1.0, 0.0, -1.0], [1.0, 0.2, 0.5]).expect("section");
        let (_, h) = sosfreqz(&[first, second], 16);
        let (_, h1) = freqz(first.b(), first.a(), 16);
        let (_, h2) = freqz(second.b(), second.a(), 16);
        for i in 0..16 {
            assert_abs_diff_eq!((h[i] - h1[i] * h2[i]).norm(), 0.0, epsilon = 1e-12);
        }
        let kernel = SosFreqzKernel::try_new(SosFreqzConfig { n: 16 }).expect("valid config");
        assert!(matches!(
            kernel.run_alloc(&[]),
            Err(ExecInvariantViolation::InvalidState { .. })
        ));
    }
}
