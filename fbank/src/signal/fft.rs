//! Fourier-transform collaborator backed by `rustfft`.
//!
//! A [`FourierKernel`] owns its plans and scratch space, so it is reusable but
//! not shareable: callers that fan out across bands give each worker its own
//! kernel.

use std::sync::Arc;

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Constructor config for [`FourierKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourierConfig {
    /// Transform length.
    pub size: usize,
}

/// Forward/inverse complex transform of a fixed size.
pub struct FourierKernel {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl core::fmt::Debug for FourierKernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FourierKernel")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl KernelLifecycle for FourierKernel {
    type Config = FourierConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.size == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "size",
                reason: "transform size must be greater than 0",
            });
        }
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(config.size);
        let inverse = planner.plan_fft_inverse(config.size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Ok(Self {
            size: config.size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); config.size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }
}

impl FourierKernel {
    /// Transform length.
    pub fn size(&self) -> usize {
        self.size
    }

    fn load(&mut self, re: &[f64], im: &[f64]) -> Result<(), ExecInvariantViolation> {
        if re.len() != self.size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "re",
                expected: self.size,
                got: re.len(),
            });
        }
        if im.len() != self.size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "im",
                expected: self.size,
                got: im.len(),
            });
        }
        for ((dst, r), i) in self.buffer.iter_mut().zip(re).zip(im) {
            *dst = Complex::new(*r, *i);
        }
        Ok(())
    }

    fn store(&self, re: &mut [f64], im: &mut [f64]) {
        for ((src, r), i) in self.buffer.iter().zip(re.iter_mut()).zip(im.iter_mut()) {
            *r = src.re;
            *i = src.im;
        }
    }

    /// In-place forward transform of split real/imaginary buffers.
    pub fn forward(&mut self, re: &mut [f64], im: &mut [f64]) -> Result<(), ExecInvariantViolation> {
        self.load(re, im)?;
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        self.store(re, im);
        Ok(())
    }

    /// In-place inverse transform, scaled by `1/size`.
    pub fn inverse(&mut self, re: &mut [f64], im: &mut [f64]) -> Result<(), ExecInvariantViolation> {
        self.load(re, im)?;
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let scale = 1.0 / self.size as f64;
        self.buffer.iter_mut().for_each(|c| *c *= scale);
        self.store(re, im);
        Ok(())
    }

    /// Inverse transform of a half spectrum (`size/2 + 1` bins) with implied
    /// Hermitian symmetry, returning the real time-domain sequence.
    pub fn inverse_real(&mut self, half: &[Complex<f64>]) -> Result<Vec<f64>, ExecInvariantViolation> {
        let n_freq = self.size / 2 + 1;
        if half.len() != n_freq {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "half",
                expected: n_freq,
                got: half.len(),
            });
        }
        self.buffer.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
        self.buffer[..n_freq].copy_from_slice(half);
        // DC and Nyquist bins of a real sequence carry no imaginary part.
        self.buffer[0].im = 0.0;
        if self.size % 2 == 0 {
            self.buffer[self.size / 2].im = 0.0;
        }
        for k in 1..n_freq {
            if self.size - k >= n_freq {
                self.buffer[self.size - k] = self.buffer[k].conj();
            }
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let scale = 1.0 / self.size as f64;
        Ok(self.buffer.iter().map(|c| c.re * scale).collect())
    }

    /// One-sided complex spectrum (`size/2 + 1` bins) of a real sequence.
    ///
    /// Shorter input is zero padded; longer input is rejected.
    pub fn spectrum(&mut self, samples: &[f64]) -> Result<Vec<Complex<f64>>, ExecInvariantViolation> {
        if samples.len() > self.size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "samples",
                expected: self.size,
                got: samples.len(),
            });
        }
        self.buffer.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
        for (dst, s) in self.buffer.iter_mut().zip(samples) {
            dst.re = *s;
        }
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        Ok(self.buffer[..self.size / 2 + 1].to_vec())
    }

    /// Unnormalized one-sided power spectrum `|X[k]|²`.
    pub fn power_spectrum(&mut self, samples: &[f64]) -> Result<Vec<f64>, ExecInvariantViolation> {
        Ok(self
            .spectrum(samples)?
            .into_iter()
            .map(|c| c.norm_sqr())
            .collect())
    }

    /// One-sided magnitude spectrum `|X[k]|`.
    pub fn magnitude_spectrum(&mut self, samples: &[f64]) -> Result<Vec<f64>, ExecInvariantViolation> {
        Ok(self
            .spectrum(samples)?
            .into_iter()
            .map(|c| c.norm())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::Rng;

    fn kernel(size: usize) -> FourierKernel {
        FourierKernel::try_new(FourierConfig { size }).expect("fourier kernel should initialize")
    }

    #[test]
    fn forward_then_inverse_restores_input() {
        let mut rng = rand::rng();
        let mut fft = kernel(64);
        let re0: Vec<f64> = (0..64).map(|_| rng.random_range(-1.0..1.0)).collect();
        let im0: Vec<f64> = (0..64).map(|_| rng.random_range(-1.0..1.0)).collect();
        let (mut re, mut im) = (re0.clone(), im0.clone());
        fft.forward(&mut re, &mut im).expect("forward");
        fft.inverse(&mut re, &mut im).expect("inverse");
        for i in 0..64 {
            assert_abs_diff_eq!(re[i], re0[i], epsilon = 1e-12);
            assert_abs_diff_eq!(im[i], im0[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn impulse_has_flat_power_spectrum() {
        let mut fft = kernel(16);
        let ps = fft.power_spectrum(&[1.0]).expect("power spectrum");
        assert_eq!(ps.len(), 9);
        ps.iter().for_each(|p| assert_abs_diff_eq!(*p, 1.0, epsilon = 1e-12));
    }

    #[test]
    fn inverse_real_recovers_real_sequence() {
        let mut fft = kernel(8);
        let x = [0.5, -1.0, 2.0, 0.25, 0.0, 0.0, 1.0, -0.5];
        let half = fft.spectrum(&x).expect("spectrum");
        let y = fft.inverse_real(&half).expect("inverse");
        for (a, b) in x.iter().zip(y.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut fft = kernel(8);
        let mut re = vec![0.0; 8];
        let mut im = vec![0.0; 7];
        let err = fft.forward(&mut re, &mut im).expect_err("short imaginary part");
        assert_eq!(
            err,
            ExecInvariantViolation::LengthMismatch {
                arg: "im",
                expected: 8,
                got: 7
            }
        );
        assert!(fft.spectrum(&[0.0; 9]).is_err());
    }
}
