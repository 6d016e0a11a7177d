//! FIR design by frequency sampling.
//!
//! A desired response on a uniform half-spectrum grid is taken back to the
//! time domain with the Fourier collaborator, cut to the requested length and
//! windowed.

use core::f64::consts::PI;

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::fft::{FourierConfig, FourierKernel};
use crate::signal::traits::FirWinDesign;
use crate::signal::windows::Window;
use nalgebra::Complex;

/// FFT size used by [`fir_from_gains`] callers that have no preference.
pub const DEFAULT_SAMPLING_FFT_SIZE: usize = 512;

/// Desired response handed to [`FirSamplingKernel`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampledResponse {
    /// Magnitude (and optional phase, radians) sampled on the bins of a
    /// one-sided spectrum. The transform length is the next power of two of
    /// `magnitude.len()`; the result is a zero-phase kernel centered on the
    /// middle tap.
    Dense {
        /// Magnitude per bin.
        magnitude: Vec<f64>,
        /// Phase per bin, same length as `magnitude`.
        phase: Option<Vec<f64>>,
    },
    /// Gains at explicit normalized frequencies, linearly interpolated onto
    /// the `fft_size / 2 + 1` bin grid, with a linear-phase delay of
    /// `(numtaps - 1) / 2` samples.
    Sparse {
        /// Strictly increasing frequencies in `[0, 0.5]`; `None` spreads the
        /// gains uniformly over that range.
        frequencies: Option<Vec<f64>>,
        /// Gain at each frequency.
        gains: Vec<f64>,
        /// Transform length, which must exceed `2 · next_power_of_two(numtaps)`.
        fft_size: usize,
    },
}

/// Constructor config for [`FirSamplingKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FirSamplingConfig {
    /// Number of filter taps. Dense responses need an odd count.
    pub numtaps: usize,
    /// Desired response.
    pub response: SampledResponse,
    /// Taper applied after truncation.
    pub window: Window,
}

/// Frequency-sampling FIR design kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct FirSamplingKernel {
    numtaps: usize,
    response: SampledResponse,
    window: Window,
}

fn validate_dense(
    numtaps: usize,
    magnitude: &[f64],
    phase: Option<&Vec<f64>>,
) -> Result<(), ConfigError> {
    if numtaps % 2 == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "numtaps",
            reason: "dense frequency sampling needs an odd number of taps",
        });
    }
    if magnitude.is_empty() {
        return Err(ConfigError::EmptyInput { arg: "magnitude" });
    }
    if let Some(phase) = phase {
        if phase.len() != magnitude.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "phase",
                expected: magnitude.len(),
                got: phase.len(),
            });
        }
    }
    if numtaps / 2 >= magnitude.len().next_power_of_two() {
        return Err(ConfigError::InvalidArgument {
            arg: "numtaps",
            reason: "kernel is longer than the sampled response",
        });
    }
    Ok(())
}

fn validate_sparse(
    numtaps: usize,
    frequencies: Option<&Vec<f64>>,
    gains: &[f64],
    fft_size: usize,
) -> Result<(), ConfigError> {
    if fft_size <= 2 * numtaps.next_power_of_two() {
        return Err(ConfigError::InvalidArgument {
            arg: "fft_size",
            reason: "fft_size must exceed twice the next power of two of numtaps",
        });
    }
    if gains.iter().any(|g| !g.is_finite()) {
        return Err(ConfigError::InvalidArgument {
            arg: "gains",
            reason: "gains must be finite",
        });
    }
    match frequencies {
        None if gains.len() < 2 => Err(ConfigError::InvalidArgument {
            arg: "gains",
            reason: "a uniform grid needs at least two gains",
        }),
        None => Ok(()),
        Some(freqs) => {
            if freqs.len() != gains.len() {
                return Err(ConfigError::LengthMismatch {
                    arg: "gains",
                    expected: freqs.len(),
                    got: gains.len(),
                });
            }
            if freqs.is_empty() {
                return Err(ConfigError::EmptyInput { arg: "frequencies" });
            }
            if freqs.iter().any(|f| !(0.0..=0.5).contains(f)) {
                return Err(ConfigError::InvalidArgument {
                    arg: "frequencies",
                    reason: "frequencies must lie in [0, 0.5]",
                });
            }
            if freqs.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(ConfigError::InvalidArgument {
                    arg: "frequencies",
                    reason: "frequencies must be strictly increasing",
                });
            }
            Ok(())
        }
    }
}

impl KernelLifecycle for FirSamplingKernel {
    type Config = FirSamplingConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.numtaps == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "numtaps",
                reason: "numtaps must be greater than zero",
            });
        }
        match &config.response {
            SampledResponse::Dense { magnitude, phase } => {
                validate_dense(config.numtaps, magnitude, phase.as_ref())?
            }
            SampledResponse::Sparse {
                frequencies,
                gains,
                fft_size,
            } => validate_sparse(config.numtaps, frequencies.as_ref(), gains, *fft_size)?,
        }
        Ok(Self {
            numtaps: config.numtaps,
            response: config.response,
            window: config.window,
        })
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, clamped at both ends.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    let hi = xs.partition_point(|v| *v <= x);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}

impl FirSamplingKernel {
    fn dense(
        &self,
        magnitude: &[f64],
        phase: Option<&Vec<f64>>,
    ) -> Result<Vec<f64>, ExecInvariantViolation> {
        let fft_size = magnitude.len().next_power_of_two();
        let mut re = vec![0.0; fft_size];
        let mut im = vec![0.0; fft_size];
        match phase {
            Some(phase) => {
                for (i, (m, p)) in magnitude.iter().zip(phase).enumerate() {
                    re[i] = m * p.cos();
                    im[i] = m * p.sin();
                }
            }
            None => re[..magnitude.len()].copy_from_slice(magnitude),
        }
        let mut fft = FourierKernel::try_new(FourierConfig { size: fft_size })?;
        fft.inverse(&mut re, &mut im)?;

        // Only half the spectrum was populated, so the real part carries half
        // the energy.
        let middle = self.numtaps / 2;
        let mut kernel = vec![0.0; self.numtaps];
        for i in 0..=middle {
            kernel[i] = 2.0 * re[middle - i];
            kernel[i + middle] = 2.0 * re[i];
        }
        Ok(kernel)
    }

    fn sparse(
        &self,
        frequencies: Option<&Vec<f64>>,
        gains: &[f64],
        fft_size: usize,
    ) -> Result<Vec<f64>, ExecInvariantViolation> {
        let grid: Vec<f64> = match frequencies {
            Some(freqs) => freqs.clone(),
            None => {
                let step = 0.5 / (gains.len() - 1) as f64;
                (0..gains.len()).map(|i| i as f64 * step).collect()
            }
        };
        let delay = (self.numtaps - 1) as f64 / 2.0;
        let half: Vec<Complex<f64>> = (0..=fft_size / 2)
            .map(|k| {
                let f = k as f64 / fft_size as f64;
                let amplitude = interpolate(&grid, gains, f);
                Complex::from_polar(amplitude, -2.0 * PI * f * delay)
            })
            .collect();
        let mut fft = FourierKernel::try_new(FourierConfig { size: fft_size })?;
        let mut kernel = fft.inverse_real(&half)?;
        kernel.truncate(self.numtaps);
        Ok(kernel)
    }
}

impl FirWinDesign<f64> for FirSamplingKernel {
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<f64> + ?Sized,
    {
        let coeffs = self.run_alloc()?;
        let out_slice = out
            .write_slice_mut()
            .map_err(ExecInvariantViolation::from)?;
        if out_slice.len() != coeffs.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: coeffs.len(),
                got: out_slice.len(),
            });
        }
        out_slice.copy_from_slice(&coeffs);
        Ok(())
    }

    fn run_alloc(&self) -> Result<Vec<f64>, ExecInvariantViolation> {
        let mut kernel = match &self.response {
            SampledResponse::Dense { magnitude, phase } => self.dense(magnitude, phase.as_ref())?,
            SampledResponse::Sparse {
                frequencies,
                gains,
                fft_size,
            } => self.sparse(frequencies.as_ref(), gains, *fft_size)?,
        };
        self.window.apply(&mut kernel);
        Ok(kernel)
    }
}

/// Zero-phase kernel from a dense one-sided response, see
/// [`SampledResponse::Dense`].
pub fn fir_from_response(
    numtaps: usize,
    magnitude: &[f64],
    phase: Option<&[f64]>,
    window: Window,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    FirSamplingKernel::try_new(FirSamplingConfig {
        numtaps,
        response: SampledResponse::Dense {
            magnitude: magnitude.to_vec(),
            phase: phase.map(<[f64]>::to_vec),
        },
        window,
    })?
    .run_alloc()
}

/// Linear-phase kernel from sparse `(frequency, gain)` points, see
/// [`SampledResponse::Sparse`].
pub fn fir_from_gains(
    numtaps: usize,
    frequencies: Option<&[f64]>,
    gains: &[f64],
    fft_size: usize,
    window: Window,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    FirSamplingKernel::try_new(FirSamplingConfig {
        numtaps,
        response: SampledResponse::Sparse {
            frequencies: frequencies.map(<[f64]>::to_vec),
            gains: gains.to_vec(),
            fft_size,
        },
        window,
    })?
    .run_alloc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::evaluate_fir;
    use approx::assert_abs_diff_eq;

    fn gain(kernel: &[f64], f: f64) -> f64 {
        evaluate_fir(kernel, 2.0 * PI * f).norm()
    }

    #[test]
    fn sparse_lowpass_is_linear_phase() {
        let h = fir_from_gains(
            65,
            Some(&[0.0, 0.2, 0.25, 0.5]),
            &[1.0, 1.0, 0.0, 0.0],
            DEFAULT_SAMPLING_FFT_SIZE,
            Window::Hamming,
        )
        .expect("design");
        assert_eq!(h.len(), 65);
        for i in 0..65 {
            assert_abs_diff_eq!(h[i], h[64 - i], epsilon = 1e-12);
        }
        assert_abs_diff_eq!(gain(&h, 0.1), 1.0, epsilon = 1e-2);
        assert!(gain(&h, 0.35) < 1e-2);
    }

    #[test]
    fn uniform_grid_matches_explicit_grid() {
        let gains = [0.0, 1.0, 0.0];
        let implicit =
            fir_from_gains(31, None, &gains, 256, Window::Blackman).expect("implicit grid");
        let explicit = fir_from_gains(31, Some(&[0.0, 0.25, 0.5]), &gains, 256, Window::Blackman)
            .expect("explicit grid");
        assert_eq!(implicit.len(), explicit.len());
        for (x, y) in implicit.iter().zip(&explicit) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn dense_response_gives_symmetric_kernel() {
        let magnitude: Vec<f64> = (0..129).map(|k| if k < 32 { 1.0 } else { 0.0 }).collect();
        let h = fir_from_response(33, &magnitude, None, Window::Blackman).expect("design");
        assert_eq!(h.len(), 33);
        for i in 0..33 {
            assert_abs_diff_eq!(h[i], h[32 - i], epsilon = 1e-12);
        }
        let peak = h.iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(peak, h[16]);
    }

    #[test]
    fn dense_phase_must_match_magnitude() {
        let err = FirSamplingKernel::try_new(FirSamplingConfig {
            numtaps: 9,
            response: SampledResponse::Dense {
                magnitude: vec![1.0; 17],
                phase: Some(vec![0.0; 16]),
            },
            window: Window::Hann,
        })
        .expect_err("phase too short");
        assert_eq!(
            err,
            ConfigError::LengthMismatch {
                arg: "phase",
                expected: 17,
                got: 16
            }
        );
        assert!(fir_from_response(10, &[1.0; 17], None, Window::Hann).is_err());
    }

    #[test]
    fn sparse_preconditions() {
        let err = fir_from_gains(33, None, &[1.0, 0.0], 128, Window::Hann)
            .expect_err("fft too small");
        assert_eq!(
            err,
            ExecInvariantViolation::Config(ConfigError::InvalidArgument {
                arg: "fft_size",
                reason: "fft_size must exceed twice the next power of two of numtaps",
            })
        );
        assert!(fir_from_gains(33, Some(&[0.0, 0.3, 0.2]), &[1.0, 1.0, 0.0], 512, Window::Hann)
            .is_err());
        assert!(fir_from_gains(33, Some(&[0.0, 0.5]), &[1.0], 512, Window::Hann).is_err());
        assert!(fir_from_gains(33, None, &[1.0], 512, Window::Hann).is_err());
    }

    #[test]
    fn interpolation_clamps_at_the_ends() {
        let xs = [0.1, 0.2, 0.4];
        let ys = [1.0, 3.0, 1.0];
        assert_eq!(interpolate(&xs, &ys, 0.0), 1.0);
        assert_abs_diff_eq!(interpolate(&xs, &ys, 0.15), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interpolate(&xs, &ys, 0.3), 2.0, epsilon = 1e-12);
        assert_eq!(interpolate(&xs, &ys, 0.5), 1.0);
    }
}
