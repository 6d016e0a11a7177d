//! Gammatone filter bank on ERB-spaced center frequencies.
//!
//! Each channel is a fourth-order gammatone realized as four real biquads,
//! in the form given by Slaney's auditory toolbox. The bank row is the power
//! spectrum of the cascade's impulse response.

use core::f64::consts::PI;

use log::debug;
use nalgebra::Complex;
use ndarray::{Array2, Axis};

use super::{validate_grid, FilterBank};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::fft::{FourierConfig, FourierKernel};
use crate::signal::filter::design::Sos;
use crate::signal::filter::sosfilt;
use crate::signal::scale::{EAR_Q, MIN_BW};
use crate::signal::traits::FilterBankDesign;

/// Constructor config for [`ErbKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErbConfig {
    /// Number of channels.
    pub count: usize,
    /// Transform length; rows have `fft_size / 2 + 1` bins.
    pub fft_size: usize,
    /// Sampling rate in Hz.
    pub sample_rate: f64,
    /// Lowest center frequency in Hz. Negative values are clamped to 0.
    pub low: f64,
    /// Highest center frequency in Hz. Values `<= low` mean Nyquist.
    pub high: f64,
    /// Divide each row by `sqrt(Σ w² · sample_rate / fft_size)`.
    pub normalize: bool,
}

/// Gammatone bank kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErbKernel {
    count: usize,
    fft_size: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    normalize: bool,
}

impl KernelLifecycle for ErbKernel {
    type Config = ErbConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_grid(config.fft_size, config.sample_rate)?;
        if config.count == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "count",
                reason: "channel count must be > 0",
            });
        }
        let low = config.low.max(0.0);
        let high = if config.high <= low {
            config.sample_rate / 2.0
        } else {
            config.high
        };
        if !(low < high) || high > config.sample_rate / 2.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "high",
                reason: "center frequencies must satisfy low < high <= Nyquist",
            });
        }
        Ok(Self {
            count: config.count,
            fft_size: config.fft_size,
            sample_rate: config.sample_rate,
            low,
            high,
            normalize: config.normalize,
        })
    }
}

/// Section coefficients and overall gain of one gammatone channel.
struct Gammatone {
    sections: [([f64; 3], [f64; 3]); 4],
    gain: f64,
}

fn gammatone(center: f64, sample_rate: f64) -> Gammatone {
    let t = 1.0 / sample_rate;
    let erb = center / EAR_Q + MIN_BW;
    let b = 1.019 * 2.0 * PI * erb;
    let theta = 2.0 * PI * center * t;
    let (sin, cos) = theta.sin_cos();
    let decay = (-b * t).exp();

    let outer = (3.0 + 2f64.powf(1.5)).sqrt();
    let inner = (3.0 - 2f64.powf(1.5)).sqrt();
    let k = [
        cos + outer * sin,
        cos - outer * sin,
        cos + inner * sin,
        cos - inner * sin,
    ];

    let a = [1.0, -2.0 * cos * decay, decay * decay];
    let sections = k.map(|ki| ([t, -t * decay * ki, 0.0], a));

    let e1 = Complex::from_polar(1.0, theta);
    let e2 = Complex::from_polar(1.0, 2.0 * theta);
    let numerator: Complex<f64> = k
        .iter()
        .map(|ki| -2.0 * e2 * t + 2.0 * decay * e1 * t * *ki)
        .product();
    let denominator = -2.0 * decay * decay - 2.0 * e2 + 2.0 * (1.0 + e2) * decay;
    Gammatone {
        sections,
        gain: (numerator / denominator.powi(4)).norm(),
    }
}

impl ErbKernel {
    /// Center frequencies, ascending, spaced uniformly on the ERB-rate scale
    /// between `low` and `high`.
    pub fn center_frequencies(&self) -> Vec<f64> {
        let bw = EAR_Q * MIN_BW;
        let step = ((self.low + bw).ln() - (self.high + bw).ln()) / self.count as f64;
        (1..=self.count)
            .rev()
            .map(|i| -bw + (i as f64 * step).exp() * (self.high + bw))
            .collect()
    }
}

impl FilterBankDesign for ErbKernel {
    fn run_alloc(&self) -> Result<FilterBank, ExecInvariantViolation> {
        let mut fft = FourierKernel::try_new(FourierConfig {
            size: self.fft_size,
        })?;
        let mut impulse = vec![0.0; self.fft_size];
        impulse[0] = 1.0;

        let centers = self.center_frequencies();
        let mut weights = Array2::zeros((self.count, self.fft_size / 2 + 1));
        for (mut row, &center) in weights.axis_iter_mut(Axis(0)).zip(&centers) {
            let channel = gammatone(center, self.sample_rate);
            let sections = channel
                .sections
                .iter()
                .map(|(b, a)| Sos::from_coefficients(*b, *a))
                .collect::<Result<Vec<_>, _>>()?;
            let response: Vec<f64> = sosfilt(&sections, &impulse)
                .into_iter()
                .map(|v| v / channel.gain)
                .collect();
            let power = fft.power_spectrum(&response)?;
            row.iter_mut().zip(power).for_each(|(w, p)| *w = p);

            if self.normalize {
                let energy = row.iter().map(|w| w * w).sum::<f64>();
                let scale = (energy * self.sample_rate / self.fft_size as f64).sqrt();
                if scale > 0.0 {
                    row /= scale;
                }
            }
        }
        debug!(
            "erb bank: {} channels from {:.1} to {:.1} Hz",
            self.count,
            centers.first().copied().unwrap_or_default(),
            centers.last().copied().unwrap_or_default()
        );
        Ok(FilterBank::from_weights(
            weights,
            self.fft_size,
            self.sample_rate,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filterbank::erb_bank;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn kernel(count: usize, low: f64, high: f64) -> ErbKernel {
        ErbKernel::try_new(ErbConfig {
            count,
            fft_size: 512,
            sample_rate: 16000.0,
            low,
            high,
            normalize: false,
        })
        .expect("erb kernel should initialize")
    }

    #[test]
    fn centers_are_erb_spaced_and_ascending() {
        let centers = kernel(16, 100.0, 6000.0).center_frequencies();
        assert_eq!(centers.len(), 16);
        assert!(centers.windows(2).all(|w| w[0] < w[1]));
        assert_abs_diff_eq!(centers[0], 100.0, epsilon = 1e-9);
        assert!(centers[15] < 6000.0);
        let erb: Vec<f64> = centers
            .iter()
            .map(|f| crate::signal::scale::hz_to_erb(*f))
            .collect();
        let step = erb[1] - erb[0];
        for w in erb.windows(2) {
            assert_abs_diff_eq!(w[1] - w[0], step, epsilon = 1e-9);
        }
    }

    #[test]
    fn channels_have_unit_gain_at_their_center() {
        let k = kernel(6, 900.0, 6000.0);
        let bank = k.run_alloc().expect("bank");
        for (row, center) in bank.weights().rows().into_iter().zip(k.center_frequencies()) {
            let peak = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .expect("non-empty row");
            let peak_hz = peak as f64 * 16000.0 / 512.0;
            assert!((peak_hz - center).abs() <= 2.0 * (center / EAR_Q + MIN_BW));
            assert_relative_eq!(row[peak], 1.0, max_relative = 0.05);
        }
    }

    #[test]
    fn normalization_sets_unit_scaled_energy() {
        let bank = erb_bank(6, 256, 8000.0, 100.0, 0.0, true).expect("bank");
        for row in bank.weights().rows() {
            let energy = row.iter().map(|w| w * w).sum::<f64>();
            assert_abs_diff_eq!(energy * 8000.0 / 256.0, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn invalid_configs_fail_fast() {
        let base = ErbConfig {
            count: 4,
            fft_size: 512,
            sample_rate: 16000.0,
            low: 0.0,
            high: 0.0,
            normalize: true,
        };
        assert!(ErbKernel::try_new(ErbConfig { count: 0, ..base }).is_err());
        assert!(ErbKernel::try_new(ErbConfig {
            high: 9000.0,
            ..base
        })
        .is_err());
        assert!(ErbKernel::try_new(ErbConfig {
            fft_size: 1,
            ..base
        })
        .is_err());
    }
}
