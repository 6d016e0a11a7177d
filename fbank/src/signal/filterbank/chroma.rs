//! Chroma filter bank: spectrum bins folded onto pitch classes.
//!
//! Weights follow librosa's `filters.chroma`: each bin gets a Gaussian bump
//! around its fractional pitch class, columns are normalized across
//! classes, and an optional Gaussian window over octaves de-emphasizes very
//! low and very high bins.

use ndarray::{Array2, Axis};

use super::{validate_grid, FilterBank};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::scale::hz_to_octave;
use crate::signal::traits::FilterBankDesign;

/// Normalization applied to each bin's weights across pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaNorm {
    /// Leave weights as computed.
    None,
    /// Unit sum of absolute values.
    L1,
    /// Unit Euclidean norm.
    #[default]
    L2,
}

/// Constructor config for [`ChromaKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaConfig {
    /// Transform length; rows have `fft_size / 2 + 1` bins.
    pub fft_size: usize,
    /// Sampling rate in Hz.
    pub sample_rate: f64,
    /// Number of pitch classes per octave. Default 12.
    pub chroma_count: usize,
    /// Detuning from A440 in fractions of a class. Default 0.
    pub tuning: f64,
    /// Center of the octave window. Default 5.
    pub center_octave: f64,
    /// Width of the octave window in octaves; `None` disables it. Default 2.
    pub octave_width: Option<f64>,
    /// Per-bin normalization. Default L2.
    pub norm: ChromaNorm,
    /// Rotate the classes so the first one is C instead of A. Default true.
    pub base_c: bool,
}

impl ChromaConfig {
    /// Defaults for the given grid.
    pub fn new(fft_size: usize, sample_rate: f64) -> Self {
        Self {
            fft_size,
            sample_rate,
            chroma_count: 12,
            tuning: 0.0,
            center_octave: 5.0,
            octave_width: Some(2.0),
            norm: ChromaNorm::L2,
            base_c: true,
        }
    }
}

/// Chroma bank kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKernel {
    config: ChromaConfig,
}

impl KernelLifecycle for ChromaKernel {
    type Config = ChromaConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_grid(config.fft_size, config.sample_rate)?;
        if config.chroma_count == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "chroma_count",
                reason: "chroma_count must be > 0",
            });
        }
        if !config.tuning.is_finite() || !config.center_octave.is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "tuning",
                reason: "tuning and center_octave must be finite",
            });
        }
        if config.octave_width.is_some_and(|w| !w.is_finite() || w < 0.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "octave_width",
                reason: "octave_width must be finite and >= 0",
            });
        }
        Ok(Self { config })
    }
}

impl ChromaKernel {
    /// Fractional pitch class of every bin of the full spectrum.
    fn bin_pitch(&self) -> Vec<f64> {
        let c = &self.config;
        let n = c.chroma_count as f64;
        let mut bins: Vec<f64> = (0..c.fft_size)
            .map(|k| {
                let hz = k as f64 * c.sample_rate / c.fft_size as f64;
                n * hz_to_octave(hz, c.tuning, c.chroma_count)
            })
            .collect();
        // 0 Hz has no pitch; put it 1.5 octaves below the first bin.
        bins[0] = bins[1] - 1.5 * n;
        bins
    }
}

impl FilterBankDesign for ChromaKernel {
    fn run_alloc(&self) -> Result<FilterBank, ExecInvariantViolation> {
        let c = &self.config;
        let classes = c.chroma_count;
        let n = classes as f64;
        let pitch = self.bin_pitch();
        let mut widths: Vec<f64> = pitch.windows(2).map(|w| (w[1] - w[0]).max(1.0)).collect();
        widths.push(1.0);

        let half = (n / 2.0).round_ties_even();
        let mut weights = Array2::from_shape_fn((classes, c.fft_size), |(class, k)| {
            let d = (pitch[k] - class as f64 + half + 10.0 * n).rem_euclid(n) - half;
            (-0.5 * (2.0 * d / widths[k]).powi(2)).exp()
        });

        for mut column in weights.axis_iter_mut(Axis(1)) {
            let norm = match c.norm {
                ChromaNorm::None => 1.0,
                ChromaNorm::L1 => column.iter().map(|w| w.abs()).sum::<f64>(),
                ChromaNorm::L2 => column.iter().map(|w| w * w).sum::<f64>().sqrt(),
            };
            if norm > f64::MIN_POSITIVE {
                column /= norm;
            }
        }

        if let Some(width) = c.octave_width {
            for (k, mut column) in weights.axis_iter_mut(Axis(1)).enumerate() {
                // A zero width keeps only bins exactly at the center octave.
                let z = (pitch[k] / n - c.center_octave) / width;
                let window = if z.is_nan() { 1.0 } else { (-0.5 * z * z).exp() };
                column *= window;
            }
        }

        let rows: Vec<usize> = if c.base_c {
            let shift = 3 * (classes / 12);
            (0..classes).map(|i| (i + shift) % classes).collect()
        } else {
            (0..classes).collect()
        };
        let bins = c.fft_size / 2 + 1;
        let rolled = Array2::from_shape_fn((classes, bins), |(i, k)| weights[[rows[i], k]]);
        Ok(FilterBank::from_weights(rolled, c.fft_size, c.sample_rate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::scale::midi_to_hz;
    use approx::assert_abs_diff_eq;

    fn bank(config: ChromaConfig) -> FilterBank {
        ChromaKernel::try_new(config)
            .expect("chroma kernel should initialize")
            .run_alloc()
            .expect("chroma bank")
    }

    #[test]
    fn columns_have_unit_norm_without_octave_window() {
        let config = ChromaConfig {
            octave_width: None,
            ..ChromaConfig::new(2048, 22050.0)
        };
        let w = bank(config);
        assert_eq!(w.weights().dim(), (12, 1025));
        for k in 1..1025 {
            let norm = w.weights().column(k).iter().map(|v| v * v).sum::<f64>().sqrt();
            assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        }

        let l1 = bank(ChromaConfig {
            norm: ChromaNorm::L1,
            ..config
        });
        let sum = l1.weights().column(100).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn note_bins_light_up_their_pitch_class() {
        let fft_size = 16384;
        let sr = 22050.0;
        let w = bank(ChromaConfig::new(fft_size, sr));
        // C5, E5 and A4: classes 0, 4 and 9 with base C.
        for (note, class) in [(72.0, 0), (76.0, 4), (69.0, 9)] {
            let k = (midi_to_hz(note) / sr * fft_size as f64).round() as usize;
            let column = w.weights().column(k);
            let best = (0..12)
                .max_by(|&a, &b| column[a].total_cmp(&column[b]))
                .expect("twelve classes");
            assert_eq!(best, class);
        }
    }

    #[test]
    fn base_a_rolls_back_three_classes() {
        let c = bank(ChromaConfig::new(4096, 22050.0));
        let a = bank(ChromaConfig {
            base_c: false,
            ..ChromaConfig::new(4096, 22050.0)
        });
        for i in 0..12 {
            assert_eq!(c.weights().row(i), a.weights().row((i + 3) % 12));
        }
    }

    #[test]
    fn invalid_configs_fail_fast() {
        assert!(ChromaKernel::try_new(ChromaConfig {
            chroma_count: 0,
            ..ChromaConfig::new(2048, 22050.0)
        })
        .is_err());
        assert!(ChromaKernel::try_new(ChromaConfig {
            octave_width: Some(-1.0),
            ..ChromaConfig::new(2048, 22050.0)
        })
        .is_err());
        assert!(ChromaKernel::try_new(ChromaConfig::new(1, 22050.0)).is_err());
    }
}
