//! Band shaping: one weight row per band over the one-sided spectrum bins.

use core::f64::consts::PI;

use log::{debug, warn};
use nalgebra::Complex;
use ndarray::{Array2, ArrayViewMut1, Axis};

use super::{bin_frequencies, validate_grid, Band, FilterBank, VtlnWarper};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::fft::{FourierConfig, FourierKernel};
use crate::signal::filter::design::{build_bandpass, fir_from_response};
use crate::signal::scale::Scale;
use crate::signal::traits::FilterBankDesign;
use crate::signal::windows::Window;

/// Quality factor of [`Shape::Biquad`] bands.
pub const BIQUAD_Q: f64 = 2.0;

/// Weighting applied between a band's edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// Rises linearly from `left` to 1 at `center`, falls back to 0 at `right`.
    #[default]
    Triangular,
    /// 1 on `[left, right)`.
    Rectangular,
    /// Rectangular band smoothed by a frequency-sampled FIR, peak scaled to 1.
    Trapezoidal,
    /// Magnitude of a bandpass biquad centered on the band.
    Biquad,
}

/// Constructor config for [`ShapeKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeConfig {
    /// Band weighting.
    pub shape: Shape,
    /// Transform length; rows have `fft_size / 2 + 1` bins.
    pub fft_size: usize,
    /// Sampling rate in Hz.
    pub sample_rate: f64,
    /// Bands in Hz.
    pub bands: Vec<Band>,
    /// Scale on which bins and band edges are compared. Ignored by
    /// [`Shape::Biquad`].
    pub scale: Scale,
    /// Optional warping of the bin frequencies. Ignored by [`Shape::Biquad`].
    pub vtln: Option<VtlnWarper>,
}

/// Band shaping kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKernel {
    shape: Shape,
    fft_size: usize,
    sample_rate: f64,
    bands: Vec<Band>,
    scale: Scale,
    vtln: Option<VtlnWarper>,
}

impl KernelLifecycle for ShapeKernel {
    type Config = ShapeConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_grid(config.fft_size, config.sample_rate)?;
        if config.bands.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "bands" });
        }
        let ordered = |b: &Band| {
            b.left.is_finite() && b.left <= b.center && b.center <= b.right && b.left < b.right
        };
        if !config.bands.iter().all(ordered) {
            return Err(ConfigError::InvalidArgument {
                arg: "bands",
                reason: "each band must satisfy left <= center <= right with left < right",
            });
        }
        if config.shape == Shape::Biquad
            && config
                .bands
                .iter()
                .any(|b| !(b.center > 0.0 && b.center < config.sample_rate / 2.0))
        {
            return Err(ConfigError::InvalidArgument {
                arg: "bands",
                reason: "biquad band centers must lie strictly between 0 and Nyquist",
            });
        }
        Ok(Self {
            shape: config.shape,
            fft_size: config.fft_size,
            sample_rate: config.sample_rate,
            bands: config.bands,
            scale: config.scale,
            vtln: config.vtln,
        })
    }
}

impl ShapeKernel {
    /// Bin frequencies after warping and scale mapping.
    fn mapped_bins(&self) -> Vec<f64> {
        bin_frequencies(self.fft_size, self.sample_rate)
            .into_iter()
            .map(|f| {
                let f = self.vtln.map_or(f, |w| w.warp(f));
                self.scale.from_hz(f)
            })
            .collect()
    }

    fn mapped_band(&self, band: &Band) -> (f64, f64, f64) {
        (
            self.scale.from_hz(band.left),
            self.scale.from_hz(band.center),
            self.scale.from_hz(band.right),
        )
    }

    fn triangular_row(&self, bins: &[f64], band: &Band, mut row: ArrayViewMut1<'_, f64>) {
        let (left, center, right) = self.mapped_band(band);
        let mut apex: Option<(usize, f64)> = None;
        for (k, &g) in bins.iter().enumerate() {
            if g < left || g >= right {
                continue;
            }
            row[k] = if g <= center {
                if center > left {
                    (g - left) / (center - left)
                } else {
                    1.0
                }
            } else {
                (right - g) / (right - center)
            };
            let distance = (g - center).abs();
            if apex.map_or(true, |(_, d)| distance < d) {
                apex = Some((k, distance));
            }
        }
        match apex {
            Some((k, _)) => row[k] = 1.0,
            None => warn!(
                "band [{}, {}) Hz holds no bin at fft_size {}",
                band.left, band.right, self.fft_size
            ),
        }
    }

    fn rectangular_row(&self, bins: &[f64], band: &Band, mut row: ArrayViewMut1<'_, f64>) {
        let (left, _, right) = self.mapped_band(band);
        for (k, &g) in bins.iter().enumerate() {
            if g >= left && g < right {
                row[k] = 1.0;
            }
        }
    }

    fn trapezoidal(&self, weights: &mut Array2<f64>) -> Result<(), ExecInvariantViolation> {
        let bins = self.mapped_bins();
        let mut numtaps = self.fft_size / 4 + 1;
        if numtaps % 2 == 0 {
            numtaps += 1;
        }
        let mut fft = FourierKernel::try_new(FourierConfig {
            size: self.fft_size,
        })?;
        for (mut row, band) in weights.axis_iter_mut(Axis(0)).zip(&self.bands) {
            self.rectangular_row(&bins, band, row.view_mut());
            let rectangle = row.to_vec();
            let kernel = fir_from_response(numtaps, &rectangle, None, Window::Blackman)?;
            let magnitude = fft.magnitude_spectrum(&kernel)?;
            let peak = magnitude.iter().copied().fold(0.0, f64::max);
            if peak > 0.0 {
                row.iter_mut()
                    .zip(magnitude)
                    .for_each(|(w, m)| *w = m / peak);
            } else {
                warn!(
                    "trapezoid band [{}, {}) Hz has no response; left at zero",
                    band.left, band.right
                );
                row.fill(0.0);
            }
        }
        Ok(())
    }

    fn biquad(&self, weights: &mut Array2<f64>) -> Result<(), ExecInvariantViolation> {
        let poles = [Complex::new(-1.0, 0.0)];
        for (mut row, band) in weights.axis_iter_mut(Axis(0)).zip(&self.bands) {
            let w0 = (PI * band.center / self.sample_rate).tan();
            let bw = w0 / BIQUAD_Q;
            let w1 = (w0 * w0 + bw * bw / 4.0).sqrt() - bw / 2.0;
            let w2 = w1 + bw;
            let tf = build_bandpass(w1.atan() / PI, w2.atan() / PI, &poles, None)?;
            for (k, w) in row.iter_mut().enumerate() {
                *w = tf.magnitude_at(2.0 * PI * k as f64 / self.fft_size as f64);
            }
        }
        Ok(())
    }
}

impl FilterBankDesign for ShapeKernel {
    fn run_alloc(&self) -> Result<FilterBank, ExecInvariantViolation> {
        let mut weights = Array2::zeros((self.bands.len(), self.fft_size / 2 + 1));
        match self.shape {
            Shape::Triangular => {
                let bins = self.mapped_bins();
                for (row, band) in weights.axis_iter_mut(Axis(0)).zip(&self.bands) {
                    self.triangular_row(&bins, band, row);
                }
            }
            Shape::Rectangular => {
                let bins = self.mapped_bins();
                for (row, band) in weights.axis_iter_mut(Axis(0)).zip(&self.bands) {
                    self.rectangular_row(&bins, band, row);
                }
            }
            Shape::Trapezoidal => self.trapezoidal(&mut weights)?,
            Shape::Biquad => self.biquad(&mut weights)?,
        }
        debug!(
            "{:?} bank: {} bands x {} bins on {:?}",
            self.shape,
            self.bands.len(),
            self.fft_size / 2 + 1,
            self.scale
        );
        Ok(FilterBank::from_weights(
            weights,
            self.fft_size,
            self.sample_rate,
        )?)
    }
}
