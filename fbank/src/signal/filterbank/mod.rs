//! Frequency-domain filter banks over perceptual scales.
//!
//! A bank is built in two steps. A band layout ([`uniform_bands`],
//! [`mel_bands`], [`critical_bands`], [`octave_bands`], ...) produces
//! `(left, center, right)` triples in Hz; a shape kernel ([`ShapeKernel`])
//! turns those triples into one weight row per band over the bins of a
//! one-sided spectrum. ERB gammatone and chroma banks are built directly.
//!
//! ```
//! use fbank::signal::filterbank::{mel_bands, shape_bank, Shape};
//!
//! let bands = mel_bands(10, 16000.0, 0.0, 0.0).unwrap();
//! let bank = shape_bank(Shape::Triangular, 512, 16000.0, &bands).unwrap();
//! assert_eq!(bank.weights().dim(), (10, 257));
//! ```

mod bands;
mod chroma;
mod erb;
mod shapes;
mod vtln;

pub use bands::*;
pub use chroma::*;
pub use erb::*;
pub use shapes::*;
pub use vtln::*;

use log::debug;
use ndarray::{Array2, ArrayView1, Axis};

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::scale::Scale;
use crate::signal::traits::FilterBankDesign;

/// One band of a filter bank, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower edge.
    pub left: f64,
    /// Center frequency.
    pub center: f64,
    /// Upper edge.
    pub right: f64,
}

impl Band {
    /// Band from its three frequencies.
    pub const fn new(left: f64, center: f64, right: f64) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    /// `right - left`.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

pub(crate) fn validate_grid(fft_size: usize, sample_rate: f64) -> Result<(), ConfigError> {
    if fft_size < 2 {
        return Err(ConfigError::InvalidArgument {
            arg: "fft_size",
            reason: "fft_size must be at least 2",
        });
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ConfigError::InvalidArgument {
            arg: "sample_rate",
            reason: "sample_rate must be finite and > 0",
        });
    }
    Ok(())
}

/// Frequency in Hz of every bin of a one-sided spectrum.
pub fn bin_frequencies(fft_size: usize, sample_rate: f64) -> Vec<f64> {
    (0..=fft_size / 2)
        .map(|k| k as f64 * sample_rate / fft_size as f64)
        .collect()
}

/// Weight matrix of shape `(bands, fft_size / 2 + 1)`.
///
/// Row `i` weights the spectrum bins for band `i`; column `0` is 0 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    weights: Array2<f64>,
    fft_size: usize,
    sample_rate: f64,
}

impl FilterBank {
    /// Wrap a weight matrix built for the given FFT grid.
    pub fn from_weights(
        weights: Array2<f64>,
        fft_size: usize,
        sample_rate: f64,
    ) -> Result<Self, ConfigError> {
        validate_grid(fft_size, sample_rate)?;
        if weights.ncols() != fft_size / 2 + 1 {
            return Err(ConfigError::LengthMismatch {
                arg: "weights",
                expected: fft_size / 2 + 1,
                got: weights.ncols(),
            });
        }
        Ok(Self {
            weights,
            fft_size,
            sample_rate,
        })
    }

    /// The weight matrix.
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Consume the bank, returning its weights.
    pub fn into_weights(self) -> Array2<f64> {
        self.weights
    }

    /// Weights of band `index`.
    pub fn band(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.weights.nrows()).then(|| self.weights.row(index))
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of spectrum bins per band.
    pub fn bin_count(&self) -> usize {
        self.weights.ncols()
    }

    /// Transform length the bins belong to.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Sampling rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Band energies `W · spectrum`.
    pub fn apply(&self, spectrum: &[f64]) -> Result<Vec<f64>, ExecInvariantViolation> {
        if spectrum.len() != self.bin_count() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "spectrum",
                expected: self.bin_count(),
                got: spectrum.len(),
            });
        }
        Ok(self.weights.dot(&ArrayView1::from(spectrum)).to_vec())
    }

    /// Natural log of [`FilterBank::apply`], each energy clamped below at
    /// `floor` first.
    pub fn apply_and_log(
        &self,
        spectrum: &[f64],
        floor: f64,
    ) -> Result<Vec<f64>, ExecInvariantViolation> {
        if !(floor > 0.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "floor",
                reason: "log floor must be > 0",
            }
            .into());
        }
        Ok(self
            .apply(spectrum)?
            .into_iter()
            .map(|e| e.max(floor).ln())
            .collect())
    }

    /// Scale each row by `2 / (right - left)` of its band.
    pub fn normalize(&mut self, bands: &[Band]) -> Result<(), ConfigError> {
        if bands.len() != self.band_count() {
            return Err(ConfigError::LengthMismatch {
                arg: "bands",
                expected: self.band_count(),
                got: bands.len(),
            });
        }
        if bands.iter().any(|b| !(b.width() > 0.0)) {
            return Err(ConfigError::InvalidArgument {
                arg: "bands",
                reason: "band width must be > 0",
            });
        }
        for (mut row, band) in self.weights.axis_iter_mut(Axis(0)).zip(bands) {
            row *= 2.0 / band.width();
        }
        Ok(())
    }
}

fn shaped(
    shape: Shape,
    scale: Scale,
    fft_size: usize,
    sample_rate: f64,
    bands: Vec<Band>,
    vtln: Option<VtlnWarper>,
) -> Result<FilterBank, ExecInvariantViolation> {
    ShapeKernel::try_new(ShapeConfig {
        shape,
        fft_size,
        sample_rate,
        bands,
        scale,
        vtln,
    })?
    .run_alloc()
}

/// Triangular HTK-mel bank, with optional VTLN warping of the bin grid.
pub fn mel_bank(
    count: usize,
    fft_size: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    vtln: Option<VtlnWarper>,
) -> Result<FilterBank, ExecInvariantViolation> {
    let bands = mel_bands(count, sample_rate, low, high)?;
    debug!("mel bank: {count} bands over {} bins", fft_size / 2 + 1);
    shaped(Shape::Triangular, Scale::Mel, fft_size, sample_rate, bands, vtln)
}

/// Triangular Slaney-mel bank, triangles drawn in Hz as librosa does.
///
/// With `normalize`, each row is scaled by `2 / (right - left)`.
pub fn mel_bank_slaney(
    count: usize,
    fft_size: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    normalize: bool,
) -> Result<FilterBank, ExecInvariantViolation> {
    let bands = mel_bands_slaney(count, sample_rate, low, high)?;
    let mut bank = shaped(
        Shape::Triangular,
        Scale::Hz,
        fft_size,
        sample_rate,
        bands.clone(),
        None,
    )?;
    if normalize {
        bank.normalize(&bands)?;
    }
    Ok(bank)
}

/// Triangular bark bank.
pub fn bark_bank(
    count: usize,
    fft_size: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
) -> Result<FilterBank, ExecInvariantViolation> {
    let bands = bark_bands(count, sample_rate, low, high)?;
    shaped(Shape::Triangular, Scale::Bark, fft_size, sample_rate, bands, None)
}

/// Gammatone bank, see [`ErbKernel`].
pub fn erb_bank(
    count: usize,
    fft_size: usize,
    sample_rate: f64,
    low: f64,
    high: f64,
    normalize: bool,
) -> Result<FilterBank, ExecInvariantViolation> {
    ErbKernel::try_new(ErbConfig {
        count,
        fft_size,
        sample_rate,
        low,
        high,
        normalize,
    })?
    .run_alloc()
}

/// Chroma bank with default settings, see [`ChromaConfig`].
pub fn chroma_bank(fft_size: usize, sample_rate: f64) -> Result<FilterBank, ExecInvariantViolation> {
    ChromaKernel::try_new(ChromaConfig::new(fft_size, sample_rate))?.run_alloc()
}

/// Shape arbitrary bands on the plain Hz grid.
pub fn shape_bank(
    shape: Shape,
    fft_size: usize,
    sample_rate: f64,
    bands: &[Band],
) -> Result<FilterBank, ExecInvariantViolation> {
    shaped(shape, Scale::Hz, fft_size, sample_rate, bands.to_vec(), None)
}
