//! Digital filter design.
//!
//! * [`bilinear`]: analog-to-digital frequency warping.
//! * [`TransferFunction`]: zero/pole/gain plus derived coefficients.
//! * IIR design from analog prototypes: [`build_lowpass`], [`build_highpass`],
//!   [`build_bandpass`], [`build_bandstop`], [`IirDesignKernel`], and the
//!   notch/peak/comb resonators.
//! * Second-order sections: [`tf_to_sos`], [`sos_to_tf`].
//! * FIR design: windowed sinc ([`FirWinKernel`]), frequency sampling
//!   ([`FirSamplingKernel`]) and equiripple ([`EquirippleKernel`]).

pub mod bilinear;
mod fir;
mod fir_sampling;
mod iir;
mod prototype;
mod relative_degree;
mod remez;
mod resonator;
mod sos;
mod transfer_function;

pub use fir::*;
pub use fir_sampling::*;
pub use iir::*;
pub use prototype::*;
pub use remez::*;
pub use resonator::*;
pub use sos::*;
pub use transfer_function::*;

use nalgebra::Complex;

/// Band type of a frequency-selective design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterBandType {
    /// Pass frequencies below the cutoff.
    Lowpass,
    /// Pass frequencies above the cutoff.
    Highpass,
    /// Pass frequencies between two cutoffs.
    Bandpass,
    /// Reject frequencies between two cutoffs.
    Bandstop,
}

impl FilterBandType {
    /// Number of cutoff frequencies the band type requires.
    pub fn cutoff_count(&self) -> usize {
        match self {
            FilterBandType::Lowpass | FilterBandType::Highpass => 1,
            FilterBandType::Bandpass | FilterBandType::Bandstop => 2,
        }
    }
}

/// Zeros, poles and gain with no structural guarantees.
///
/// This is the raw interchange format; [`TransferFunction::from_zpk`] is the
/// validated counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct ZpkFormatFilter {
    /// Zeros.
    pub z: Vec<Complex<f64>>,
    /// Poles.
    pub p: Vec<Complex<f64>>,
    /// System gain.
    pub k: f64,
}

impl ZpkFormatFilter {
    /// Construct a new zpk filter.
    pub fn new(z: Vec<Complex<f64>>, p: Vec<Complex<f64>>, k: f64) -> Self {
        Self { z, p, k }
    }
}

/// Numerator/denominator coefficients in ascending powers of `z^-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaFormatFilter {
    /// Numerator.
    pub b: Vec<f64>,
    /// Denominator.
    pub a: Vec<f64>,
}

/// Representation requested from an IIR design kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterOutputType {
    /// A single [`TransferFunction`].
    #[default]
    Tf,
    /// Zeros, poles and gain.
    Zpk,
    /// Numerator and denominator coefficients.
    Ba,
    /// A cascade of [`Sos`].
    Sos,
}

/// Output of an IIR design kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum DigitalFilter {
    /// Single rational transfer function.
    Tf(TransferFunction),
    /// Zero/pole/gain.
    Zpk(ZpkFormatFilter),
    /// Coefficients.
    Ba(BaFormatFilter),
    /// Cascade of second-order sections, gain carried by the first section.
    Sos(Vec<Sos>),
}
