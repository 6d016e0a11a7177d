//! IIR design from analog prototypes.
//!
//! Prototype poles and zeros are moved to the requested band in the analog
//! domain, mapped to the z-plane with [`bilinear`], and the resulting
//! transfer function is normalized to unit magnitude at a reference
//! frequency: DC for lowpass and bandstop, Nyquist for highpass and the band
//! center for bandpass.

use core::f64::consts::PI;

use super::bilinear::{bilinear, prewarp};
use super::{
    AnalogPrototype, DigitalFilter, FilterBandType, FilterOutputType, TransferFunction,
};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::traits::IirDesign;
use nalgebra::Complex;

/// Highest normalized frequency, in cycles/sample.
const NYQUIST: f64 = 0.5;

/// Reject cutoffs outside the closed interval `[0, 0.5]`.
pub(crate) fn validate_cutoff(frequency: f64, arg: &'static str) -> Result<(), ConfigError> {
    if !(0.0..=NYQUIST).contains(&frequency) {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "normalized cutoff must lie in [0, 0.5]",
        });
    }
    Ok(())
}

/// Reject band edges that leave nothing to pass: a lowpass at DC, a highpass
/// at Nyquist or a bandstop over the whole range.
pub(crate) fn check_passband(band: FilterBandType, cutoff: &[f64]) -> Result<(), ConfigError> {
    let empty = match (band, cutoff) {
        (FilterBandType::Lowpass, [f]) => *f == 0.0,
        (FilterBandType::Highpass, [f]) => *f == NYQUIST,
        (FilterBandType::Bandstop, [f1, f2]) => *f1 == 0.0 && *f2 == NYQUIST,
        _ => false,
    };
    if empty {
        return Err(ConfigError::InvalidArgument {
            arg: "cutoff",
            reason: "band edges leave an empty passband",
        });
    }
    Ok(())
}

fn validate_band(f1: f64, f2: f64) -> Result<(), ConfigError> {
    validate_cutoff(f1, "f1")?;
    validate_cutoff(f2, "f2")?;
    if f1 >= f2 {
        return Err(ConfigError::InvalidArgument {
            arg: "f2",
            reason: "band edges must satisfy f1 < f2",
        });
    }
    Ok(())
}

fn check_proper(poles: &[Complex<f64>], zeros: &[Complex<f64>]) -> Result<(), ConfigError> {
    if poles.is_empty() {
        return Err(ConfigError::EmptyInput { arg: "poles" });
    }
    if zeros.len() > poles.len() {
        return Err(ConfigError::InvalidArgument {
            arg: "zeros",
            reason: "improper prototype; poles must be >= zeros",
        });
    }
    Ok(())
}

fn check_nonzero(values: &[Complex<f64>], arg: &'static str) -> Result<(), ConfigError> {
    if values.iter().any(|v| v.norm() == 0.0) {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "prototype values at the origin cannot be inverted",
        });
    }
    Ok(())
}

/// Split each prototype value into the two band-edge images `α(1 ± β)`,
/// `β = sqrt(1 - (f0/α)²)`, and map both through the bilinear transform.
fn band_images(
    values: &[Complex<f64>],
    f0: f64,
    alpha: impl Fn(Complex<f64>) -> Complex<f64>,
) -> Vec<Complex<f64>> {
    let mut out = Vec::with_capacity(2 * values.len());
    for v in values {
        let a = alpha(*v);
        let beta = (Complex::new(1.0, 0.0) - (f0 / a) * (f0 / a)).sqrt();
        let first = bilinear(a * (1.0 + beta));
        let mut second = bilinear(a * (1.0 - beta));
        // A real value that splits into a complex pair keeps it exactly paired.
        if v.im == 0.0 && first.im != 0.0 {
            second = first.conj();
        }
        out.push(first);
        out.push(second);
    }
    out
}

/// Unit transfer function, the limit of a design whose passband covers
/// `[0, 0.5]`.
fn passthrough() -> Result<TransferFunction, ExecInvariantViolation> {
    Ok(TransferFunction::from_zpk(Vec::new(), Vec::new(), 1.0)?)
}

fn finish(
    zeros: Vec<Complex<f64>>,
    poles: Vec<Complex<f64>>,
    reference: f64,
) -> Result<TransferFunction, ExecInvariantViolation> {
    let mut tf = TransferFunction::from_zpk(zeros, poles, 1.0)?;
    tf.normalize_at(reference)?;
    Ok(tf)
}

/// Lowpass transfer function with normalized cutoff `frequency`.
///
/// Prototype poles (and zeros, when given) are scaled by the pre-warped
/// cutoff. Zeros the prototype does not supply are placed at `z = -1`. A
/// cutoff at Nyquist passes everything; a cutoff at DC is rejected.
pub fn build_lowpass(
    frequency: f64,
    poles: &[Complex<f64>],
    zeros: Option<&[Complex<f64>]>,
) -> Result<TransferFunction, ExecInvariantViolation> {
    validate_cutoff(frequency, "frequency")?;
    check_passband(FilterBandType::Lowpass, &[frequency])?;
    let zeros = zeros.unwrap_or(&[]);
    check_proper(poles, zeros)?;
    if frequency == NYQUIST {
        return passthrough();
    }
    let warped = prewarp(frequency);

    let p = poles.iter().map(|p| bilinear(p * warped)).collect();
    let mut z: Vec<Complex<f64>> = zeros.iter().map(|z| bilinear(z * warped)).collect();
    z.resize(poles.len(), Complex::new(-1.0, 0.0));
    finish(z, p, 0.0)
}

/// Highpass transfer function with normalized cutoff `frequency`.
///
/// Prototype values `v` move to `ω/v`. Zeros the prototype does not supply
/// are placed at `z = 1`. A cutoff at DC passes everything; a cutoff at
/// Nyquist is rejected.
pub fn build_highpass(
    frequency: f64,
    poles: &[Complex<f64>],
    zeros: Option<&[Complex<f64>]>,
) -> Result<TransferFunction, ExecInvariantViolation> {
    validate_cutoff(frequency, "frequency")?;
    check_passband(FilterBandType::Highpass, &[frequency])?;
    let zeros = zeros.unwrap_or(&[]);
    check_proper(poles, zeros)?;
    check_nonzero(poles, "poles")?;
    check_nonzero(zeros, "zeros")?;
    if frequency == 0.0 {
        return passthrough();
    }
    let warped = Complex::new(prewarp(frequency), 0.0);

    let p = poles.iter().map(|p| bilinear(warped / p)).collect();
    let mut z: Vec<Complex<f64>> = zeros.iter().map(|z| bilinear(warped / z)).collect();
    z.resize(poles.len(), Complex::new(1.0, 0.0));
    finish(z, p, PI)
}

/// Bandpass transfer function passing `f1..f2`.
///
/// Every prototype value becomes a pair around the geometric band center.
/// Missing zeros split evenly between `z = 1` and `z = -1`. The response is
/// normalized at the digital image of the geometric center. An edge at DC
/// (Nyquist) collapses the band transform into a lowpass (highpass) at the
/// other edge.
pub fn build_bandpass(
    f1: f64,
    f2: f64,
    poles: &[Complex<f64>],
    zeros: Option<&[Complex<f64>]>,
) -> Result<TransferFunction, ExecInvariantViolation> {
    validate_band(f1, f2)?;
    let zeros = zeros.unwrap_or(&[]);
    check_proper(poles, zeros)?;
    check_nonzero(poles, "poles")?;
    check_nonzero(zeros, "zeros")?;
    match (f1 == 0.0, f2 == NYQUIST) {
        (true, true) => return passthrough(),
        (true, false) => return build_lowpass(f2, poles, Some(zeros)),
        (false, true) => return build_highpass(f1, poles, Some(zeros)),
        (false, false) => {}
    }
    let (w1, w2) = (prewarp(f1), prewarp(f2));
    let f0 = (w1 * w2).sqrt();
    let bw = w2 - w1;

    let p = band_images(poles, f0, |v| v * (bw / 2.0));
    let mut z = band_images(zeros, f0, |v| v * (bw / 2.0));
    let missing = poles.len() - zeros.len();
    z.extend(core::iter::repeat(Complex::new(-1.0, 0.0)).take(missing));
    z.extend(core::iter::repeat(Complex::new(1.0, 0.0)).take(missing));
    finish(z, p, 2.0 * f0.atan())
}

/// Bandstop transfer function rejecting `f1..f2`.
///
/// Missing zeros land on the unit circle at the band center, as conjugate
/// pairs. An edge at DC (Nyquist) leaves a highpass (lowpass) at the other
/// edge; a stopband over the whole range is rejected.
pub fn build_bandstop(
    f1: f64,
    f2: f64,
    poles: &[Complex<f64>],
    zeros: Option<&[Complex<f64>]>,
) -> Result<TransferFunction, ExecInvariantViolation> {
    validate_band(f1, f2)?;
    check_passband(FilterBandType::Bandstop, &[f1, f2])?;
    let zeros = zeros.unwrap_or(&[]);
    check_proper(poles, zeros)?;
    check_nonzero(poles, "poles")?;
    check_nonzero(zeros, "zeros")?;
    if f1 == 0.0 {
        return build_highpass(f2, poles, Some(zeros));
    }
    if f2 == NYQUIST {
        return build_lowpass(f1, poles, Some(zeros));
    }
    let (w1, w2) = (prewarp(f1), prewarp(f2));
    let f0 = (w1 * w2).sqrt();
    let bw = w2 - w1;

    let p = band_images(poles, f0, |v| Complex::new(bw / 2.0, 0.0) / v);
    let mut z = band_images(zeros, f0, |v| Complex::new(bw / 2.0, 0.0) / v);
    let notch = bilinear(Complex::new(0.0, f0));
    for _ in 0..poles.len() - zeros.len() {
        z.push(notch);
        z.push(notch.conj());
    }
    finish(z, p, 0.0)
}

/// Constructor config for [`IirDesignKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct IirDesignConfig {
    /// Band type.
    pub band: FilterBandType,
    /// Normalized cutoff(s) in cycles/sample: one for lowpass/highpass, two
    /// ascending edges for bandpass/bandstop.
    pub cutoff: Vec<f64>,
    /// Analog prototype.
    pub prototype: AnalogPrototype,
    /// Output representation.
    pub output: FilterOutputType,
}

/// IIR design kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct IirDesignKernel {
    band: FilterBandType,
    cutoff: Vec<f64>,
    prototype: AnalogPrototype,
    output: FilterOutputType,
}

impl KernelLifecycle for IirDesignKernel {
    type Config = IirDesignConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let expected = config.band.cutoff_count();
        if config.cutoff.len() != expected {
            return Err(ConfigError::LengthMismatch {
                arg: "cutoff",
                expected,
                got: config.cutoff.len(),
            });
        }
        match config.cutoff.as_slice() {
            [f] => validate_cutoff(*f, "cutoff")?,
            [f1, f2] => validate_band(*f1, *f2)?,
            _ => {}
        }
        check_passband(config.band, &config.cutoff)?;
        config.prototype.validate()?;
        Ok(Self {
            band: config.band,
            cutoff: config.cutoff,
            prototype: config.prototype,
            output: config.output,
        })
    }
}

impl IirDesignKernel {
    fn transfer_function(&self) -> Result<TransferFunction, ExecInvariantViolation> {
        let poles = self.prototype.poles();
        let zeros = self.prototype.zeros();
        let zeros = Some(zeros.as_slice());
        match (self.band, self.cutoff.as_slice()) {
            (FilterBandType::Lowpass, [f]) => build_lowpass(*f, &poles, zeros),
            (FilterBandType::Highpass, [f]) => build_highpass(*f, &poles, zeros),
            (FilterBandType::Bandpass, [f1, f2]) => build_bandpass(*f1, *f2, &poles, zeros),
            (FilterBandType::Bandstop, [f1, f2]) => build_bandstop(*f1, *f2, &poles, zeros),
            _ => Err(ExecInvariantViolation::InvalidState {
                reason: "cutoff count does not match band type",
            }),
        }
    }
}

impl IirDesign<f64> for IirDesignKernel {
    type Output = DigitalFilter;

    fn run_alloc(&self) -> Result<Self::Output, ExecInvariantViolation> {
        let tf = self.transfer_function()?;
        Ok(match self.output {
            FilterOutputType::Tf => DigitalFilter::Tf(tf),
            FilterOutputType::Zpk => DigitalFilter::Zpk(tf.to_zpk()),
            FilterOutputType::Ba => DigitalFilter::Ba(tf.to_ba()),
            FilterOutputType::Sos => DigitalFilter::Sos(tf.to_sos()?),
        })
    }
}

fn design(
    prototype: AnalogPrototype,
    cutoff: &[f64],
    band: FilterBandType,
    output: FilterOutputType,
) -> Result<DigitalFilter, ExecInvariantViolation> {
    let kernel = IirDesignKernel::try_new(IirDesignConfig {
        band,
        cutoff: cutoff.to_vec(),
        prototype,
        output,
    })?;
    kernel.run_alloc()
}

/// Butterworth design, see [`IirDesignKernel`].
pub fn butter(
    order: usize,
    cutoff: &[f64],
    band: FilterBandType,
    output: FilterOutputType,
) -> Result<DigitalFilter, ExecInvariantViolation> {
    design(AnalogPrototype::Butterworth { order }, cutoff, band, output)
}

/// Chebyshev type I design with `ripple_db` of passband ripple.
pub fn cheby1(
    order: usize,
    ripple_db: f64,
    cutoff: &[f64],
    band: FilterBandType,
    output: FilterOutputType,
) -> Result<DigitalFilter, ExecInvariantViolation> {
    design(
        AnalogPrototype::ChebyshevI { order, ripple_db },
        cutoff,
        band,
        output,
    )
}

/// Chebyshev type II design with `attenuation_db` of stopband attenuation.
pub fn cheby2(
    order: usize,
    attenuation_db: f64,
    cutoff: &[f64],
    band: FilterBandType,
    output: FilterOutputType,
) -> Result<DigitalFilter, ExecInvariantViolation> {
    design(
        AnalogPrototype::ChebyshevII {
            order,
            attenuation_db,
        },
        cutoff,
        band,
        output,
    )
}
