use nalgebra::Complex;

use super::{tf_to_sos, BaFormatFilter, Sos, ZpkFormatFilter};
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::linalg::polyroots;
use crate::signal::fft::{FourierConfig, FourierKernel};
use crate::signal::filter::{evaluate_response, freqz};

/// Absolute tolerance on real and imaginary parts when matching a complex
/// value with its conjugate partner.
pub const CONJUGATE_TOLERANCE: f64 = 1e-10;

/// Smallest response magnitude a transfer function can be normalized against.
const MIN_NORMALIZATION_MAGNITUDE: f64 = 1e-300;

/// Discrete-time rational transfer function
///
/// `H(z) = k · z^-d · Π(1 - z_i z^-1) / Π(1 - p_i z^-1)`
///
/// Zeros and poles are stored together with the real numerator and
/// denominator coefficients they expand to, in ascending powers of `z^-1`.
/// The pure delay `d` counts the leading zero numerator coefficients.
/// Complex zeros and poles always come in exact conjugate pairs, so the
/// coefficients are real.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    zeros: Vec<Complex<f64>>,
    poles: Vec<Complex<f64>>,
    gain: f64,
    delay: usize,
    numerator: Vec<f64>,
    denominator: Vec<f64>,
}

impl TransferFunction {
    /// Build from zeros, poles and gain.
    ///
    /// Every complex zero and pole must have its conjugate partner in the same
    /// list (within [`CONJUGATE_TOLERANCE`]).
    pub fn from_zpk(
        zeros: Vec<Complex<f64>>,
        poles: Vec<Complex<f64>>,
        gain: f64,
    ) -> Result<Self, ConfigError> {
        if !gain.is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "gain",
                reason: "gain must be finite",
            });
        }
        validate_conjugates(&zeros, "zeros")?;
        validate_conjugates(&poles, "poles")?;
        let mut numerator = expand_roots(&zeros);
        numerator.iter_mut().for_each(|c| *c *= gain);
        let denominator = expand_roots(&poles);
        Ok(Self {
            numerator: trim_trailing_zeros(numerator),
            denominator: trim_trailing_zeros(denominator),
            zeros,
            poles,
            gain,
            delay: 0,
        })
    }

    /// Build from numerator and denominator coefficients (ascending powers of
    /// `z^-1`).
    ///
    /// Coefficients are normalized so the leading denominator coefficient is
    /// one. Zeros and poles are recovered from the companion matrices of both
    /// polynomials, and leading zeros of `b` become the pure delay.
    pub fn from_coefficients(b: &[f64], a: &[f64]) -> Result<Self, ExecInvariantViolation> {
        if b.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "b" }.into());
        }
        if a.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "a" }.into());
        }
        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "a",
                reason: "leading denominator coefficient must be finite and non-zero",
            }
            .into());
        }
        let delay = b
            .iter()
            .position(|c| *c != 0.0)
            .ok_or(ConfigError::InvalidArgument {
                arg: "b",
                reason: "numerator must have a non-zero coefficient",
            })?;
        let b0 = b[delay];

        let numerator: Vec<f64> = b.iter().map(|c| c / a0).collect();
        let denominator: Vec<f64> = a.iter().map(|c| c / a0).collect();
        let zeros = polyroots(&numerator[delay..])?;
        let poles = polyroots(&denominator)?;
        Ok(Self {
            zeros,
            poles,
            gain: b0 / a0,
            delay,
            numerator,
            denominator,
        })
    }

    /// Assemble from parts that are already known to agree with each other.
    pub(crate) fn from_raw_parts(
        zeros: Vec<Complex<f64>>,
        poles: Vec<Complex<f64>>,
        gain: f64,
        delay: usize,
        numerator: Vec<f64>,
        denominator: Vec<f64>,
    ) -> Self {
        Self {
            zeros,
            poles,
            gain,
            delay,
            numerator,
            denominator,
        }
    }

    /// Zeros.
    pub fn zeros(&self) -> &[Complex<f64>] {
        &self.zeros
    }

    /// Poles.
    pub fn poles(&self) -> &[Complex<f64>] {
        &self.poles
    }

    /// Overall gain.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Pure delay in samples, the `z^-d` factor outside the zeros.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Numerator coefficients, ascending powers of `z^-1`.
    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    /// Denominator coefficients, ascending powers of `z^-1`.
    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    /// Filter order, the larger of the zero and pole counts.
    pub fn order(&self) -> usize {
        self.zeros.len().max(self.poles.len())
    }

    /// Complex response at angular frequency `omega` (radians/sample).
    pub fn response_at(&self, omega: f64) -> Complex<f64> {
        evaluate_response(&self.numerator, &self.denominator, omega)
    }

    /// Response magnitude at angular frequency `omega`.
    pub fn magnitude_at(&self, omega: f64) -> f64 {
        self.response_at(omega).norm()
    }

    /// Rescale the gain so `|H(e^{jω})| = 1` at `omega`.
    pub fn normalize_at(&mut self, omega: f64) -> Result<(), ExecInvariantViolation> {
        let magnitude = self.magnitude_at(omega);
        if !magnitude.is_finite() || magnitude < MIN_NORMALIZATION_MAGNITUDE {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "response vanishes or diverges at the normalization frequency",
            });
        }
        self.gain /= magnitude;
        self.numerator.iter_mut().for_each(|c| *c /= magnitude);
        Ok(())
    }

    /// Response at `n` uniformly spaced frequencies on `[0, π)`.
    pub fn freqz(&self, n: usize) -> (Vec<f64>, Vec<Complex<f64>>) {
        freqz(&self.numerator, &self.denominator, n)
    }

    /// One-sided response on an `fft_size` bin grid (`fft_size/2 + 1` values),
    /// computed as the ratio of the numerator and denominator spectra.
    pub fn frequency_response(
        &self,
        fft_size: usize,
    ) -> Result<Vec<Complex<f64>>, ExecInvariantViolation> {
        let mut fft = FourierKernel::try_new(FourierConfig { size: fft_size })?;
        let num = fft.spectrum(&self.numerator)?;
        let den = fft.spectrum(&self.denominator)?;
        Ok(num.into_iter().zip(den).map(|(n, d)| n / d).collect())
    }

    /// Zero/pole/gain view. The pure delay is not part of it, see
    /// [`TransferFunction::delay`].
    pub fn to_zpk(&self) -> ZpkFormatFilter {
        ZpkFormatFilter::new(self.zeros.clone(), self.poles.clone(), self.gain)
    }

    /// Coefficient view.
    pub fn to_ba(&self) -> BaFormatFilter {
        BaFormatFilter {
            b: self.numerator.clone(),
            a: self.denominator.clone(),
        }
    }

    /// Split into second-order sections, see [`tf_to_sos`].
    pub fn to_sos(&self) -> Result<Vec<Sos>, ExecInvariantViolation> {
        tf_to_sos(self)
    }
}

impl TryFrom<ZpkFormatFilter> for TransferFunction {
    type Error = ConfigError;

    fn try_from(zpk: ZpkFormatFilter) -> Result<Self, Self::Error> {
        Self::from_zpk(zpk.z, zpk.p, zpk.k)
    }
}

/// Reject any complex value whose conjugate is missing from `values`.
pub(crate) fn validate_conjugates(
    values: &[Complex<f64>],
    arg: &'static str,
) -> Result<(), ConfigError> {
    let mut matched = vec![false; values.len()];
    for i in 0..values.len() {
        if matched[i] || values[i].im.abs() < CONJUGATE_TOLERANCE {
            continue;
        }
        let partner = (i + 1..values.len()).find(|&j| {
            !matched[j]
                && (values[j].re - values[i].re).abs() < CONJUGATE_TOLERANCE
                && (values[j].im + values[i].im).abs() < CONJUGATE_TOLERANCE
        });
        match partner {
            Some(j) => {
                matched[i] = true;
                matched[j] = true;
            }
            None => {
                return Err(ConfigError::InvalidArgument {
                    arg,
                    reason: "complex values must come in conjugate pairs",
                })
            }
        }
    }
    Ok(())
}

/// Real coefficients of `Π(1 - r z^-1)`, ascending powers of `z^-1`.
pub(crate) fn expand_roots(roots: &[Complex<f64>]) -> Vec<f64> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for root in roots {
        coeffs.push(Complex::new(0.0, 0.0));
        for k in (1..coeffs.len()).rev() {
            let prev = coeffs[k - 1];
            coeffs[k] -= root * prev;
        }
    }
    coeffs.into_iter().map(|c| c.re).collect()
}

/// Drop exact trailing zeros (`z^-k` terms that contribute nothing), keeping
/// at least one coefficient.
pub(crate) fn trim_trailing_zeros(mut coeffs: Vec<f64>) -> Vec<f64> {
    while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
        coeffs.pop();
    }
    coeffs
}
