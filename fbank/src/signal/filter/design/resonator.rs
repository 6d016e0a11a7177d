//! Narrow-band IIR resonators: notch, peak and comb.

use core::f64::consts::PI;

use super::TransferFunction;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::traits::IirDesign;

/// Quality factor used when the caller has no preference.
pub const DEFAULT_Q: f64 = 20.0;

/// Resonator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResonatorKind {
    /// Second-order notch at the center frequency.
    Notch,
    /// Second-order constant-peak bandpass at the center frequency.
    Peak,
    /// Notches at every multiple of the fundamental.
    CombNotch {
        /// When set, the notches sit halfway between multiples so DC passes.
        pass_zero: bool,
    },
    /// Peaks at every multiple of the fundamental.
    CombPeak {
        /// When set, the peaks include DC; otherwise they sit halfway between
        /// multiples.
        pass_zero: bool,
    },
}

/// Constructor config for [`ResonatorKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonatorConfig {
    /// Resonator family.
    pub kind: ResonatorKind,
    /// Center (or fundamental) frequency, cycles/sample in `(0, 0.5)`. Comb
    /// fundamentals must divide the sampling rate evenly.
    pub frequency: f64,
    /// Quality factor, center frequency over -3 dB bandwidth.
    pub q: f64,
}

impl ResonatorConfig {
    /// Config with [`DEFAULT_Q`].
    pub fn new(kind: ResonatorKind, frequency: f64) -> Self {
        Self {
            kind,
            frequency,
            q: DEFAULT_Q,
        }
    }
}

/// Resonator design kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonatorKernel {
    kind: ResonatorKind,
    frequency: f64,
    q: f64,
    period: usize,
}

impl KernelLifecycle for ResonatorKernel {
    type Config = ResonatorConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if !(config.frequency > 0.0 && config.frequency < 0.5) {
            return Err(ConfigError::InvalidArgument {
                arg: "frequency",
                reason: "resonance frequency must lie in (0, 0.5)",
            });
        }
        if !config.q.is_finite() || config.q <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "q",
                reason: "quality factor must be finite and positive",
            });
        }
        let period = match config.kind {
            ResonatorKind::CombNotch { .. } | ResonatorKind::CombPeak { .. } => {
                let n = 1.0 / config.frequency;
                if (n - n.round()).abs() > 1e-9 {
                    return Err(ConfigError::InvalidArgument {
                        arg: "frequency",
                        reason: "comb fundamental must divide the sampling rate evenly",
                    });
                }
                n.round() as usize
            }
            _ => 2,
        };
        Ok(Self {
            kind: config.kind,
            frequency: config.frequency,
            q: config.q,
            period,
        })
    }
}

impl ResonatorKernel {
    /// Numerator and denominator coefficients, ascending powers of `z^-1`.
    pub fn coefficients(&self) -> (Vec<f64>, Vec<f64>) {
        let w0 = 2.0 * PI * self.frequency;
        match self.kind {
            ResonatorKind::Notch | ResonatorKind::Peak => {
                let alpha = w0.sin() / (2.0 * self.q);
                let cos = w0.cos();
                let a = vec![1.0 + alpha, -2.0 * cos, 1.0 - alpha];
                let b = if self.kind == ResonatorKind::Notch {
                    vec![1.0, -2.0 * cos, 1.0]
                } else {
                    vec![alpha, 0.0, -alpha]
                };
                (b, a)
            }
            ResonatorKind::CombNotch { pass_zero } => self.comb(1.0, 0.0, !pass_zero),
            ResonatorKind::CombPeak { pass_zero } => self.comb(0.0, 1.0, pass_zero),
        }
    }

    fn comb(&self, g0: f64, g: f64, negative: bool) -> (Vec<f64>, Vec<f64>) {
        let n = self.period;
        let w_delta = 2.0 * PI * self.frequency / self.q;
        let beta = (n as f64 * w_delta / 4.0).tan();
        let ax = (1.0 - beta) / (1.0 + beta);
        let bx = (g0 + g * beta) / (1.0 + beta);
        let cx = (g0 - g * beta) / (1.0 + beta);
        let sign = if negative { -1.0 } else { 1.0 };

        let mut b = vec![0.0; n + 1];
        let mut a = vec![0.0; n + 1];
        b[0] = bx;
        b[n] = sign * cx;
        a[0] = 1.0;
        a[n] = sign * ax;
        (b, a)
    }
}

impl IirDesign<f64> for ResonatorKernel {
    type Output = TransferFunction;

    fn run_alloc(&self) -> Result<Self::Output, ExecInvariantViolation> {
        let (b, a) = self.coefficients();
        TransferFunction::from_coefficients(&b, &a)
    }
}

fn resonate(
    kind: ResonatorKind,
    frequency: f64,
    q: f64,
) -> Result<TransferFunction, ExecInvariantViolation> {
    ResonatorKernel::try_new(ResonatorConfig { kind, frequency, q })?.run_alloc()
}

/// Second-order notch at `frequency`.
pub fn iir_notch(frequency: f64, q: f64) -> Result<TransferFunction, ExecInvariantViolation> {
    resonate(ResonatorKind::Notch, frequency, q)
}

/// Second-order peak with unit gain at `frequency`.
pub fn iir_peak(frequency: f64, q: f64) -> Result<TransferFunction, ExecInvariantViolation> {
    resonate(ResonatorKind::Peak, frequency, q)
}

/// Comb notch of period `1/frequency`.
pub fn iir_comb_notch(
    frequency: f64,
    q: f64,
    pass_zero: bool,
) -> Result<TransferFunction, ExecInvariantViolation> {
    resonate(ResonatorKind::CombNotch { pass_zero }, frequency, q)
}

/// Comb peak of period `1/frequency`.
pub fn iir_comb_peak(
    frequency: f64,
    q: f64,
    pass_zero: bool,
) -> Result<TransferFunction, ExecInvariantViolation> {
    resonate(ResonatorKind::CombPeak { pass_zero }, frequency, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn at(tf: &TransferFunction, f: f64) -> f64 {
        tf.magnitude_at(2.0 * PI * f)
    }

    #[test]
    fn notch_removes_center_and_keeps_dc() {
        let tf = iir_notch(0.125, DEFAULT_Q).expect("notch");
        assert!(at(&tf, 0.125) < 1e-12);
        assert_abs_diff_eq!(at(&tf, 0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at(&tf, 0.5), 1.0, epsilon = 1e-12);
        assert!(tf.poles().iter().all(|p| p.norm() < 1.0));
    }

    #[test]
    fn peak_has_unit_gain_at_center() {
        let tf = iir_peak(0.2, 5.0).expect("peak");
        assert_abs_diff_eq!(at(&tf, 0.2), 1.0, epsilon = 1e-12);
        assert!(at(&tf, 0.0) < 1e-12);
        assert!(at(&tf, 0.3) < 0.5);
    }

    #[test]
    fn comb_notch_placement() {
        let tf = iir_comb_notch(0.1, 30.0, false).expect("comb");
        assert_eq!(tf.denominator().len(), 11);
        assert_eq!(tf.poles().len(), 10);
        let radius = tf.poles()[0].norm();
        assert!(radius < 1.0);
        for p in tf.poles() {
            assert_abs_diff_eq!(p.norm(), radius, epsilon = 1e-12);
            assert!(tf.poles().contains(&p.conj()));
        }
        for k in 0..=5 {
            assert!(at(&tf, k as f64 * 0.1) < 1e-9);
        }
        assert_abs_diff_eq!(at(&tf, 0.05), 1.0, epsilon = 1e-9);

        let passing = iir_comb_notch(0.1, 30.0, true).expect("comb");
        assert_abs_diff_eq!(at(&passing, 0.0), 1.0, epsilon = 1e-9);
        assert!(at(&passing, 0.05) < 1e-9);
    }

    #[test]
    fn comb_peak_placement() {
        let tf = iir_comb_peak(0.1, 30.0, true).expect("comb");
        assert_abs_diff_eq!(at(&tf, 0.0), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(at(&tf, 0.2), 1.0, epsilon = 1e-9);
        assert!(at(&tf, 0.05) < 1e-9);

        let shifted = iir_comb_peak(0.1, 30.0, false).expect("comb");
        assert!(at(&shifted, 0.0) < 1e-9);
        assert_abs_diff_eq!(at(&shifted, 0.05), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_parameters() {
        let err = ResonatorKernel::try_new(ResonatorConfig::new(
            ResonatorKind::CombNotch { pass_zero: false },
            0.15,
        ))
        .expect_err("fundamental does not divide fs");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "frequency", .. }));

        let err = ResonatorKernel::try_new(ResonatorConfig {
            kind: ResonatorKind::Notch,
            frequency: 0.1,
            q: 0.0,
        })
        .expect_err("zero q");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "q", .. }));
        assert!(iir_peak(0.5, DEFAULT_Q).is_err());
    }
}
