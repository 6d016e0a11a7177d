//! Normalized analog lowpass prototypes (cutoff 1 rad/s).

use core::f64::consts::PI;

use super::relative_degree::relative_degree;
use super::transfer_function::validate_conjugates;
use crate::kernel::ConfigError;
use nalgebra::Complex;

/// Analog prototype a digital IIR design starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalogPrototype {
    /// Maximally flat passband.
    Butterworth {
        /// Filter order.
        order: usize,
    },
    /// Equiripple passband.
    ChebyshevI {
        /// Filter order.
        order: usize,
        /// Peak-to-peak passband ripple in dB.
        ripple_db: f64,
    },
    /// Equiripple stopband.
    ChebyshevII {
        /// Filter order.
        order: usize,
        /// Minimum stopband attenuation in dB.
        attenuation_db: f64,
    },
    /// Caller-supplied poles and (optionally fewer) zeros.
    Custom {
        /// Analog poles.
        poles: Vec<Complex<f64>>,
        /// Finite analog zeros; missing zeros are placed by the band mapping.
        zeros: Vec<Complex<f64>>,
    },
}

impl AnalogPrototype {
    /// Check the prototype parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AnalogPrototype::Butterworth { order } => check_order(*order),
            AnalogPrototype::ChebyshevI { order, ripple_db } => {
                check_order(*order)?;
                check_db(*ripple_db, "ripple_db")
            }
            AnalogPrototype::ChebyshevII {
                order,
                attenuation_db,
            } => {
                check_order(*order)?;
                check_db(*attenuation_db, "attenuation_db")
            }
            AnalogPrototype::Custom { poles, zeros } => {
                if poles.is_empty() {
                    return Err(ConfigError::EmptyInput { arg: "poles" });
                }
                if poles.iter().chain(zeros).any(|v| !v.re.is_finite() || !v.im.is_finite()) {
                    return Err(ConfigError::InvalidArgument {
                        arg: "poles",
                        reason: "prototype values must be finite",
                    });
                }
                relative_degree(zeros.len(), poles.len())?;
                validate_conjugates(poles, "poles")?;
                validate_conjugates(zeros, "zeros")
            }
        }
    }

    /// Prototype poles.
    pub fn poles(&self) -> Vec<Complex<f64>> {
        match self {
            AnalogPrototype::Butterworth { order } => butterworth_poles(*order),
            AnalogPrototype::ChebyshevI { order, ripple_db } => {
                chebyshev1_poles(*order, *ripple_db)
            }
            AnalogPrototype::ChebyshevII {
                order,
                attenuation_db,
            } => chebyshev2_poles(*order, *attenuation_db),
            AnalogPrototype::Custom { poles, .. } => poles.clone(),
        }
    }

    /// Finite prototype zeros.
    pub fn zeros(&self) -> Vec<Complex<f64>> {
        match self {
            AnalogPrototype::ChebyshevII { order, .. } => chebyshev2_zeros(*order),
            AnalogPrototype::Custom { zeros, .. } => zeros.clone(),
            _ => Vec::new(),
        }
    }
}

fn check_order(order: usize) -> Result<(), ConfigError> {
    if order == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "order",
            reason: "prototype order must be at least 1",
        });
    }
    Ok(())
}

fn check_db(value: f64, arg: &'static str) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "decibel specification must be finite and positive",
        });
    }
    Ok(())
}

/// Angle of the k-th prototype pole measured from the imaginary axis.
fn theta(k: usize, order: usize) -> f64 {
    PI * (2 * k + 1) as f64 / (2 * order) as f64
}

/// Place `order` poles from a generator as exact conjugate pairs, with the
/// real pole last for odd orders.
fn paired_poles(order: usize, pole: impl Fn(f64) -> Complex<f64>) -> Vec<Complex<f64>> {
    let mut poles = Vec::with_capacity(order);
    for k in 0..order / 2 {
        let p = pole(theta(k, order));
        poles.push(p);
        poles.push(p.conj());
    }
    if order % 2 == 1 {
        poles.push(Complex::new(pole(PI / 2.0).re, 0.0));
    }
    poles
}

/// Butterworth poles on the unit circle in the left half plane.
pub fn butterworth_poles(order: usize) -> Vec<Complex<f64>> {
    paired_poles(order, |t| Complex::new(-t.sin(), t.cos()))
}

/// Chebyshev type I poles on an ellipse set by the passband ripple.
pub fn chebyshev1_poles(order: usize, ripple_db: f64) -> Vec<Complex<f64>> {
    let eps = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / order as f64;
    paired_poles(order, |t| Complex::new(-mu.sinh() * t.sin(), mu.cosh() * t.cos()))
}

/// Chebyshev type II poles, the reciprocals of an ellipse set by the
/// stopband attenuation.
pub fn chebyshev2_poles(order: usize, attenuation_db: f64) -> Vec<Complex<f64>> {
    let eps = 1.0 / (10f64.powf(attenuation_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / order as f64;
    paired_poles(order, |t| {
        Complex::new(1.0, 0.0) / Complex::new(-mu.sinh() * t.sin(), mu.cosh() * t.cos())
    })
}

/// Chebyshev type II zeros on the imaginary axis. Odd orders have one zero at
/// infinity, which is left out.
pub fn chebyshev2_zeros(order: usize) -> Vec<Complex<f64>> {
    let mut zeros = Vec::with_capacity(order);
    for k in 0..order / 2 {
        let z = Complex::new(0.0, 1.0 / theta(k, order).cos());
        zeros.push(z);
        zeros.push(z.conj());
    }
    zeros
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn butterworth_poles_lie_on_unit_circle() {
        for order in 1..=7 {
            let poles = butterworth_poles(order);
            assert_eq!(poles.len(), order);
            for p in &poles {
                assert_abs_diff_eq!(p.norm(), 1.0, epsilon = 1e-12);
                assert!(p.re < 0.0);
            }
        }
        assert_eq!(butterworth_poles(1), vec![Complex::new(-1.0, 0.0)]);
    }

    #[test]
    fn conjugates_are_exact() {
        let poles = chebyshev1_poles(4, 1.0);
        assert_eq!(poles[0].conj(), poles[1]);
        assert_eq!(poles[2].conj(), poles[3]);
        let poles = chebyshev2_poles(5, 40.0);
        assert_eq!(poles[4].im, 0.0);
        assert!(poles.iter().all(|p| p.re < 0.0));
    }

    #[test]
    fn chebyshev2_zero_count() {
        assert_eq!(chebyshev2_zeros(4).len(), 4);
        assert_eq!(chebyshev2_zeros(5).len(), 4);
        assert!(chebyshev2_zeros(3).iter().all(|z| z.re == 0.0 && z.im.abs() > 1.0));
    }

    #[test]
    fn validation() {
        assert!(AnalogPrototype::Butterworth { order: 0 }.validate().is_err());
        assert_eq!(
            AnalogPrototype::ChebyshevI {
                order: 3,
                ripple_db: -1.0
            }
            .validate(),
            Err(ConfigError::InvalidArgument {
                arg: "ripple_db",
                reason: "decibel specification must be finite and positive",
            })
        );
        let improper = AnalogPrototype::Custom {
            poles: vec![Complex::new(-1.0, 0.0)],
            zeros: vec![Complex::new(-2.0, 0.0), Complex::new(-3.0, 0.0)],
        };
        assert!(improper.validate().is_err());
        let unpaired = AnalogPrototype::Custom {
            poles: vec![Complex::new(-1.0, 1.0)],
            zeros: vec![],
        };
        assert!(unpaired.validate().is_err());
    }
}
