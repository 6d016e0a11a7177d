//! Second-order section decomposition.
//!
//! [`zpk_to_sos`] pairs poles with zeros greedily. Sections are filled from the
//! back: the remaining pole closest to the unit circle goes into the last free
//! section, so the most resonant stage ends up at the end of the cascade. Each
//! pole is matched with its nearest zero while keeping every section real.

use log::debug;
use nalgebra::Complex;

use super::transfer_function::{expand_roots, trim_trailing_zeros, CONJUGATE_TOLERANCE};
use super::TransferFunction;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle};
use crate::signal::traits::ZpkToSosDesign;
use fbank_core::num_rs::polymul;

const ORIGIN: Complex<f64> = Complex::new(0.0, 0.0);

/// One biquad stage
/// `gain · z^-d · (1 - z1 z^-1)(1 - z2 z^-1) / ((1 - p1 z^-1)(1 - p2 z^-1))`.
///
/// The delay `d` is at most two and only takes up numerator taps the zeros
/// leave free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sos {
    b: [f64; 3],
    a: [f64; 3],
    zeros: [Complex<f64>; 2],
    poles: [Complex<f64>; 2],
    gain: f64,
    delay: usize,
}

impl Sos {
    /// Section from two zeros, two poles and a gain. Each pair must be either
    /// two real values or a conjugate pair for the coefficients to be exact.
    pub fn from_zpk(zeros: [Complex<f64>; 2], poles: [Complex<f64>; 2], gain: f64) -> Self {
        let num = expand_roots(&zeros);
        let den = expand_roots(&poles);
        Self {
            b: [gain * num[0], gain * num[1], gain * num[2]],
            a: [den[0], den[1], den[2]],
            zeros,
            poles,
            gain,
            delay: 0,
        }
    }

    /// Section from coefficients `b0 + b1 z^-1 + b2 z^-2` over
    /// `a0 + a1 z^-1 + a2 z^-2`, normalized by `a0`. Leading zeros in `b`
    /// become the section delay.
    pub fn from_coefficients(b: [f64; 3], a: [f64; 3]) -> Result<Self, ConfigError> {
        if a[0] == 0.0 || !a[0].is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "a",
                reason: "leading denominator coefficient must be finite and non-zero",
            });
        }
        let delay = b
            .iter()
            .position(|c| *c != 0.0)
            .ok_or(ConfigError::InvalidArgument {
                arg: "b",
                reason: "numerator must have a non-zero coefficient",
            })?;
        let b = b.map(|c| c / a[0]);
        let a = a.map(|c| c / a[0]);
        let mut undelayed = [0.0; 3];
        undelayed[..3 - delay].copy_from_slice(&b[delay..]);
        Ok(Self {
            zeros: quadratic_roots(undelayed[0], undelayed[1], undelayed[2]),
            poles: quadratic_roots(a[0], a[1], a[2]),
            gain: b[delay],
            delay,
            b,
            a,
        })
    }

    /// Numerator coefficients.
    pub fn b(&self) -> &[f64; 3] {
        &self.b
    }

    /// Denominator coefficients.
    pub fn a(&self) -> &[f64; 3] {
        &self.a
    }

    /// Section zeros.
    pub fn zeros(&self) -> &[Complex<f64>; 2] {
        &self.zeros
    }

    /// Section poles.
    pub fn poles(&self) -> &[Complex<f64>; 2] {
        &self.poles
    }

    /// Section gain.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Section delay in samples.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Numerator taps at the end of `b` that a delay can still shift into.
    fn free_taps(&self) -> usize {
        self.b.iter().rev().take_while(|c| **c == 0.0).count().min(2 - self.delay)
    }

    /// Shift the numerator right by `samples`, which must not exceed
    /// `free_taps`.
    fn delayed(mut self, samples: usize) -> Self {
        self.b.rotate_right(samples);
        self.delay += samples;
        self
    }
}

/// Roots of `c0 x² + c1 x + c2`, with `c0 != 0`.
fn quadratic_roots(c0: f64, c1: f64, c2: f64) -> [Complex<f64>; 2] {
    let disc = c1 * c1 - 4.0 * c0 * c2;
    if disc >= 0.0 {
        let sq = disc.sqrt();
        [
            Complex::new((-c1 + sq) / (2.0 * c0), 0.0),
            Complex::new((-c1 - sq) / (2.0 * c0), 0.0),
        ]
    } else {
        let root = Complex::new(-c1 / (2.0 * c0), (-disc).sqrt() / (2.0 * c0));
        [root, root.conj()]
    }
}

/// Which kind of value a pairing step may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    Any,
    Real,
    Complex,
}

fn matches(value: Complex<f64>, selector: Selector) -> bool {
    match selector {
        Selector::Any => true,
        Selector::Real => value.im == 0.0,
        Selector::Complex => value.im != 0.0,
    }
}

/// Conjugate-reduced values with a consumed mask. A complex entry stands for
/// itself and its (implicit) conjugate.
#[derive(Debug)]
struct RootArena {
    values: Vec<Complex<f64>>,
    consumed: Vec<bool>,
}

impl RootArena {
    /// Keep one member of every conjugate pair, in input order, with a
    /// non-negative imaginary part. Nearly-real values become exactly real.
    fn reduce(values: &[Complex<f64>], tol: f64) -> Result<Self, ExecInvariantViolation> {
        let mut paired = vec![false; values.len()];
        let mut reduced = Vec::with_capacity(values.len());
        for i in 0..values.len() {
            if paired[i] {
                continue;
            }
            let v = values[i];
            if v.im.abs() < tol {
                reduced.push(Complex::new(v.re, 0.0));
                continue;
            }
            let partner = (i + 1..values.len()).find(|&j| {
                !paired[j]
                    && values[j].im.abs() >= tol
                    && (values[j].re - v.re).abs() < tol
                    && (values[j].im + v.im).abs() < tol
            });
            let j = partner.ok_or(ExecInvariantViolation::InvalidState {
                reason: "complex value has no conjugate partner",
            })?;
            paired[j] = true;
            reduced.push(Complex::new(v.re, v.im.abs()));
        }
        Ok(Self {
            consumed: vec![false; reduced.len()],
            values: reduced,
        })
    }

    fn is_empty(&self) -> bool {
        self.consumed.iter().all(|c| *c)
    }

    fn remaining(&self, selector: Selector) -> impl Iterator<Item = usize> + '_ {
        (0..self.values.len())
            .filter(move |&i| !self.consumed[i] && matches(self.values[i], selector))
    }

    fn count(&self, selector: Selector) -> usize {
        self.remaining(selector).count()
    }

    /// Remaining entry minimizing `key`, first in input order on ties.
    fn argmin(&self, selector: Selector, key: impl Fn(Complex<f64>) -> f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in self.remaining(selector) {
            let d = key(self.values[i]);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    fn closest_to_unit_circle(&self, selector: Selector) -> Option<usize> {
        self.argmin(selector, |v| (v.norm() - 1.0).abs())
    }

    fn nearest(&self, target: Complex<f64>, selector: Selector) -> Option<usize> {
        self.argmin(selector, |v| (v - target).norm())
    }

    fn take(&mut self, index: usize) -> Complex<f64> {
        self.consumed[index] = true;
        self.values[index]
    }

    fn take_or_fail(
        &mut self,
        index: Option<usize>,
        reason: &'static str,
    ) -> Result<Complex<f64>, ExecInvariantViolation> {
        index
            .map(|i| self.take(i))
            .ok_or(ExecInvariantViolation::InvalidState { reason })
    }
}

/// Pair zeros and poles into second-order sections.
///
/// The shorter list is padded with origin entries, and one more origin zero
/// and pole are added when the count is odd. The overall gain is carried by
/// the first section; every other section has unit gain. Complex entries
/// without a conjugate partner (within `tol`) are rejected.
pub fn zpk_to_sos_with_tolerance(
    zeros: &[Complex<f64>],
    poles: &[Complex<f64>],
    gain: f64,
    tol: f64,
) -> Result<Vec<Sos>, ExecInvariantViolation> {
    if zeros.is_empty() && poles.is_empty() {
        return Ok(vec![Sos::from_zpk([ORIGIN; 2], [ORIGIN; 2], gain)]);
    }

    let mut z = zeros.to_vec();
    let mut p = poles.to_vec();
    let n = z.len().max(p.len());
    z.resize(n, ORIGIN);
    p.resize(n, ORIGIN);
    if n % 2 == 1 {
        z.push(ORIGIN);
        p.push(ORIGIN);
    }
    let n_sections = z.len() / 2;
    debug!(
        "pairing {} zeros and {} poles into {} sections",
        zeros.len(),
        poles.len(),
        n_sections
    );

    let mut z = RootArena::reduce(&z, tol)?;
    let mut p = RootArena::reduce(&p, tol)?;
    let mut sections = vec![Sos::from_zpk([ORIGIN; 2], [ORIGIN; 2], 1.0); n_sections];

    for si in (0..n_sections).rev() {
        let p1 = p.take_or_fail(p.closest_to_unit_circle(Selector::Any), "ran out of poles")?;

        if matches(p1, Selector::Real) && p.count(Selector::Real) == 0 {
            // Last real pole: it shares the section with one real zero only.
            let z1 = z.take_or_fail(z.nearest(p1, Selector::Real), "no real zero left")?;
            sections[si] = Sos::from_zpk([z1, ORIGIN], [p1, ORIGIN], 1.0);
            continue;
        }

        if matches(p1, Selector::Complex)
            && p.count(Selector::Real) == 1
            && z.count(Selector::Real) == 1
            && p.count(Selector::Any) + 1 == z.count(Selector::Any)
        {
            // The lone real zero must stay for the lone real pole.
            let z1 = z.take_or_fail(z.nearest(p1, Selector::Complex), "no complex zero left")?;
            sections[si] = Sos::from_zpk([z1, z1.conj()], [p1, p1.conj()], 1.0);
            continue;
        }

        let p2 = if matches(p1, Selector::Real) {
            p.take_or_fail(p.closest_to_unit_circle(Selector::Real), "no real pole left")?
        } else {
            p1.conj()
        };

        sections[si] = match z.nearest(p1, Selector::Any) {
            None => Sos::from_zpk([ORIGIN; 2], [p1, p2], 1.0),
            Some(i) => {
                let z1 = z.take(i);
                if matches(z1, Selector::Complex) {
                    Sos::from_zpk([z1, z1.conj()], [p1, p2], 1.0)
                } else {
                    let z2 = match z.nearest(p1, Selector::Real) {
                        Some(j) => z.take(j),
                        None => ORIGIN,
                    };
                    Sos::from_zpk([z1, z2], [p1, p2], 1.0)
                }
            }
        };
    }

    if !z.is_empty() || !p.is_empty() {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "unpaired values left after section assignment",
        });
    }

    let first = sections[0];
    sections[0] = Sos::from_zpk(first.zeros, first.poles, gain);
    Ok(sections)
}

/// [`zpk_to_sos_with_tolerance`] with [`CONJUGATE_TOLERANCE`].
pub fn zpk_to_sos(
    zeros: &[Complex<f64>],
    poles: &[Complex<f64>],
    gain: f64,
) -> Result<Vec<Sos>, ExecInvariantViolation> {
    zpk_to_sos_with_tolerance(zeros, poles, gain, CONJUGATE_TOLERANCE)
}

/// Split a transfer function into second-order sections.
pub fn tf_to_sos(tf: &TransferFunction) -> Result<Vec<Sos>, ExecInvariantViolation> {
    let sections = zpk_to_sos(tf.zeros(), tf.poles(), tf.gain())?;
    Ok(spread_delay(sections, tf.delay()))
}

/// Spread a pure delay over free numerator taps front to back, appending
/// delay-only sections when the zeros leave too few of them.
fn spread_delay(mut sections: Vec<Sos>, mut delay: usize) -> Vec<Sos> {
    for section in sections.iter_mut() {
        let shift = delay.min(section.free_taps());
        *section = section.delayed(shift);
        delay -= shift;
    }
    while delay > 0 {
        let shift = delay.min(2);
        sections.push(Sos::from_zpk([ORIGIN; 2], [ORIGIN; 2], 1.0).delayed(shift));
        delay -= shift;
    }
    sections
}

/// Multiply a cascade back into a single transfer function.
pub fn sos_to_tf(sections: &[Sos]) -> Result<TransferFunction, ExecInvariantViolation> {
    let (head, tail) = sections
        .split_first()
        .ok_or(ExecInvariantViolation::InvalidState {
            reason: "cascade requires at least one section",
        })?;
    let mut b = head.b.to_vec();
    let mut a = head.a.to_vec();
    let mut zeros = head.zeros.to_vec();
    let mut poles = head.poles.to_vec();
    let mut gain = head.gain;
    let mut delay = head.delay;
    for section in tail {
        b = polymul(&b, &section.b)?;
        a = polymul(&a, &section.a)?;
        zeros.extend_from_slice(&section.zeros);
        poles.extend_from_slice(&section.poles);
        gain *= section.gain;
        delay += section.delay;
    }
    Ok(TransferFunction::from_raw_parts(
        zeros,
        poles,
        gain,
        delay,
        trim_trailing_zeros(b),
        trim_trailing_zeros(a),
    ))
}

/// Constructor config for [`ZpkToSosKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZpkToSosConfig {
    /// Tolerance on real and imaginary parts when matching conjugate pairs.
    pub tolerance: f64,
}

impl Default for ZpkToSosConfig {
    fn default() -> Self {
        Self {
            tolerance: CONJUGATE_TOLERANCE,
        }
    }
}

/// Section decomposition kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZpkToSosKernel {
    tolerance: f64,
}

impl KernelLifecycle for ZpkToSosKernel {
    type Config = ZpkToSosConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "tolerance",
                reason: "tolerance must be finite and positive",
            });
        }
        Ok(Self {
            tolerance: config.tolerance,
        })
    }
}

impl ZpkToSosDesign<f64> for ZpkToSosKernel {
    fn run_alloc(&self, tf: &TransferFunction) -> Result<Vec<Sos>, ExecInvariantViolation> {
        let sections =
            zpk_to_sos_with_tolerance(tf.zeros(), tf.poles(), tf.gain(), self.tolerance)?;
        Ok(spread_delay(sections, tf.delay()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{build_bandpass, build_bandstop, build_lowpass, prototype::*};
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    fn assert_cascade_matches(tf: &TransferFunction) {
        let sections = tf_to_sos(tf).expect("sos");
        let back = sos_to_tf(&sections).expect("tf");
        assert_eq!(back.numerator().len(), tf.numerator().len());
        assert_eq!(back.denominator().len(), tf.denominator().len());
        let scale = tf.numerator().iter().fold(0.0f64, |m, x| m.max(x.abs()));
        for (x, y) in back.numerator().iter().zip(tf.numerator()) {
            assert!((x - y).abs() <= 1e-4 * scale, "{x} vs {y}");
        }
        let scale = tf.denominator().iter().fold(0.0f64, |m, x| m.max(x.abs()));
        for (x, y) in back.denominator().iter().zip(tf.denominator()) {
            assert!((x - y).abs() <= 1e-4 * scale, "{x} vs {y}");
        }
    }

    #[test]
    fn cascade_reproduces_designed_filters() {
        let cheby2_zeros = chebyshev2_zeros(3);
        let tfs = [
            build_lowpass(0.15, &butterworth_poles(4), None),
            build_lowpass(0.2, &chebyshev1_poles(5, 0.5), None),
            build_bandpass(0.1, 0.2, &butterworth_poles(3), None),
            build_bandstop(0.05, 0.3, &chebyshev2_poles(3, 30.0), Some(&cheby2_zeros)),
        ];
        for tf in tfs {
            assert_cascade_matches(&tf.expect("design"));
        }
    }

    #[test]
    fn gain_sits_on_first_section_and_resonance_last() {
        let tf = build_lowpass(0.1, &butterworth_poles(6), None).expect("lowpass");
        let sections = tf.to_sos().expect("sos");
        assert_eq!(sections.len(), 3);
        assert_relative_eq!(sections[0].gain(), tf.gain());
        assert!(sections[1..].iter().all(|s| s.gain() == 1.0 && s.b()[0] == 1.0));

        let distance = |s: &Sos| (s.poles()[0].norm() - 1.0).abs();
        for pair in sections.windows(2) {
            assert!(distance(&pair[1]) <= distance(&pair[0]));
        }
    }

    #[test]
    fn odd_order_is_padded_with_origin() {
        let poles = [c(0.5, 0.0), c(0.2, 0.3), c(0.2, -0.3)];
        let sections = zpk_to_sos(&[c(-1.0, 0.0)], &poles, 2.0).expect("sos");
        assert_eq!(sections.len(), 2);
        // |0.5| is closer to the unit circle than |0.2 ± 0.3j|
        assert_eq!(sections[1].poles()[0], c(0.5, 0.0));
        assert_eq!(sections[1].a(), &[1.0, -0.5, 0.0]);
        assert_eq!(sections[0].poles(), &[c(0.2, 0.3), c(0.2, -0.3)]);
        assert_eq!(sections[0].gain(), 2.0);
    }

    #[test]
    fn gain_only_transfer_function() {
        let sections = zpk_to_sos(&[], &[], 0.5).expect("sos");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].b(), &[0.5, 0.0, 0.0]);
        assert_eq!(sections[0].a(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn unpaired_complex_value_is_fatal() {
        let err = zpk_to_sos(&[], &[c(0.5, 0.5), c(0.5, 0.4)], 1.0).expect_err("unpaired");
        assert_eq!(
            err,
            ExecInvariantViolation::InvalidState {
                reason: "complex value has no conjugate partner"
            }
        );
    }

    #[test]
    fn tie_break_follows_input_order() {
        let sections = zpk_to_sos(
            &[c(0.1, 0.0), c(0.2, 0.0), c(0.3, 0.0), c(0.4, 0.0)],
            &[c(0.5, 0.0), c(-0.5, 0.0), c(0.9, 0.0), c(-0.9, 0.0)],
            1.0,
        )
        .expect("sos");
        assert_eq!(sections[1].poles(), &[c(0.9, 0.0), c(-0.9, 0.0)]);
        assert_eq!(sections[0].poles(), &[c(0.5, 0.0), c(-0.5, 0.0)]);
    }

    #[test]
    fn coefficient_sections_recover_roots() {
        let s = Sos::from_coefficients([2.0, 0.0, -2.0], [2.0, -1.0, 0.5]).expect("section");
        assert_eq!(s.b(), &[1.0, 0.0, -1.0]);
        assert_eq!(s.gain(), 1.0);
        let mut zr: Vec<f64> = s.zeros().iter().map(|z| z.re).collect();
        zr.sort_by(f64::total_cmp);
        assert_eq!(zr, vec![-1.0, 1.0]);
        assert_eq!(s.poles()[0], s.poles()[1].conj());
        assert!(Sos::from_coefficients([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]).is_err());
    }

    #[test]
    fn delayed_sections() {
        let s = Sos::from_coefficients([0.0, 1.0, 0.5], [1.0, -0.3, 0.0]).expect("section");
        assert_eq!(s.delay(), 1);
        assert_eq!(s.gain(), 1.0);
        assert!(s.zeros().contains(&c(-0.5, 0.0)));
        assert!(Sos::from_coefficients([0.0; 3], [1.0, 0.0, 0.0]).is_err());

        // z^-3, more delay than one section can hold
        let tf = TransferFunction::from_coefficients(&[0.0, 0.0, 0.0, 1.0], &[1.0])
            .expect("pure delay");
        let sections = tf.to_sos().expect("sos");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].b(), &[0.0, 0.0, 1.0]);
        assert_eq!(sections[1].b(), &[0.0, 1.0, 0.0]);
        let rebuilt = sos_to_tf(&sections).expect("cascade");
        assert_eq!(rebuilt.delay(), 3);
        assert_eq!(rebuilt.numerator(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn kernel_rejects_bad_tolerance() {
        let err = ZpkToSosKernel::try_new(ZpkToSosConfig { tolerance: 0.0 })
            .expect_err("zero tolerance");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "tolerance", .. }));
        let kernel = ZpkToSosKernel::try_new(ZpkToSosConfig::default())
            .expect("sos kernel should initialize");
        let tf = build_lowpass(0.2, &butterworth_poles(2), None).expect("lowpass");
        assert_eq!(kernel.run_alloc(&tf).expect("sos").len(), 1);
    }
}
