//! Frequency warping between the analog (s) and digital (z) planes.
//!
//! The bilinear transform `z = (1 + s) / (1 - s)` maps the left half s-plane
//! into the unit disk. Cutoffs are pre-warped with `tan(π·f)` first so the
//! digital response hits the requested normalized frequency exactly.

use core::f64::consts::PI;

use crate::kernel::ConfigError;
use nalgebra::Complex;

/// Pre-warp a normalized frequency (cycles/sample) to its analog image.
pub fn prewarp(frequency: f64) -> f64 {
    (PI * frequency).tan()
}

/// Bilinear transform of one analog value.
pub fn bilinear(s: Complex<f64>) -> Complex<f64> {
    let den = (1.0 - s.re) * (1.0 - s.re) + s.im * s.im;
    Complex::new((1.0 - s.re * s.re - s.im * s.im) / den, 2.0 * s.im / den)
}

/// Inverse bilinear transform `s = (z - 1) / (z + 1)`.
pub fn inverse_bilinear(z: Complex<f64>) -> Complex<f64> {
    (z - 1.0) / (z + 1.0)
}

/// Apply [`bilinear`] to every value in place.
pub fn bilinear_in_place(values: &mut [Complex<f64>]) {
    values.iter_mut().for_each(|v| *v = bilinear(*v));
}

/// Apply [`bilinear`] to values stored as parallel real/imaginary sequences.
pub fn bilinear_parts(re: &mut [f64], im: &mut [f64]) -> Result<(), ConfigError> {
    if re.len() != im.len() {
        return Err(ConfigError::LengthMismatch {
            arg: "im",
            expected: re.len(),
            got: im.len(),
        });
    }
    for (r, i) in re.iter_mut().zip(im.iter_mut()) {
        let z = bilinear(Complex::new(*r, *i));
        *r = z.re;
        *i = z.im;
    }
    Ok(())
}
