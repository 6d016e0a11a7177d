//! Special functions used by window and kernel design.

use core::f64::consts::PI;

/// Normalized sinc, `sin(πx)/(πx)`, with the removable singularity at `x = 0`
/// replaced by its limit.
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Modified Bessel function of the first kind, order zero.
///
/// Power series `Σ ((x/2)^k / k!)^2`, summed until terms fall below machine
/// precision relative to the running total.
pub fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    loop {
        term *= half / k;
        let sq = term * term;
        sum += sq;
        if sq < sum * f64::EPSILON {
            break;
        }
        k += 1.0;
    }
    sum
}
