//! Equiripple FIR design through the Parks-McClellan collaborator.
//!
//! This module only assembles the band edges, desired gains and weights; the
//! exchange iteration itself lives in `pm_remez`.

use log::warn;
use pm_remez::{Band, PMParameters, ParametersBuilder};

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::traits::FirWinDesign;

/// Constructor config for [`EquirippleKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct EquirippleConfig {
    /// Number of filter taps.
    pub numtaps: usize,
    /// Band edges as `[lo0, hi0, lo1, hi1, ...]`, normalized to `[0, 0.5]`.
    pub band_edges: Vec<f64>,
    /// Desired gain per band.
    pub desired: Vec<f64>,
    /// Error weight per band.
    pub weights: Vec<f64>,
}

/// Equiripple FIR design kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct EquirippleKernel {
    numtaps: usize,
    band_edges: Vec<f64>,
    desired: Vec<f64>,
    weights: Vec<f64>,
}

impl KernelLifecycle for EquirippleKernel {
    type Config = EquirippleConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.numtaps < 3 {
            return Err(ConfigError::InvalidArgument {
                arg: "numtaps",
                reason: "equiripple design needs at least 3 taps",
            });
        }
        if config.desired.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "desired" });
        }
        if config.band_edges.len() != 2 * config.desired.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "band_edges",
                expected: 2 * config.desired.len(),
                got: config.band_edges.len(),
            });
        }
        if config.weights.len() != config.desired.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "weights",
                expected: config.desired.len(),
                got: config.weights.len(),
            });
        }
        if config.band_edges.iter().any(|f| !(0.0..=0.5).contains(f)) {
            return Err(ConfigError::InvalidArgument {
                arg: "band_edges",
                reason: "band edges must lie in [0, 0.5]",
            });
        }
        if config.band_edges.windows(2).any(|pair| pair[0] > pair[1])
            || config.band_edges.chunks_exact(2).any(|band| band[0] >= band[1])
        {
            return Err(ConfigError::InvalidArgument {
                arg: "band_edges",
                reason: "bands must be non-empty and in ascending order",
            });
        }
        if config.weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "weights",
                reason: "weights must be finite and positive",
            });
        }
        if config.desired.iter().any(|d| !d.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg: "desired",
                reason: "desired gains must be finite",
            });
        }
        Ok(Self {
            numtaps: config.numtaps,
            band_edges: config.band_edges,
            desired: config.desired,
            weights: config.weights,
        })
    }
}

/// Index of the band that holds `f`, or the nearest one.
fn band_of(edges: &[f64], f: f64) -> usize {
    edges
        .chunks_exact(2)
        .map(|band| {
            if f < band[0] {
                band[0] - f
            } else if f > band[1] {
                f - band[1]
            } else {
                0.0
            }
        })
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i)
}

fn remez_failure(err: impl core::fmt::Display) -> ExecInvariantViolation {
    warn!("equiripple design failed: {err}");
    ExecInvariantViolation::Core(fbank_core::Error::ExecInvariantViolation {
        reason: err.to_string(),
    })
}

impl FirWinDesign<f64> for EquirippleKernel {
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<f64> + ?Sized,
    {
        let coeffs = self.run_alloc()?;
        let out_slice = out
            .write_slice_mut()
            .map_err(ExecInvariantViolation::from)?;
        if out_slice.len() != coeffs.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: coeffs.len(),
                got: out_slice.len(),
            });
        }
        out_slice.copy_from_slice(&coeffs);
        Ok(())
    }

    fn run_alloc(&self) -> Result<Vec<f64>, ExecInvariantViolation> {
        let bands = self
            .band_edges
            .chunks_exact(2)
            .map(|band| Band::new(band[0], band[1]))
            .collect::<Result<Vec<_>, _>>()
            .map_err(remez_failure)?;

        let (edges, desired) = (self.band_edges.clone(), self.desired.clone());
        let (weight_edges, weights) = (self.band_edges.clone(), self.weights.clone());
        let mut parameters = PMParameters::new(
            self.numtaps,
            bands,
            move |f: f64| desired[band_of(&edges, f)],
            move |f: f64| weights[band_of(&weight_edges, f)],
        )
        .map_err(remez_failure)?;
        parameters.set_symmetry(pm_remez::Symmetry::Even);

        let design = pm_remez::pm_remez(&parameters).map_err(remez_failure)?;
        Ok(design.impulse_response)
    }
}

/// Multiband equiripple design, see [`EquirippleConfig`].
pub fn remez(
    numtaps: usize,
    band_edges: &[f64],
    desired: &[f64],
    weights: &[f64],
) -> Result<Vec<f64>, ExecInvariantViolation> {
    EquirippleKernel::try_new(EquirippleConfig {
        numtaps,
        band_edges: band_edges.to_vec(),
        desired: desired.to_vec(),
        weights: weights.to_vec(),
    })?
    .run_alloc()
}

/// Passband and stopband deviations for ripple specs in dB.
///
/// The passband ripple is peak-to-peak, the stopband figure an attenuation.
pub fn ripple_deviations(passband_ripple_db: f64, stopband_attenuation_db: f64) -> (f64, f64) {
    let p = 10f64.powf(passband_ripple_db / 20.0);
    ((p - 1.0) / (p + 1.0), 10f64.powf(-stopband_attenuation_db / 20.0))
}

/// Weights `[pass, stop]` that balance the two deviations.
fn band_weights(ripple_db: f64, attenuation_db: f64) -> Result<(f64, f64), ConfigError> {
    if !(ripple_db > 0.0 && attenuation_db > 0.0) {
        return Err(ConfigError::InvalidArgument {
            arg: "ripple_db",
            reason: "ripple and attenuation must be positive",
        });
    }
    let (dp, ds) = ripple_deviations(ripple_db, attenuation_db);
    Ok((1.0, dp / ds))
}

fn require_odd(numtaps: usize) -> Result<(), ConfigError> {
    if numtaps % 2 == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "numtaps",
            reason: "even-symmetric designs with gain at Nyquist need an odd number of taps",
        });
    }
    Ok(())
}

/// Equiripple lowpass passing `[0, pass_end]` and stopping `[stop_start, 0.5]`.
pub fn remez_lowpass(
    numtaps: usize,
    pass_end: f64,
    stop_start: f64,
    ripple_db: f64,
    attenuation_db: f64,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    let (wp, ws) = band_weights(ripple_db, attenuation_db)?;
    remez(numtaps, &[0.0, pass_end, stop_start, 0.5], &[1.0, 0.0], &[wp, ws])
}

/// Equiripple highpass stopping `[0, stop_end]` and passing `[pass_start, 0.5]`.
pub fn remez_highpass(
    numtaps: usize,
    stop_end: f64,
    pass_start: f64,
    ripple_db: f64,
    attenuation_db: f64,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    require_odd(numtaps)?;
    let (wp, ws) = band_weights(ripple_db, attenuation_db)?;
    remez(numtaps, &[0.0, stop_end, pass_start, 0.5], &[0.0, 1.0], &[ws, wp])
}

/// Equiripple bandpass passing `[pass_start, pass_end]`.
pub fn remez_bandpass(
    numtaps: usize,
    edges: [f64; 4],
    ripple_db: f64,
    attenuation_db: f64,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    let [stop1_end, pass_start, pass_end, stop2_start] = edges;
    let (wp, ws) = band_weights(ripple_db, attenuation_db)?;
    remez(
        numtaps,
        &[0.0, stop1_end, pass_start, pass_end, stop2_start, 0.5],
        &[0.0, 1.0, 0.0],
        &[ws, wp, ws],
    )
}

/// Equiripple bandstop stopping `[stop_start, stop_end]`.
pub fn remez_bandstop(
    numtaps: usize,
    edges: [f64; 4],
    ripple_db: f64,
    attenuation_db: f64,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    require_odd(numtaps)?;
    let [pass1_end, stop_start, stop_end, pass2_start] = edges;
    let (wp, ws) = band_weights(ripple_db, attenuation_db)?;
    remez(
        numtaps,
        &[0.0, pass1_end, stop_start, stop_end, pass2_start, 0.5],
        &[1.0, 0.0, 1.0],
        &[wp, ws, wp],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::evaluate_fir;
    use approx::assert_abs_diff_eq;
    use core::f64::consts::PI;

    fn gain(kernel: &[f64], f: f64) -> f64 {
        evaluate_fir(kernel, 2.0 * PI * f).norm()
    }

    #[test]
    fn lowpass_meets_its_bands() {
        let h = remez_lowpass(45, 0.2, 0.3, 0.5, 40.0).expect("remez");
        assert_eq!(h.len(), 45);
        for i in 0..45 {
            assert_abs_diff_eq!(h[i], h[44 - i], epsilon = 1e-9);
        }
        for f in [0.0, 0.1, 0.2] {
            assert_abs_diff_eq!(gain(&h, f), 1.0, epsilon = 0.05);
        }
        for f in [0.3, 0.4, 0.5] {
            assert!(gain(&h, f) < 0.02);
        }
    }

    #[test]
    fn bandpass_meets_its_bands() {
        let h = remez_bandpass(61, [0.1, 0.15, 0.3, 0.35], 1.0, 30.0).expect("remez");
        assert_abs_diff_eq!(gain(&h, 0.225), 1.0, epsilon = 0.1);
        assert!(gain(&h, 0.0) < 0.05);
        assert!(gain(&h, 0.45) < 0.05);
    }

    #[test]
    fn deviations_from_decibels() {
        let (dp, ds) = ripple_deviations(1.0, 40.0);
        assert_abs_diff_eq!(dp, 0.057_501_127_785, epsilon = 1e-9);
        assert_abs_diff_eq!(ds, 0.01, epsilon = 1e-15);
    }

    #[test]
    fn invalid_configs_fail_fast() {
        let err = EquirippleKernel::try_new(EquirippleConfig {
            numtaps: 31,
            band_edges: vec![0.0, 0.2, 0.3],
            desired: vec![1.0, 0.0],
            weights: vec![1.0, 1.0],
        })
        .expect_err("odd edge count");
        assert_eq!(
            err,
            ConfigError::LengthMismatch {
                arg: "band_edges",
                expected: 4,
                got: 3
            }
        );
        let err = EquirippleKernel::try_new(EquirippleConfig {
            numtaps: 31,
            band_edges: vec![0.0, 0.3, 0.2, 0.5],
            desired: vec![1.0, 0.0],
            weights: vec![1.0, 1.0],
        })
        .expect_err("overlapping bands");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "band_edges", .. }));
        assert!(remez(31, &[0.0, 0.2, 0.3, 0.5], &[1.0, 0.0], &[1.0, -1.0]).is_err());
        assert!(remez_highpass(30, 0.2, 0.3, 1.0, 40.0).is_err());
        assert!(remez_bandstop(30, [0.1, 0.15, 0.3, 0.35], 1.0, 40.0).is_err());
    }

    #[test]
    fn band_lookup_prefers_containing_band() {
        let edges = [0.0, 0.2, 0.3, 0.5];
        assert_eq!(band_of(&edges, 0.1), 0);
        assert_eq!(band_of(&edges, 0.4), 1);
        assert_eq!(band_of(&edges, 0.26), 1);
        assert_eq!(band_of(&edges, 0.22), 0);
    }
}
