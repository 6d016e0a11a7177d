//! Windowed-sinc FIR design and kernel band conversions.

use core::f64::consts::PI;

use super::iir::{check_passband, validate_cutoff};
use super::FilterBandType;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::filter::evaluate_fir;
use crate::signal::traits::FirWinDesign;
use crate::signal::windows::Window;
use crate::special::sinc;

/// Smallest reference-frequency response a kernel can be normalized against.
const MIN_REFERENCE_GAIN: f64 = 1e-12;

/// Constructor config for [`FirWinKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FirWinConfig {
    /// Number of filter taps.
    pub numtaps: usize,
    /// Band type, or `None` for an allpass (pure, possibly fractional, delay).
    pub band: Option<FilterBandType>,
    /// Normalized cutoff(s) in cycles/sample: one for lowpass/highpass, two
    /// ascending edges for bandpass/bandstop, none for allpass.
    pub cutoff: Vec<f64>,
    /// Offset of the kernel center from tap `(numtaps - 1) / 2` (integer
    /// division). Defaults to `0` for odd and `0.5` for even `numtaps`, which
    /// gives linear phase.
    pub delay: Option<f64>,
    /// Taper applied to the ideal response.
    pub window: Window,
}

impl FirWinConfig {
    /// Linear-phase config with the default window.
    pub fn new(numtaps: usize, band: Option<FilterBandType>, cutoff: Vec<f64>) -> Self {
        Self {
            numtaps,
            band,
            cutoff,
            delay: None,
            window: Window::default(),
        }
    }
}

/// Windowed-sinc FIR design kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct FirWinKernel {
    numtaps: usize,
    band: Option<FilterBandType>,
    cutoff: Vec<f64>,
    delay: f64,
    window: Window,
}

impl KernelLifecycle for FirWinKernel {
    type Config = FirWinConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.numtaps == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "numtaps",
                reason: "numtaps must be greater than zero",
            });
        }
        let expected = config.band.map_or(0, |band| band.cutoff_count());
        if config.cutoff.len() != expected {
            return Err(ConfigError::LengthMismatch {
                arg: "cutoff",
                expected,
                got: config.cutoff.len(),
            });
        }
        for f in &config.cutoff {
            validate_cutoff(*f, "cutoff")?;
        }
        if config.cutoff.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::InvalidArgument {
                arg: "cutoff",
                reason: "cutoff frequencies must be strictly increasing",
            });
        }
        if let Some(band) = config.band {
            check_passband(band, &config.cutoff)?;
        }
        let delay = match config.delay {
            Some(d) if !d.is_finite() => {
                return Err(ConfigError::InvalidArgument {
                    arg: "delay",
                    reason: "delay must be finite",
                })
            }
            Some(d) => d,
            None if config.numtaps % 2 == 0 => 0.5,
            None => 0.0,
        };
        if matches!(
            config.band,
            Some(FilterBandType::Highpass | FilterBandType::Bandstop)
        ) && config.numtaps % 2 == 0
            && config.delay.is_none()
        {
            return Err(ConfigError::InvalidArgument {
                arg: "numtaps",
                reason: "linear-phase highpass and bandstop kernels need an odd number of taps",
            });
        }
        Ok(Self {
            numtaps: config.numtaps,
            band: config.band,
            cutoff: config.cutoff,
            delay,
            window: config.window,
        })
    }
}

impl FirWinKernel {
    fn ideal_tap(&self, x: f64) -> f64 {
        let lowpass = |f: f64| 2.0 * f * sinc(2.0 * f * x);
        match (self.band, self.cutoff.as_slice()) {
            (Some(FilterBandType::Lowpass), [f]) => lowpass(*f),
            (Some(FilterBandType::Highpass), [f]) => sinc(x) - lowpass(*f),
            (Some(FilterBandType::Bandpass), [f1, f2]) => lowpass(*f2) - lowpass(*f1),
            (Some(FilterBandType::Bandstop), [f1, f2]) => sinc(x) - (lowpass(*f2) - lowpass(*f1)),
            _ => sinc(x),
        }
    }

    /// Angular frequency where the designed response must have unit gain.
    /// A bandstop starting at DC is a highpass and is referenced at Nyquist.
    fn reference_frequency(&self) -> f64 {
        match (self.band, self.cutoff.as_slice()) {
            (Some(FilterBandType::Highpass), _) => PI,
            (Some(FilterBandType::Bandpass), [f1, f2]) => PI * (f1 + f2),
            (Some(FilterBandType::Bandstop), [f1, _]) if *f1 == 0.0 => PI,
            _ => 0.0,
        }
    }
}

impl FirWinDesign<f64> for FirWinKernel {
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
        let center = ((self.numtaps - 1) / 2) as f64 + self.delay;
        let mut kernel: Vec<f64> = (0..self.numtaps)
            .map(|i| self.ideal_tap(i as f64 - center))
            .collect();
        self.window.apply(&mut kernel);

        let gain = evaluate_fir(&kernel, self.reference_frequency()).norm();
        if gain < MIN_REFERENCE_GAIN {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "kernel response vanishes at the normalization frequency",
            });
        }
        kernel.iter_mut().for_each(|k| *k /= gain);
        Ok(kernel)
    }
}

/// Windowed-sinc design with the default delay, see [`FirWinKernel`].
pub fn firwin(
    numtaps: usize,
    band: FilterBandType,
    cutoff: &[f64],
    window: Window,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    let kernel = FirWinKernel::try_new(FirWinConfig {
        window,
        ..FirWinConfig::new(numtaps, Some(band), cutoff.to_vec())
    })?;
    kernel.run_alloc()
}

/// Windowed fractional-delay allpass, delaying by `(numtaps - 1) / 2 + delay`
/// samples (integer division).
pub fn fractional_delay(
    numtaps: usize,
    delay: f64,
    window: Window,
) -> Result<Vec<f64>, ExecInvariantViolation> {
    let kernel = FirWinKernel::try_new(FirWinConfig {
        numtaps,
        band: None,
        cutoff: Vec::new(),
        delay: Some(delay),
        window,
    })?;
    kernel.run_alloc()
}

/// Spectral inversion `δ[n - center] - h[n]` of an odd-length kernel.
fn spectral_inversion(kernel: &[f64]) -> Result<Vec<f64>, ConfigError> {
    if kernel.is_empty() {
        return Err(ConfigError::EmptyInput { arg: "kernel" });
    }
    if kernel.len() % 2 == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "kernel",
            reason: "band conversion needs an odd-length kernel",
        });
    }
    let mut inverted: Vec<f64> = kernel.iter().map(|k| -k).collect();
    inverted[kernel.len() / 2] += 1.0;
    Ok(inverted)
}

/// Turn a lowpass kernel into the complementary highpass.
pub fn lowpass_to_highpass(kernel: &[f64]) -> Result<Vec<f64>, ConfigError> {
    spectral_inversion(kernel)
}

/// Turn a highpass kernel into the complementary lowpass.
pub fn highpass_to_lowpass(kernel: &[f64]) -> Result<Vec<f64>, ConfigError> {
    spectral_inversion(kernel)
}

/// Turn a bandpass kernel into the complementary bandstop.
pub fn bandpass_to_bandstop(kernel: &[f64]) -> Result<Vec<f64>, ConfigError> {
    spectral_inversion(kernel)
}

/// Turn a bandstop kernel into the complementary bandpass.
pub fn bandstop_to_bandpass(kernel: &[f64]) -> Result<Vec<f64>, ConfigError> {
    spectral_inversion(kernel)
}
