//! Kernelized window generation.

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::traits::WindowGenerate;

use super::Window;

/// Constructor config for [`WindowKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    /// Window family and parameters.
    pub window: Window,
    /// Output length.
    pub len: usize,
    /// Symmetric (`true`, filter design) or periodic (`false`, spectral analysis).
    pub sym: bool,
}

/// Window generation kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowKernel {
    window: Window,
    len: usize,
    sym: bool,
}

impl KernelLifecycle for WindowKernel {
    type Config = WindowConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.len == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "len",
                reason: "window length must be greater than 0",
            });
        }
        match &config.window {
            Window::GeneralCosine { weights } if weights.is_empty() => {
                return Err(ConfigError::EmptyInput { arg: "weights" });
            }
            Window::Kaiser { beta } if !beta.is_finite() || *beta < 0.0 => {
                return Err(ConfigError::InvalidArgument {
                    arg: "beta",
                    reason: "kaiser beta must be finite and non-negative",
                });
            }
            _ => {}
        }
        Ok(Self {
            window: config.window,
            len: config.len,
            sym: config.sym,
        })
    }
}

impl WindowGenerate<f64> for WindowKernel {
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<f64> + ?Sized,
    {
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        if out.len() != self.len {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: self.len,
                got: out.len(),
            });
        }
        out.copy_from_slice(&self.window.build(self.len, self.sym));
        Ok(())
    }

    fn run_alloc(&self) -> Result<Vec<f64>, ExecInvariantViolation> {
        Ok(self.window.build(self.len, self.sym))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_kernel_run_into_matches_alloc() {
        let kernel = WindowKernel::try_new(WindowConfig {
            window: Window::Nuttall,
            len: 16,
            sym: true,
        })
        .expect("window kernel should initialize");
        let mut out = vec![0.0; 16];
        kernel.run_into(out.as_mut_slice()).expect("run_into");
        assert_eq!(out, kernel.run_alloc().expect("run_alloc"));
    }

    #[test]
    fn window_kernel_rejects_bad_config() {
        let err = WindowKernel::try_new(WindowConfig {
            window: Window::GeneralCosine { weights: vec![] },
            len: 8,
            sym: true,
        })
        .expect_err("empty weights should fail");
        assert_eq!(err, ConfigError::EmptyInput { arg: "weights" });

        let err = WindowKernel::try_new(WindowConfig {
            window: Window::Kaiser { beta: -1.0 },
            len: 8,
            sym: true,
        })
        .expect_err("negative beta should fail");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "beta", .. }));
    }

    #[test]
    fn window_kernel_checks_output_length() {
        let kernel = WindowKernel::try_new(WindowConfig {
            window: Window::Hann,
            len: 8,
            sym: false,
        })
        .expect("window kernel should initialize");
        let mut out = vec![0.0; 7];
        let err = kernel.run_into(out.as_mut_slice()).expect_err("short output");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { .. }));
    }
}
