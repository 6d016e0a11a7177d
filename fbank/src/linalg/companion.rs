use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D};
use nalgebra::DMatrix;

/// Companion-matrix construction capability.
pub trait CompanionBuild1D<T> {
    /// Output matrix type.
    type Output;

    /// Build companion matrix from polynomial coefficients, highest power first.
    fn run<I>(&self, input: &I) -> Result<Self::Output, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Constructor config for [`CompanionKernel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanionConfig {
    /// Optional expected coefficient length.
    pub expected_len: Option<usize>,
}

/// Companion-matrix kernel. The eigenvalues of the output are the roots of
/// the input polynomial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanionKernel {
    expected_len: Option<usize>,
}

impl KernelLifecycle for CompanionKernel {
    type Config = CompanionConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if matches!(config.expected_len, Some(len) if len < 2) {
            return Err(ConfigError::InvalidArgument {
                arg: "expected_len",
                reason: "companion requires at least 2 coefficients",
            });
        }
        Ok(Self {
            expected_len: config.expected_len,
        })
    }
}

impl CompanionBuild1D<f64> for CompanionKernel {
    type Output = DMatrix<f64>;

    fn run<I>(&self, input: &I) -> Result<Self::Output, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let coeffs = input.read_slice().map_err(ExecInvariantViolation::from)?;
        if coeffs.len() < 2 {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "companion requires at least 2 coefficients",
            });
        }
        if let Some(expected_len) = self.expected_len {
            if coeffs.len() != expected_len {
                return Err(ExecInvariantViolation::LengthMismatch {
                    arg: "coeffs",
                    expected: expected_len,
                    got: coeffs.len(),
                });
            }
        }
        if coeffs[0] == 0.0 {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "leading coefficient must be non-zero",
            });
        }
        Ok(companion_from_slice(coeffs))
    }
}

fn companion_from_slice(coeffs: &[f64]) -> DMatrix<f64> {
    let m = coeffs.len() - 1;
    let a0 = coeffs[0];
    let mut matrix = DMatrix::<f64>::zeros(m, m);
    for (j, a) in coeffs.iter().skip(1).enumerate() {
        matrix[(0, j)] = -a / a0;
    }
    for i in 1..m {
        matrix[(i, i - 1)] = 1.0;
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;

    #[test]
    fn scipy_example() {
        let kernel = CompanionKernel::try_new(CompanionConfig::default())
            .expect("kernel should initialize");
        let matrix = kernel
            .run(&[1.0, -10.0, 31.0, -30.0])
            .expect("kernel should run");

        let expected = dmatrix![
            10., -31., 30.;
            1., 0., 0.;
            0., 1., 0.;
        ];
        assert_eq!(expected, matrix);
    }

    #[test]
    fn companion_kernel_validates() {
        let bad_len = CompanionKernel::try_new(CompanionConfig {
            expected_len: Some(1),
        })
        .expect_err("short expected_len should fail");
        assert_eq!(
            bad_len,
            ConfigError::InvalidArgument {
                arg: "expected_len",
                reason: "companion requires at least 2 coefficients",
            }
        );

        let kernel = CompanionKernel::try_new(CompanionConfig {
            expected_len: Some(3),
        })
        .expect("kernel should initialize");
        let err = kernel.run(&[1.0, 2.0]).expect_err("length mismatch");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { .. }));
        let err = kernel.run(&[0.0, 1.0, 2.0]).expect_err("zero leading coefficient");
        assert!(matches!(err, ExecInvariantViolation::InvalidState { .. }));
    }
}
