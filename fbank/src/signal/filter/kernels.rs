//! Trait-first kernel wrappers for running designed filters.

use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D};
use crate::signal::traits::{LFilter1D, SosFilt1D};

use super::design::{DigitalFilter, Sos};
use super::{lfilter, sosfilt};

fn copy_out<O>(y: &[f64], out: &mut O) -> Result<(), ExecInvariantViolation>
where
    O: Write1D<f64> + ?Sized,
{
    let out_slice = out
        .write_slice_mut()
        .map_err(ExecInvariantViolation::from)?;
    if out_slice.len() != y.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "out",
            expected: y.len(),
            got: out_slice.len(),
        });
    }
    out_slice.copy_from_slice(y);
    Ok(())
}

/// Constructor config for [`SosFiltKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SosFiltConfig {
    /// Sections applied in order.
    pub sos: Vec<Sos>,
}

/// 1D `sosfilt` kernel. Every call starts from rest.
#[derive(Debug, Clone, PartialEq)]
pub struct SosFiltKernel {
    sos: Vec<Sos>,
}

impl KernelLifecycle for SosFiltKernel {
    type Config = SosFiltConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.sos.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "sos" });
        }
        Ok(Self { sos: config.sos })
    }
}

impl SosFilt1D<f64> for SosFiltKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let y = self.run_alloc(input)?;
        copy_out(&y, out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<f64>, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        Ok(sosfilt(&self.sos, input))
    }
}

/// Constructor config for [`LFilterKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct LFilterConfig {
    /// Numerator coefficients.
    pub b: Vec<f64>,
    /// Denominator coefficients.
    pub a: Vec<f64>,
}

/// 1D `lfilter` kernel over `b / a` coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct LFilterKernel {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl KernelLifecycle for LFilterKernel {
    type Config = LFilterConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.b.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "b" });
        }
        if config.a.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "a" });
        }
        if config.a[0] == 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "a",
                reason: "leading denominator coefficient must be non-zero",
            });
        }
        Ok(Self {
            b: config.b,
            a: config.a,
        })
    }
}

impl LFilter1D<f64> for LFilterKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
        O: Write1D<f64> + ?Sized,
    {
        let y = self.run_alloc(input)?;
        copy_out(&y, out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<f64>, ExecInvariantViolation>
    where
        I: Read1D<f64> + ?Sized,
    {
        let input = input.read_slice().map_err(ExecInvariantViolation::from)?;
        lfilter(&self.b, &self.a, input)
    }
}

impl DigitalFilter {
    /// Run `x` through the filter in whichever representation it carries.
    pub fn apply(&self, x: &[f64]) -> Result<Vec<f64>, ExecInvariantViolation> {
        match self {
            DigitalFilter::Tf(tf) => lfilter(tf.numerator(), tf.denominator(), x),
            DigitalFilter::Ba(ba) => lfilter(&ba.b, &ba.a, x),
            DigitalFilter::Zpk(zpk) => {
                let tf = super::design::TransferFunction::from_zpk(
                    zpk.z.clone(),
                    zpk.p.clone(),
                    zpk.k,
                )?;
                lfilter(tf.numerator(), tf.denominator(), x)
            }
            DigitalFilter::Sos(sos) => Ok(sosfilt(sos, x)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::design::{butter, FilterBandType, FilterOutputType};
    use approx::assert_abs_diff_eq;

    #[test]
    fn sosfilt_kernel_matches_function() {
        let section = Sos::from_coefficients([0.5, 0.5, 0.0], [1.0, -0.2, 0.0]).expect("section");
        let kernel = SosFiltKernel::try_new(SosFiltConfig { sos: vec![section] })
            .expect("kernel should initialize");
        let x = [1.0f64, 2.0, 3.0, 4.0];
        let mut y = [0.0f64; 4];
        kernel.run_into(&x, &mut y).expect("sosfilt kernel should run");
        assert_eq!(y.to_vec(), sosfilt(&[section], &x));

        let mut short = [0.0f64; 3];
        assert!(matches!(
            kernel.run_into(&x, &mut short),
            Err(ExecInvariantViolation::LengthMismatch { arg: "out", .. })
        ));
    }

    #[test]
    fn kernel_configs_validate() {
        assert_eq!(
            SosFiltKernel::try_new(SosFiltConfig { sos: vec![] }).expect_err("empty"),
            ConfigError::EmptyInput { arg: "sos" }
        );
        assert!(LFilterKernel::try_new(LFilterConfig {
            b: vec![1.0],
            a: vec![0.0, 1.0],
        })
        .is_err());
    }

    #[test]
    fn every_representation_filters_alike() {
        let x: Vec<f64> = (0..48).map(|n| (0.4 * n as f64).sin()).collect();
        let reference = butter(4, &[0.1], FilterBandType::Lowpass, FilterOutputType::Ba)
            .expect("design")
            .apply(&x)
            .expect("filter");
        for output in [FilterOutputType::Tf, FilterOutputType::Zpk, FilterOutputType::Sos] {
            let y = butter(4, &[0.1], FilterBandType::Lowpass, output)
                .expect("design")
                .apply(&x)
                .expect("filter");
            for (a, b) in y.iter().zip(reference.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }
}
