//! Trait interfaces for signal-processing capabilities.
//!
//! Each kernel in this crate is built through
//! [`crate::kernel::KernelLifecycle`] and then run through one of these
//! capability traits.

use crate::kernel::{ExecInvariantViolation, Read1D, Write1D};

/// Window generation capability.
pub trait WindowGenerate<T> {
    /// Generate the window into a caller-provided output buffer.
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<T> + ?Sized;

    /// Generate the window and allocate output.
    fn run_alloc(&self) -> Result<Vec<T>, ExecInvariantViolation>;
}

/// FIR design capability.
pub trait FirWinDesign<T> {
    /// Run FIR design into a caller-provided output buffer.
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<T> + ?Sized;

    /// Run FIR design and allocate output coefficients.
    fn run_alloc(&self) -> Result<Vec<T>, ExecInvariantViolation>;
}

/// IIR design capability.
pub trait IirDesign<T> {
    /// Output representation produced by the design kernel.
    type Output;

    /// Run IIR design and allocate output representation.
    fn run_alloc(&self) -> Result<Self::Output, ExecInvariantViolation>;
}

/// Transfer function to second-order section conversion capability.
pub trait ZpkToSosDesign<T> {
    /// Split a transfer function into a cascade of sections.
    fn run_alloc(
        &self,
        tf: &crate::signal::filter::design::TransferFunction,
    ) -> Result<Vec<crate::signal::filter::design::Sos>, ExecInvariantViolation>;
}

/// 1D `lfilter` capability.
pub trait LFilter1D<T> {
    /// Run filtering into a caller-provided output buffer.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Run filtering and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// 1D `sosfilt` capability.
pub trait SosFilt1D<T> {
    /// Run cascade filtering into a caller-provided output buffer.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Run cascade filtering and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Frequency-band layout capability.
pub trait BandLayoutDesign {
    /// Compute the `(left, center, right)` band triples in Hz.
    fn run_alloc(
        &self,
    ) -> Result<Vec<crate::signal::filterbank::Band>, ExecInvariantViolation>;
}

/// Filter-bank weight design capability.
pub trait FilterBankDesign {
    /// Build the weight matrix.
    fn run_alloc(&self) -> Result<crate::signal::filterbank::FilterBank, ExecInvariantViolation>;
}

/// Frequency response capability for `b / a` coefficient sets.
pub trait Freqz1D {
    /// Evaluate the response into caller-provided frequency and value buffers.
    fn run_into<I1, I2, OW, OH>(
        &self,
        b: &I1,
        a: &I2,
        w: &mut OW,
        h: &mut OH,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
        OW: Write1D<f64> + ?Sized,
        OH: Write1D<nalgebra::Complex<f64>> + ?Sized;

    /// Evaluate the response and allocate `(w, h)`.
    fn run_alloc<I1, I2>(
        &self,
        b: &I1,
        a: &I2,
    ) -> Result<(Vec<f64>, Vec<nalgebra::Complex<f64>>), ExecInvariantViolation>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized;
}

/// Frequency response capability for section cascades.
pub trait SosFreqz1D {
    /// Evaluate the cascade response into caller-provided buffers.
    fn run_into<OW, OH>(
        &self,
        sos: &[crate::signal::filter::design::Sos],
        w: &mut OW,
        h: &mut OH,
    ) -> Result<(), ExecInvariantViolation>
    where
        OW: Write1D<f64> + ?Sized,
        OH: Write1D<nalgebra::Complex<f64>> + ?Sized;

    /// Evaluate the cascade response and allocate `(w, h)`.
    fn run_alloc(
        &self,
        sos: &[crate::signal::filter::design::Sos],
    ) -> Result<(Vec<f64>, Vec<nalgebra::Complex<f64>>), ExecInvariantViolation>;
}
