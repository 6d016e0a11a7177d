//! Digital filter design and perceptual filter banks.
//!
//! The crate covers two layers:
//!
//! * [`signal::filter`]: IIR design from analog prototypes through the
//!   bilinear transform, second-order section decomposition, FIR design
//!   (windowed sinc, frequency sampling, equiripple) and the `lfilter` /
//!   `sosfilt` runners used to apply the results.
//! * [`signal::filterbank`]: band layouts on the Hz, mel, bark, ERB and
//!   octave scales, the weight matrices built over them, the gammatone ERB
//!   bank and the chroma bank.
//!
//! Designs are kernels: a plain configuration validated once by
//! [`kernel::KernelLifecycle::try_new`], then run through a capability trait
//! from [`signal::traits`]. Free functions wrap the common cases.
//!
//! ```
//! use fbank::signal::filter::design::{butter, FilterBandType, FilterOutputType};
//! use fbank::signal::filter::sosfreqz;
//!
//! let filter = butter(4, &[0.2], FilterBandType::Lowpass, FilterOutputType::Sos).unwrap();
//! let fbank::signal::filter::design::DigitalFilter::Sos(sections) = filter else {
//!     unreachable!()
//! };
//! let (_, h) = sosfreqz(&sections, 64);
//! assert!((h[0].norm() - 1.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]

/// Kernel lifecycle, errors and 1D input/output adapters.
pub mod kernel;
/// Polynomial companion matrices and roots.
pub mod linalg;
/// Filter design, filter execution and filter banks.
pub mod signal;
/// Special functions.
pub mod special;

pub use nalgebra as na;
