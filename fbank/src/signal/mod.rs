//! Signal processing: transforms, windows, filters and filter banks.

/// Real FFT helpers.
pub mod fft;
/// Filter design and execution.
pub mod filter;
/// Band layouts and filter-bank weight matrices.
pub mod filterbank;
/// Frequency scales.
pub mod scale;
/// Capability traits run by the kernels.
pub mod traits;
/// Window functions.
pub mod windows;
