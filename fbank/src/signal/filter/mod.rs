//! Digital filter design and execution.

/// IIR, FIR and resonator design, transfer functions and section cascades.
pub mod design;

mod kernels;
mod lfilter;
mod response;
mod sosfilt;

pub use kernels::*;
pub use lfilter::*;
pub use response::*;
pub use sosfilt::*;
