//! Numeric core shared by the [`fbank`](https://docs.rs/fbank) filter design crate.
//!
//! Holds the crate-wide [`Error`] type and numpy-flavoured sequence helpers
//! such as [`num_rs::convolve`].

mod error;

/// Numpy-like sequence routines.
pub mod num_rs;

pub use error::{Error, Result};
