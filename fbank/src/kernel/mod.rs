//! Shared kernel substrate.
//!
//! Every design routine in this crate is a kernel: a validated configuration
//! built through [`KernelLifecycle::try_new`] plus a capability trait from
//! [`crate::signal::traits`] that runs it. Invalid parameters surface as
//! [`ConfigError`] before any computation happens; failures discovered while
//! running surface as [`ExecInvariantViolation`].

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
