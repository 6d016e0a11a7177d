//! Polynomial linear algebra: companion matrices and root finding.

mod companion;
mod roots;

pub use companion::*;
pub use roots::*;
