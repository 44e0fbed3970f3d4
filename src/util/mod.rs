//! Utility types shared by the container and animation layers.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, plus [`Color`]

mod error;
mod math;

pub use error::*;
pub use math::*;
