//! # RepCoach Core
//!
//! Core types, planar geometry, and error definitions for the RepCoach
//! motion-recognition engine.

pub mod error;
pub mod geometry;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use types::*;
