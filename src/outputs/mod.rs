//! Output writers for acquisition runs.
//!
//! # Submodules
//!
//! - [`json`]: Writes each [`Rotation`](crate::models::Rotation) to a dated
//!   archive and to the `latest.json` file the display reads

pub mod json;
