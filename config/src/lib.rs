//! # Config Crate
//!
//! Centralized configuration constants for the AMF document engine.
//! All magic numbers and tunable parameters are defined here so the
//! document model, the geometry engines and the facade agree on them.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{EPSILON, MAX_TRIANGLES, PROGRESS_BATCH};
//!
//! // Use EPSILON for floating-point comparisons
//! let value: f64 = 0.00000000001; // 1e-11, smaller than EPSILON (1e-10)
//! assert!(value.abs() < EPSILON);
//!
//! // Subdivision refuses to project past the triangle limit
//! let projected = 12usize * 4usize.pow(3);
//! assert!(projected < MAX_TRIANGLES);
//! assert!(PROGRESS_BATCH > 0);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **No Dependencies**: Pure values, usable from every crate
//! - **AMF Compatible**: Defaults match the AMF conventions (void material 0)

pub mod constants;

#[cfg(test)]
mod tests;
