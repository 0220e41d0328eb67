//! # Configuration Constants
//!
//! Centralized constants for the AMF document engine. All geometry
//! tolerances, safety limits and progress granularities are defined here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Limits**: Maximum values for safety bounds
//! - **Progress**: Granularity of cooperative cancellation checks
//! - **Materials**: Reserved indices and default colors

use std::fmt;

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Epsilon for floating-point comparisons.
///
/// Used for determining if two floating-point values are "equal" within
/// numerical tolerance.
///
/// # Example
///
/// ```rust
/// use config::constants::EPSILON;
///
/// fn approximately_equal(a: f64, b: f64) -> bool {
///     (a - b).abs() < EPSILON
/// }
///
/// assert!(approximately_equal(1.0, 1.0 + 1e-11));
/// ```
pub const EPSILON: f64 = 1e-10;

/// Scaling factor for quantizing f64 coordinates to i64 keys.
///
/// Imported triangle soups repeat every shared corner. Positions are
/// multiplied by this factor and rounded before being used as hash keys,
/// so corners closer than `1 / COORDINATE_SCALE` collapse into one vertex.
///
/// # Example
///
/// ```rust
/// use config::constants::COORDINATE_SCALE;
///
/// fn to_key(value: f64) -> i64 {
///     (value * COORDINATE_SCALE).round() as i64
/// }
///
/// assert_eq!(to_key(1.0), to_key(1.0 + 1e-9));
/// ```
pub const COORDINATE_SCALE: f64 = 1e6;

// =============================================================================
// LIMIT CONSTANTS
// =============================================================================

/// Maximum recursion depth for instance flattening and composite resolution.
///
/// Cycles are rejected on edit, but a Document handed over by a codec may
/// already be malformed. Walks stop at this depth instead of overflowing.
///
/// # Example
///
/// ```rust
/// use config::constants::MAX_RECURSION_DEPTH;
///
/// let current_depth = 500;
/// assert!(current_depth < MAX_RECURSION_DEPTH);
/// ```
pub const MAX_RECURSION_DEPTH: usize = 1000;

/// Maximum number of triangles the subdivision engine will generate.
///
/// Checked against the projected `T * 4^n` count before any memory is
/// committed.
pub const MAX_TRIANGLES: usize = 20_000_000;

/// Maximum number of pixels in one slice bitmap.
///
/// Slice grids are derived from the model extent and the requested pixel
/// size; a grid above this limit is refused before any buffer is allocated.
///
/// # Example
///
/// ```rust
/// use config::constants::MAX_SLICE_PIXELS;
///
/// let (width, height) = (4096usize, 4096usize);
/// assert!(width * height <= MAX_SLICE_PIXELS);
/// ```
pub const MAX_SLICE_PIXELS: usize = 64 * 1024 * 1024;

/// Bytes of stack space reserved when growing recursion limits using the
/// `stacker` crate.
///
/// # Example
///
/// ```rust
/// use config::constants::STACKER_STACK_SIZE_BYTES;
/// assert!(STACKER_STACK_SIZE_BYTES >= 1024);
/// ```
pub const STACKER_STACK_SIZE_BYTES: usize = 8 * 1024 * 1024;

/// Remaining stack below which `stacker` allocates a new segment.
pub const STACKER_RED_ZONE_BYTES: usize = 64 * 1024;

// =============================================================================
// PROGRESS CONSTANTS
// =============================================================================

/// Number of triangles processed between two cancellation checks.
///
/// Long operations tick their progress counter and poll the cancellation
/// flag once per batch, so a cancel request is honoured within one batch.
///
/// # Example
///
/// ```rust
/// use config::constants::PROGRESS_BATCH;
///
/// let triangles = 10_000usize;
/// let checks = triangles.div_ceil(PROGRESS_BATCH);
/// assert!(checks >= 1);
/// ```
pub const PROGRESS_BATCH: usize = 1024;

// =============================================================================
// MATERIAL CONSTANTS
// =============================================================================

/// Index of the reserved void material.
///
/// Every Document carries the void material at this index. A composite
/// referencing it blends in empty space.
pub const VOID_MATERIAL_INDEX: usize = 0;

/// Color used for volumes without a material (light gray).
///
/// RGBA values in range [0.0, 1.0].
pub const DEFAULT_COLOR: [f64; 4] = [0.8, 0.8, 0.8, 1.0];

// =============================================================================
// ENGINE CONFIG
// =============================================================================

/// Immutable snapshot of the engine settings shared between crates.
///
/// # Examples
/// ```
/// use config::constants::EngineConfig;
/// let config = EngineConfig::default();
/// assert!(config.max_triangles > 0);
/// assert!(config.max_pixels > 0);
/// assert!(config.progress_batch > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on generated triangles.
    pub max_triangles: usize,
    /// Upper bound on the pixels of one slice bitmap.
    pub max_pixels: usize,
    /// Triangles processed between cancellation checks.
    pub progress_batch: usize,
}

impl EngineConfig {
    /// Builds a configuration, validating every field.
    ///
    /// # Examples
    /// ```
    /// use config::constants::EngineConfig;
    /// let cfg = EngineConfig::new(1000, 4096, 64).expect("valid config");
    /// assert_eq!(cfg.progress_batch, 64);
    /// assert!(EngineConfig::new(1000, 4096, 0).is_err());
    /// ```
    pub fn new(
        max_triangles: usize,
        max_pixels: usize,
        progress_batch: usize,
    ) -> Result<Self, ConfigError> {
        if max_triangles == 0 {
            return Err(ConfigError::InvalidTriangleLimit(max_triangles));
        }
        if max_pixels == 0 {
            return Err(ConfigError::InvalidPixelLimit(max_pixels));
        }
        if progress_batch == 0 {
            return Err(ConfigError::InvalidBatch(progress_batch));
        }
        Ok(Self {
            max_triangles,
            max_pixels,
            progress_batch,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_triangles: MAX_TRIANGLES,
            max_pixels: MAX_SLICE_PIXELS,
            progress_batch: PROGRESS_BATCH,
        }
    }
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Raised when the triangle limit is zero.
    InvalidTriangleLimit(usize),
    /// Raised when the slice pixel limit is zero.
    InvalidPixelLimit(usize),
    /// Raised when the progress batch is zero.
    InvalidBatch(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTriangleLimit(value) => {
                write!(f, "max_triangles must be >= 1: {value}")
            }
            ConfigError::InvalidPixelLimit(value) => {
                write!(f, "max_pixels must be >= 1: {value}")
            }
            ConfigError::InvalidBatch(value) => {
                write!(f, "progress_batch must be >= 1: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Checks if two f64 values are approximately equal within EPSILON.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_equal;
///
/// assert!(approx_equal(1.0, 1.0 + 1e-11));
/// assert!(!approx_equal(1.0, 1.1));
/// ```
#[inline]
pub fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Checks if a f64 value is approximately zero within EPSILON.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_zero;
///
/// assert!(approx_zero(1e-11));
/// assert!(!approx_zero(0.1));
/// ```
#[inline]
pub fn approx_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Returns the triangle count after `level` rounds of 1-to-4 subdivision,
/// or `None` when it does not fit in `usize`.
///
/// # Example
///
/// ```rust
/// use config::constants::projected_triangles;
///
/// assert_eq!(projected_triangles(12, 0), Some(12));
/// assert_eq!(projected_triangles(12, 2), Some(192));
/// assert_eq!(projected_triangles(12, 64), None);
/// ```
pub fn projected_triangles(triangles: usize, level: u32) -> Option<usize> {
    4usize
        .checked_pow(level)
        .and_then(|factor| triangles.checked_mul(factor))
}
