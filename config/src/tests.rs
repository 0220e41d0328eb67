//! # Tests for Config Constants
//!
//! Unit tests verifying the correctness of configuration constants
//! and helper functions.

use crate::constants::*;

// =============================================================================
// PRECISION TESTS
// =============================================================================

#[test]
fn test_epsilon_is_positive() {
    assert!(EPSILON > 0.0, "EPSILON must be positive");
}

#[test]
fn test_epsilon_is_small() {
    assert!(EPSILON < 1e-6, "EPSILON should be small for precision");
}

#[test]
fn test_coordinate_scale_resolves_below_a_micron() {
    // Import merges corners closer than 1 / COORDINATE_SCALE; a micron in mm
    // units must stay distinguishable.
    assert!(1.0 / COORDINATE_SCALE < 0.001);
}

// =============================================================================
// LIMIT TESTS
// =============================================================================

#[test]
fn test_max_triangles_allows_level_four_on_large_meshes() {
    // 10k triangles at subdivision level 4 must remain legal.
    let projected = projected_triangles(10_000, 4).unwrap();
    assert!(projected <= MAX_TRIANGLES);
}

#[test]
fn test_projected_triangles_growth() {
    assert_eq!(projected_triangles(1, 1), Some(4));
    assert_eq!(projected_triangles(3, 3), Some(192));
}

#[test]
fn test_projected_triangles_overflow() {
    assert_eq!(projected_triangles(usize::MAX, 1), None);
    assert_eq!(projected_triangles(1, 40), None);
}

#[test]
fn test_slice_pixel_limit_fits_rgba_buffer() {
    assert!(MAX_SLICE_PIXELS.checked_mul(4).is_some());
}

#[test]
fn test_stacker_red_zone_smaller_than_stack() {
    assert!(STACKER_RED_ZONE_BYTES < STACKER_STACK_SIZE_BYTES);
}

// =============================================================================
// MATERIAL TESTS
// =============================================================================

#[test]
fn test_void_material_is_first() {
    assert_eq!(VOID_MATERIAL_INDEX, 0);
}

#[test]
fn test_default_color_in_range() {
    for c in DEFAULT_COLOR {
        assert!((0.0..=1.0).contains(&c));
    }
    assert_eq!(DEFAULT_COLOR[3], 1.0, "default color must be opaque");
}

// =============================================================================
// ENGINE CONFIG TESTS
// =============================================================================

#[test]
fn test_engine_config_default_matches_constants() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.max_triangles, MAX_TRIANGLES);
    assert_eq!(cfg.max_pixels, MAX_SLICE_PIXELS);
    assert_eq!(cfg.progress_batch, PROGRESS_BATCH);
}

#[test]
fn test_engine_config_rejects_bad_values() {
    assert_eq!(
        EngineConfig::new(0, 10, 10),
        Err(ConfigError::InvalidTriangleLimit(0))
    );
    assert_eq!(
        EngineConfig::new(10, 0, 10),
        Err(ConfigError::InvalidPixelLimit(0))
    );
    assert_eq!(
        EngineConfig::new(10, 10, 0),
        Err(ConfigError::InvalidBatch(0))
    );
}

#[test]
fn test_config_error_display() {
    let msg = ConfigError::InvalidBatch(0).to_string();
    assert!(msg.contains("progress_batch"));
}

// =============================================================================
// APPROX TESTS
// =============================================================================

#[test]
fn test_approx_equal_same_values() {
    assert!(approx_equal(1.0, 1.0));
    assert!(approx_equal(0.0, 0.0));
    assert!(approx_equal(-5.5, -5.5));
}

#[test]
fn test_approx_equal_within_epsilon() {
    assert!(approx_equal(1.0, 1.0 + EPSILON / 2.0));
}

#[test]
fn test_approx_equal_outside_epsilon() {
    assert!(!approx_equal(1.0, 1.0 + EPSILON * 2.0));
}

#[test]
fn test_approx_zero() {
    assert!(approx_zero(0.0));
    assert!(approx_zero(EPSILON / 2.0));
    assert!(!approx_zero(EPSILON * 2.0));
}
