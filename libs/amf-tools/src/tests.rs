//! Tests for the index facade: sentinels, the last-error cell and the
//! engine state it keeps between calls.

use super::*;
use amf_doc::Color;
use glam::DVec3;

fn soup_square() -> StagedMesh {
    StagedMesh::from_soup(
        MeshFormat::Stl,
        [
            [DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0)],
            [DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
        ],
    )
}

/// Failures set the cell, the next success clears it.
#[test]
fn last_error_is_overwritten_per_call() {
    let mut amf = Amf::new();
    assert!(amf.last_error_msg().is_empty());
    assert!(!amf.rename_object(3, "x"));
    assert!(amf.last_error_msg().contains("object"));

    let o = amf.add_object("part");
    assert!(amf.rename_object(o, "renamed"));
    assert!(amf.last_error_msg().is_empty());
    assert_eq!(amf.object_name(o).as_deref(), Some("renamed"));
}

#[test]
fn negative_indices_are_rejected() {
    let mut amf = Amf::new();
    amf.add_object("part");
    assert_eq!(amf.object_name(-1), None);
    assert!(amf.last_error_msg().contains(">= 0"));
    assert_eq!(amf.mesh_count(-5), -1);
    assert!(!amf.is_material_referenced_by(-1, 0));
}

#[test]
fn volume_material_uses_minus_one_for_none() {
    let mut amf = Amf::new();
    amf.load_mesh(soup_square());
    assert!(amf.import_staged(0, 0));
    assert_eq!(amf.volume_material(0, 0, 0), -1);
    assert!(amf.last_error_msg().is_empty());

    let m = amf.add_material("pla");
    assert!(amf.set_volume_material(0, 0, 0, m));
    assert_eq!(amf.volume_material(0, 0, 0), m);
    assert!(amf.set_volume_material(0, 0, 0, -1));
    assert_eq!(amf.volume_material(0, 0, 0), -1);
    assert!(!amf.set_volume_material(0, 0, 0, 9));
}

#[test]
fn clone_copies_the_document_only() {
    let mut amf = Amf::new();
    amf.add_object("a");
    assert!(!amf.remove_object(7));
    let copy = amf.clone();
    assert_eq!(copy.document(), amf.document());
    assert!(copy.last_error_msg().is_empty());
}

#[test]
fn clear_all_keeps_settings() {
    let mut amf = Amf::new();
    amf.set_strict_import(false);
    amf.add_object("a");
    amf.add_material("m");
    amf.load_mesh(soup_square());
    amf.clear_all();
    assert_eq!(amf.object_count(), 0);
    assert_eq!(amf.material_count(), 1);
    assert_eq!(amf.staged_triangle_count(), -1);
    assert!(!amf.strict_import());
}

#[test]
fn import_without_staged_mesh_fails() {
    let mut amf = Amf::new();
    assert!(!amf.import_staged(0, 0));
    assert!(amf.last_error_msg().contains("staged"));
    assert_eq!(amf.staged_mesh_size(), None);
}

#[test]
fn staged_mesh_is_consumed() {
    let mut amf = Amf::new();
    amf.load_mesh(soup_square());
    assert_eq!(amf.staged_triangle_count(), 2);
    assert_eq!(amf.staged_mesh_size(), Some([1.0, 1.0, 0.0]));
    assert!(amf.import_staged(0, 0));
    assert_eq!(amf.staged_triangle_count(), -1);
    let report = amf.last_import().unwrap();
    assert_eq!((report.vertices, report.triangles), (4, 2));
}

#[test]
fn subdivision_level_validation() {
    let mut amf = Amf::with_config(EngineConfig::new(100, config::constants::MAX_SLICE_PIXELS, 16).unwrap());
    amf.load_mesh(soup_square());
    assert!(amf.import_staged(0, 0));
    assert!(!amf.set_subdivision_level(-1));
    assert!(amf.set_subdivision_level(2));
    assert_eq!(amf.subdivision_level(), 2);
    assert!(!amf.set_subdivision_level(4));
    assert!(amf.last_error_msg().contains("Too many triangles"));
    assert_eq!(amf.subdivision_level(), 2);
}

#[test]
fn units_by_label() {
    let mut amf = Amf::new();
    assert_eq!(amf.units_string(), "mm");
    assert!(amf.set_units_str("inch"));
    assert_eq!(amf.units(), UnitSystem::Inches);
    assert!(!amf.set_units_str("cubit"));
    assert_eq!(amf.units(), UnitSystem::Inches);
    let inches = Amf::convert_units(1.0, UnitSystem::Feet, UnitSystem::Inches);
    assert!((inches - 12.0).abs() < 1e-12);
}

#[test]
fn volume_color_override() {
    let mut amf = Amf::new();
    amf.load_mesh(soup_square());
    assert!(amf.import_staged(0, 0));
    assert_eq!(amf.volume_color(0, 0, 0), None);
    assert!(amf.set_volume_color(0, 0, 0, 2.0, 0.5, 0.0, 1.0));
    assert_eq!(amf.volume_color(0, 0, 0), Some([1.0, 0.5, 0.0, 1.0]));
    assert!(amf.clear_volume_color(0, 0, 0));
    assert_eq!(amf.volume_color(0, 0, 0), None);
    assert!(amf.last_error_msg().is_empty());
}

#[test]
fn material_colors_in_both_forms() {
    let mut amf = Amf::new();
    let m = amf.add_material("m");
    assert!(amf.set_material_color_u8(m, 255, 128, -4));
    assert_eq!(amf.material_color_u8(m), Some([255, 128, 0]));
    assert!(amf.set_material_color(m, 0.0, 0.0, 1.0, 0.5));
    assert_eq!(amf.material_color(m), Some([0.0, 0.0, 1.0, 0.5]));
    assert_eq!(
        amf.document().material_color(m as usize).unwrap(),
        Color::rgba(0.0, 0.0, 1.0, 0.5)
    );
}
