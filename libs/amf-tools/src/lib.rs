//! # AMF Tools
//!
//! Host-facing facade over the AMF document engine.
//!
//! [`Amf`] owns one [`Document`] together with the state the engines keep
//! between calls: the slicer cache, the staged import mesh and the progress
//! handle. Every entity is addressed by a 0-based `i32` index, with `-1`
//! standing for "none" (or "whole document" in envelope queries).
//!
//! Fallible calls return `bool`, `Option` or a `-1` sentinel and overwrite a
//! single last-error cell, cleared on success. Lenient imports keep their
//! warnings in the cell after succeeding.
//!
//! ```
//! use amf_tools::Amf;
//!
//! let mut amf = Amf::new();
//! let red = amf.add_material("red");
//! assert!(amf.set_material_color(red, 1.0, 0.0, 0.0, 1.0));
//! assert!(!amf.remove_material(0));
//! assert!(amf.last_error_msg().contains("void"));
//! assert!(amf.rename_material(red, "crimson"));
//! assert!(amf.last_error_msg().is_empty());
//! ```

use std::sync::Arc;

use amf_doc::{AmfError, AmfResult, Document, EntityKind, Progress};
use amf_mesh::{NoTextures, Slicer, TextureResolver};
use config::constants::EngineConfig;
use parking_lot::Mutex;
use tracing::debug;

mod entities;
mod geometry;

pub use amf_doc::{InstanceParam, UnitSystem};
pub use amf_mesh::{ImportReport, MeshFormat, RenderTriangle, SliceBitmap, StagedMesh};

/// A Document plus the engine state a host drives through indices.
pub struct Amf {
    document: Document,
    config: EngineConfig,
    slicer: Slicer,
    staged: Option<StagedMesh>,
    strict_import: bool,
    last_import: Option<ImportReport>,
    resolver: Arc<dyn TextureResolver + Send + Sync>,
    progress: Progress,
    last_error: Mutex<String>,
}

impl Default for Amf {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

/// Copies the Document, the staged mesh and the import settings. The slicer
/// cache, progress handle and last-error cell start fresh.
impl Clone for Amf {
    fn clone(&self) -> Self {
        Self {
            document: self.document.clone(),
            staged: self.staged.clone(),
            strict_import: self.strict_import,
            resolver: Arc::clone(&self.resolver),
            ..Self::with_config(self.config)
        }
    }
}

impl Amf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_document_with(Document::new(), config)
    }

    /// Wraps an existing Document, e.g. one produced by the AMF codec.
    pub fn from_document(document: Document) -> Self {
        Self::from_document_with(document, EngineConfig::default())
    }

    fn from_document_with(document: Document, config: EngineConfig) -> Self {
        Self {
            document,
            config,
            slicer: Slicer::with_config(config),
            staged: None,
            strict_import: true,
            last_import: None,
            resolver: Arc::new(NoTextures),
            progress: Progress::new(),
            last_error: Mutex::new(String::new()),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for edits the index API does not cover. The slicer
    /// notices changes through the Document revision.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Replaces the Document, dropping every engine cache.
    pub fn set_document(&mut self, document: Document) {
        self.document = document;
        self.slicer.invalidate();
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Resets to an empty Document. Settings are kept.
    pub fn clear_all(&mut self) {
        self.document.clear();
        self.slicer.invalidate();
        self.staged = None;
        self.last_import = None;
        self.last_error.lock().clear();
    }

    // =========================================================================
    // Errors and progress
    // =========================================================================

    /// Message of the last failed call, empty after a success.
    pub fn last_error_msg(&self) -> String {
        self.last_error.lock().clone()
    }

    /// Handle for observing progress and requesting cancellation from
    /// another thread.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        self.progress.cancel();
    }

    /// Records the outcome of a call in the last-error cell.
    fn record<T>(&self, result: AmfResult<T>) -> Option<T> {
        let mut cell = self.last_error.lock();
        match result {
            Ok(value) => {
                cell.clear();
                Some(value)
            }
            Err(err) => {
                debug!(error = %err, "call failed");
                *cell = err.to_string();
                None
            }
        }
    }

    fn succeeded<T>(&self, result: AmfResult<T>) -> bool {
        self.record(result).is_some()
    }

    fn new_index(&self, result: AmfResult<usize>) -> i32 {
        self.record(result).map_or(-1, to_index)
    }

    /// Finishes a cancellable call. A cancel request only applies to the
    /// call it interrupted.
    fn finish<T>(&self, result: AmfResult<T>) -> Option<T> {
        self.progress.reset_cancel();
        self.record(result)
    }

    // =========================================================================
    // Units
    // =========================================================================

    pub fn units(&self) -> UnitSystem {
        self.document.units()
    }

    /// The AMF label of the Document units (`"mm"`, `"in"`, ...).
    pub fn units_string(&self) -> &'static str {
        self.document.units().as_str()
    }

    /// Relabels the Document units without rescaling geometry.
    pub fn set_units(&mut self, units: UnitSystem) {
        self.document.set_units(units);
    }

    pub fn set_units_str(&mut self, label: &str) -> bool {
        let result = label.parse::<UnitSystem>();
        match self.record(result) {
            Some(units) => {
                self.document.set_units(units);
                true
            }
            None => false,
        }
    }

    pub fn import_units(&self) -> UnitSystem {
        self.document.import_units()
    }

    pub fn set_import_units(&mut self, units: UnitSystem) {
        self.document.set_import_units(units);
    }

    pub fn convert_units(value: f64, from: UnitSystem, to: UnitSystem) -> f64 {
        amf_doc::convert_units(value, from, to)
    }

    pub fn to_current_units(&self, value: f64, from: UnitSystem) -> f64 {
        self.document.to_current_units(value, from)
    }

    pub fn from_current_units(&self, value: f64, to: UnitSystem) -> f64 {
        self.document.from_current_units(value, to)
    }

    /// Isotropic scale of every vertex.
    pub fn scale(&mut self, factor: f64, scale_constellations: bool, scale_equations: bool) -> bool {
        let result = self
            .document
            .scale_uniform(factor, scale_constellations, scale_equations);
        self.succeeded(result)
    }

    pub fn scale_xyz(
        &mut self,
        sx: f64,
        sy: f64,
        sz: f64,
        scale_constellations: bool,
        scale_equations: bool,
    ) -> bool {
        let result = self.document.scale(
            glam::DVec3::new(sx, sy, sz),
            scale_constellations,
            scale_equations,
        );
        self.succeeded(result)
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Stages a parsed mesh for [`Amf::import_staged`], replacing any mesh
    /// staged before.
    pub fn load_mesh(&mut self, staged: StagedMesh) {
        debug!(
            format = %staged.format(),
            triangles = staged.triangle_count(),
            "staged mesh"
        );
        self.staged = Some(staged);
    }

    /// Unitless extent of the staged mesh.
    pub fn staged_mesh_size(&self) -> Option<[f64; 3]> {
        let result = self
            .staged
            .as_ref()
            .map(|s| s.size().to_array())
            .ok_or_else(no_staged_mesh);
        self.record(result)
    }

    /// Triangles in the staged mesh, `-1` when nothing is staged.
    pub fn staged_triangle_count(&self) -> i32 {
        self.staged
            .as_ref()
            .map_or(-1, |s| to_index(s.triangle_count()))
    }

    pub fn strict_import(&self) -> bool {
        self.strict_import
    }

    /// Strict imports abort on malformed fragments and missing textures;
    /// lenient imports skip them and keep warnings in the last-error cell.
    pub fn set_strict_import(&mut self, strict: bool) {
        self.strict_import = strict;
    }

    pub fn set_texture_resolver(&mut self, resolver: impl TextureResolver + Send + Sync + 'static) {
        self.resolver = Arc::new(resolver);
    }

    /// Commits the staged mesh as a new volume of `object`/`mesh`. Either
    /// index may equal the current count to create the slot. The staged
    /// mesh is consumed whatever the outcome.
    pub fn import_staged(&mut self, object: i32, mesh: i32) -> bool {
        let result = self.commit_staged(object, mesh);
        let Some(report) = self.finish(result) else {
            return false;
        };
        if !report.warnings.is_empty() {
            *self.last_error.lock() = report.warnings.join("\n");
        }
        self.last_import = Some(report);
        true
    }

    fn commit_staged(&mut self, object: i32, mesh: i32) -> AmfResult<ImportReport> {
        let object = slot(object, EntityKind::Object)?;
        let mesh = slot(mesh, EntityKind::Mesh)?;
        let staged = self.staged.take().ok_or_else(no_staged_mesh)?;
        let options = amf_mesh::ImportOptions {
            strict: self.strict_import,
            config: self.config,
        };
        staged.commit(
            &mut self.document,
            object,
            mesh,
            &options,
            &*self.resolver,
            &self.progress,
        )
    }

    /// Report of the last successful import.
    pub fn last_import(&self) -> Option<&ImportReport> {
        self.last_import.as_ref()
    }

    // =========================================================================
    // Document
    // =========================================================================

    /// Human-readable summary of the Document.
    pub fn info_string(&self, mesh_info: bool) -> String {
        self.document.info_string(mesh_info)
    }

    pub fn subdivision_level(&self) -> i32 {
        i32::try_from(self.document.subdivision_level()).unwrap_or(i32::MAX)
    }

    /// Fails when the level is negative or would exceed the triangle limit.
    pub fn set_subdivision_level(&mut self, level: i32) -> bool {
        let result = u32::try_from(level)
            .map_err(|_| AmfError::invalid(format!("subdivision level must be >= 0, got {level}")))
            .and_then(|level| self.document.set_subdivision_level_with(level, &self.config));
        self.succeeded(result)
    }

    pub fn metadata(&self, key: &str) -> Option<String> {
        self.document.metadata(key).map(str::to_owned)
    }

    pub fn set_metadata(&mut self, key: &str, value: &str) {
        self.document.set_metadata(key, value);
    }
}

/// Converts a host index, rejecting negatives.
fn slot(index: i32, kind: EntityKind) -> AmfResult<usize> {
    usize::try_from(index).map_err(|_| AmfError::invalid(format!("{kind} index must be >= 0, got {index}")))
}

/// Like [`slot`], with `-1` meaning none.
fn optional_slot(index: i32, kind: EntityKind) -> AmfResult<Option<usize>> {
    match index {
        -1 => Ok(None),
        _ => slot(index, kind).map(Some),
    }
}

fn to_index(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn no_staged_mesh() -> AmfError {
    AmfError::invalid("no mesh has been staged")
}

#[cfg(test)]
mod tests;
