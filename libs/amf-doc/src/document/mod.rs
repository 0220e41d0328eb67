//! # Document
//!
//! The root of the AMF scene graph. Every entity is addressed by its index
//! in the owning collection.
//!
//! ## Index Contract
//!
//! Indices are stable only until a removal in the same collection: removal
//! shifts every later entry down by one. References held elsewhere (volume
//! materials, composite materials, instance targets) are not rewritten;
//! the caller revalidates them, typically through the `resolve_*` helpers,
//! which return `None` for dangling indices.

mod constellations;
mod materials;
mod objects;

use std::sync::atomic::{AtomicU64, Ordering};

use config::constants::{projected_triangles, EngineConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{checked, AmfError, AmfResult, EntityKind};
use crate::geometry::Object;
use crate::material::Material;
use crate::scene::Constellation;
use crate::texture::Texture;
use crate::units::{convert_units, UnitSystem};

/// An in-memory AMF document.
///
/// ```
/// use amf_doc::Document;
///
/// let mut doc = Document::new();
/// let a = doc.add_object("A");
/// let b = doc.add_object("B");
/// doc.remove_object(a).unwrap();
/// assert_eq!(doc.object_name(0).unwrap(), "B");
/// assert_eq!(b, 1);
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    units: UnitSystem,
    import_units: UnitSystem,
    objects: Vec<Object>,
    /// Index 0 is always the void material.
    materials: Vec<Material>,
    constellations: Vec<Constellation>,
    textures: Vec<Texture>,
    metadata: Vec<(String, String)>,
    subdivision_level: u32,
    #[serde(skip)]
    revision: u64,
    #[serde(skip, default = "next_id")]
    id: u64,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A copy is a distinct Document: it gets its own identity.
impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            units: self.units,
            import_units: self.import_units,
            objects: self.objects.clone(),
            materials: self.materials.clone(),
            constellations: self.constellations.clone(),
            textures: self.textures.clone(),
            metadata: self.metadata.clone(),
            subdivision_level: self.subdivision_level,
            revision: self.revision,
            id: next_id(),
        }
    }
}

/// Compares content only; identity and revision are ignored.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
            && self.import_units == other.import_units
            && self.objects == other.objects
            && self.materials == other.materials
            && self.constellations == other.constellations
            && self.textures == other.textures
            && self.metadata == other.metadata
            && self.subdivision_level == other.subdivision_level
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty Document holding only the void material.
    pub fn new() -> Self {
        Self {
            units: UnitSystem::default(),
            import_units: UnitSystem::default(),
            objects: Vec::new(),
            materials: vec![Material::void()],
            constellations: Vec::new(),
            textures: Vec::new(),
            metadata: Vec::new(),
            subdivision_level: 0,
            revision: 0,
            id: next_id(),
        }
    }

    /// Removes all content. The revision keeps counting so caches built on
    /// the old content are invalidated.
    pub fn clear(&mut self) {
        let revision = self.revision;
        *self = Self::new();
        self.revision = revision + 1;
    }

    /// Monotonic counter bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Process-unique identity, fresh for every new, cloned or
    /// deserialized Document. Caches key on it together with the revision.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    // =========================================================================
    // UNITS
    // =========================================================================

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Changes the unit label only; geometry keeps its numeric values.
    pub fn set_units(&mut self, units: UnitSystem) {
        self.units = units;
        self.touch();
    }

    pub fn import_units(&self) -> UnitSystem {
        self.import_units
    }

    /// Sets the units unitless meshes are imported in. When the Document has
    /// no geometry yet, its own units follow.
    pub fn set_import_units(&mut self, units: UnitSystem) {
        self.import_units = units;
        if !self.has_geometry() {
            self.units = units;
        }
        self.touch();
    }

    /// Converts a value expressed in `from` into the Document units.
    pub fn to_current_units(&self, value: f64, from: UnitSystem) -> f64 {
        convert_units(value, from, self.units)
    }

    /// Converts a value expressed in the Document units into `to`.
    pub fn from_current_units(&self, value: f64, to: UnitSystem) -> f64 {
        convert_units(value, self.units, to)
    }

    // =========================================================================
    // TEXTURES
    // =========================================================================

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn texture(&self, index: usize) -> AmfResult<&Texture> {
        checked(&self.textures, EntityKind::Texture, index)
    }

    pub fn resolve_texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    /// Appends a texture and returns its index.
    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.touch();
        self.textures.len() - 1
    }

    /// Removes a texture; later textures shift down by one.
    pub fn remove_texture(&mut self, index: usize) -> AmfResult<Texture> {
        checked(&self.textures, EntityKind::Texture, index)?;
        self.touch();
        Ok(self.textures.remove(index))
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn metadata_entries(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Inserts or replaces a metadata entry.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key, value)),
        }
        self.touch();
    }

    // =========================================================================
    // SUBDIVISION
    // =========================================================================

    pub fn subdivision_level(&self) -> u32 {
        self.subdivision_level
    }

    /// Sets the curved-triangle subdivision level with the default limits.
    pub fn set_subdivision_level(&mut self, level: u32) -> AmfResult<()> {
        self.set_subdivision_level_with(level, &EngineConfig::default())
    }

    /// Sets the subdivision level, failing fast when `T * 4^level` would
    /// exceed `config.max_triangles`.
    pub fn set_subdivision_level_with(&mut self, level: u32, config: &EngineConfig) -> AmfResult<()> {
        let triangles = self.triangle_count();
        match projected_triangles(triangles, level) {
            Some(count) if count <= config.max_triangles => {}
            projected => {
                return Err(AmfError::TooManyTriangles {
                    count: projected.unwrap_or(usize::MAX),
                    max: config.max_triangles,
                })
            }
        }
        debug!(level, triangles, "subdivision level set");
        self.subdivision_level = level;
        self.touch();
        Ok(())
    }

    // =========================================================================
    // STATISTICS
    // =========================================================================

    /// Triangles over every object, before subdivision.
    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(Object::triangle_count).sum()
    }

    /// True when any object carries at least one triangle.
    pub fn has_geometry(&self) -> bool {
        self.objects.iter().any(|o| o.triangle_count() > 0)
    }

    /// Human-readable summary of the Document.
    pub fn info_string(&self, mesh_info: bool) -> String {
        let mut info = format!(
            "Units: {}\nObjects: {}\nMaterials: {}\nConstellations: {}\nTextures: {}\n",
            self.units,
            self.objects.len(),
            self.materials.len() - usize::from(!self.materials.is_empty()),
            self.constellations.len(),
            self.textures.len(),
        );
        if mesh_info {
            for (i, object) in self.objects.iter().enumerate() {
                info.push_str(&format!(
                    "Object {i} \"{}\": {} meshes, {} vertices, {} triangles\n",
                    object.name,
                    object.meshes.len(),
                    object.vertex_count(),
                    object.triangle_count(),
                ));
            }
            if self.subdivision_level > 0 {
                info.push_str(&format!("Subdivision level: {}\n", self.subdivision_level));
            }
        }
        info
    }
}
