//! # Mesh Import
//!
//! Two-phase import of externally parsed meshes. A parser fills a
//! [`StagedMesh`]; callers may inspect it (size, triangle count) and then
//! [`StagedMesh::commit`] it into a Document.
//!
//! The commit builds the whole volume off to the side: coincident points
//! are merged, malformed fragments are rejected or skipped, units are
//! converted and the texture is resolved. Only then is the Document
//! touched, in one step, so failures and cancellation leave it unchanged.

use std::collections::HashMap;
use std::fmt;

use amf_doc::{
    convert_units, AmfError, AmfResult, Document, EntityKind, Progress, TexMap, Texture,
    Triangle, Vertex, Volume,
};
use config::constants::{approx_equal, EngineConfig, COORDINATE_SCALE, EPSILON};
use glam::{DVec2, DVec3};
use tracing::{debug, info, warn};

/// Source format of a staged mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Stl,
    X3d,
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshFormat::Stl => "stl",
            MeshFormat::X3d => "x3d",
        })
    }
}

/// Loads texture images named by staged meshes.
pub trait TextureResolver {
    /// Returns the decoded texture at `path`, or `None` if it cannot be found.
    fn resolve(&self, path: &str) -> Option<Texture>;
}

impl<F> TextureResolver for F
where
    F: Fn(&str) -> Option<Texture>,
{
    fn resolve(&self, path: &str) -> Option<Texture> {
        self(path)
    }
}

/// A resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextures;

impl TextureResolver for NoTextures {
    fn resolve(&self, _path: &str) -> Option<Texture> {
        None
    }
}

/// Options for [`StagedMesh::commit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Abort on the first malformed fragment or missing texture instead of
    /// skipping it.
    pub strict: bool,
    pub config: EngineConfig,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strict: true,
            config: EngineConfig::default(),
        }
    }
}

impl ImportOptions {
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub object: usize,
    pub mesh: usize,
    pub volume: usize,
    pub vertices: usize,
    pub triangles: usize,
    /// Input points folded into an earlier coincident point.
    pub merged_vertices: usize,
    /// Merged points whose normal or color differed from the kept point.
    pub conflicting_attributes: usize,
    /// Fragments dropped in lenient mode.
    pub skipped: usize,
    pub warnings: Vec<String>,
    /// Texture path that could not be resolved (lenient mode only).
    pub missing_texture: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StagedTriangle {
    indices: [u32; 3],
    uv: Option<[DVec2; 3]>,
}

/// A parsed but not yet imported mesh, in the import units.
///
/// ```
/// use amf_doc::Document;
/// use amf_mesh::{ImportOptions, MeshFormat, NoTextures, StagedMesh};
/// use amf_doc::Progress;
/// use glam::DVec3;
///
/// let mut staged = StagedMesh::new(MeshFormat::Stl);
/// staged.push_facet([DVec3::ZERO, DVec3::X, DVec3::Y]);
/// staged.push_facet([DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y]);
/// assert_eq!(staged.triangle_count(), 2);
///
/// let mut doc = Document::new();
/// let report = staged
///     .commit(&mut doc, 0, 0, &ImportOptions::default(), &NoTextures, &Progress::new())
///     .unwrap();
/// assert_eq!(report.vertices, 4);
/// assert_eq!(doc.triangle_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StagedMesh {
    format: MeshFormat,
    name: String,
    vertices: Vec<Vertex>,
    triangles: Vec<StagedTriangle>,
    texture_path: Option<String>,
}

impl StagedMesh {
    pub fn new(format: MeshFormat) -> Self {
        Self {
            format,
            name: String::new(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            texture_path: None,
        }
    }

    /// Stages a triangle soup, one facet per entry.
    pub fn from_soup(format: MeshFormat, facets: impl IntoIterator<Item = [DVec3; 3]>) -> Self {
        let mut staged = Self::new(format);
        for facet in facets {
            staged.push_facet(facet);
        }
        staged
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds an indexed vertex and returns its index.
    pub fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    /// Adds a triangle over previously pushed vertices. Indices are checked
    /// at commit time.
    pub fn push_triangle(&mut self, indices: [u32; 3]) {
        self.triangles.push(StagedTriangle { indices, uv: None });
    }

    /// Adds a triangle with per-corner texture coordinates.
    pub fn push_textured_triangle(&mut self, indices: [u32; 3], uv: [DVec2; 3]) {
        self.triangles.push(StagedTriangle {
            indices,
            uv: Some(uv),
        });
    }

    /// Adds an unindexed facet, as read from an STL.
    pub fn push_facet(&mut self, corners: [DVec3; 3]) {
        let indices = corners.map(|p| self.push_vertex(Vertex::new(p)));
        self.push_triangle(indices);
    }

    /// Names the texture image the UVs refer to.
    pub fn set_texture_path(&mut self, path: impl Into<String>) {
        self.texture_path = Some(path.into());
    }

    pub fn texture_path(&self) -> Option<&str> {
        self.texture_path.as_deref()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Unitless extent of the finite staged points; zero when empty.
    pub fn size(&self) -> DVec3 {
        let mut points = self
            .vertices
            .iter()
            .map(|v| v.position)
            .filter(|p| p.is_finite());
        let Some(first) = points.next() else {
            return DVec3::ZERO;
        };
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        max - min
    }

    /// Imports the staged mesh into `object`/`mesh` of `doc` as a new
    /// volume.
    ///
    /// A slot is created when its index equals the current count. When the
    /// Document has no geometry its units become the import units; otherwise
    /// points are converted from the import units.
    pub fn commit(
        self,
        doc: &mut Document,
        object: usize,
        mesh: usize,
        options: &ImportOptions,
        resolver: &dyn TextureResolver,
        progress: &Progress,
    ) -> AmfResult<ImportReport> {
        let object_count = doc.object_count();
        if object > object_count {
            return Err(AmfError::out_of_range(EntityKind::Object, object, object_count));
        }
        let mesh_count = if object < object_count { doc.mesh_count(object)? } else { 0 };
        if mesh > mesh_count {
            return Err(AmfError::out_of_range(EntityKind::Mesh, mesh, mesh_count));
        }

        info!(
            format = %self.format,
            triangles = self.triangles.len(),
            vertices = self.vertices.len(),
            strict = options.strict,
            "Starting mesh import"
        );
        progress.begin(self.triangles.len() as u64, format!("Importing {}", self.format));

        let mut report = ImportReport {
            object,
            mesh,
            ..ImportReport::default()
        };
        let fresh = !doc.has_geometry();
        let factor = if fresh {
            1.0
        } else {
            convert_units(1.0, doc.import_units(), doc.units())
        };

        let texture = match &self.texture_path {
            Some(path) => match resolver.resolve(path) {
                Some(texture) => Some(texture),
                None if options.strict => {
                    return Err(AmfError::MissingResource { path: path.clone() });
                }
                None => {
                    warn!(path = %path, "texture not found, importing untextured");
                    report.missing_texture = Some(path.clone());
                    report.warnings.push(format!("texture not found: {path}"));
                    None
                }
            },
            None => None,
        };
        let texture_index = doc.texture_count();

        let mut welder = Welder::default();
        let remap = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, vertex)| {
                if vertex.position.is_finite() {
                    Ok(Some(welder.insert(vertex)))
                } else {
                    report.reject(options.strict, format!("vertex {i} is not finite"))?;
                    Ok(None)
                }
            })
            .collect::<AmfResult<Vec<_>>>()?;
        report.merged_vertices = welder.merged;
        report.conflicting_attributes = welder.conflicts;
        if welder.merged > 0 {
            debug!(
                merged = welder.merged,
                conflicts = welder.conflicts,
                "merged coincident vertices"
            );
        }

        let mut volume = Volume::new(self.name.clone());
        let batch = options.config.progress_batch.max(1);
        for (chunk_index, chunk) in self.triangles.chunks(batch).enumerate() {
            progress.checkpoint()?;
            for (offset, staged) in chunk.iter().enumerate() {
                let n = chunk_index * batch + offset;
                let resolved = staged
                    .indices
                    .map(|i| remap.get(i as usize).copied().flatten());
                let [Some(a), Some(b), Some(c)] = resolved else {
                    report.reject(
                        options.strict,
                        format!("triangle {n} references missing vertices {:?}", staged.indices),
                    )?;
                    continue;
                };
                if a == b || b == c || c == a {
                    report.reject(options.strict, format!("triangle {n} is degenerate"))?;
                    continue;
                }
                volume.triangles.push(Triangle {
                    indices: [a, b, c],
                    tex_map: match (&texture, staged.uv) {
                        (Some(_), Some(uv)) => Some(TexMap {
                            texture: texture_index,
                            uv,
                        }),
                        _ => None,
                    },
                });
            }
            progress.advance(chunk.len() as u64);
        }

        let mut vertices = welder.vertices;
        if !approx_equal(factor, 1.0) {
            for v in &mut vertices {
                v.position *= factor;
            }
        }
        report.vertices = vertices.len();
        report.triangles = volume.triangles.len();

        // Nothing below can fail once the slots are known to exist.
        report.volume = doc.append_volume(object, mesh, vertices, volume)?;
        if let Some(texture) = texture {
            doc.add_texture(texture);
        }
        if fresh {
            doc.set_units(doc.import_units());
        }

        info!(
            vertices = report.vertices,
            triangles = report.triangles,
            merged = report.merged_vertices,
            skipped = report.skipped,
            "Mesh import complete"
        );
        Ok(report)
    }
}

impl ImportReport {
    /// Fails in strict mode, otherwise records the problem and carries on.
    fn reject(&mut self, strict: bool, message: String) -> AmfResult<()> {
        if strict {
            return Err(AmfError::MalformedInput(message));
        }
        warn!(%message, "skipping malformed fragment");
        self.skipped += 1;
        self.warnings.push(message);
        Ok(())
    }
}

/// Merges points that coincide once quantized at `COORDINATE_SCALE`.
///
/// The first point of a group keeps its position and attributes. A later
/// point only fills a normal or color the kept point lacks; one that
/// disagrees is counted in `conflicts`.
#[derive(Default)]
struct Welder {
    vertices: Vec<Vertex>,
    lookup: HashMap<[i64; 3], u32>,
    merged: usize,
    conflicts: usize,
}

impl Welder {
    fn insert(&mut self, vertex: &Vertex) -> u32 {
        let key = vertex
            .position
            .to_array()
            .map(|c| (c * COORDINATE_SCALE).round() as i64);
        if let Some(&index) = self.lookup.get(&key) {
            self.merged += 1;
            let kept = &mut self.vertices[index as usize];
            let mut conflict = false;
            match (kept.normal, vertex.normal) {
                (None, normal) => kept.normal = normal,
                (Some(a), Some(b)) => conflict |= a.distance(b) > EPSILON,
                (Some(_), None) => {}
            }
            match (kept.color, vertex.color) {
                (None, color) => kept.color = color,
                (Some(a), Some(b)) => conflict |= a.to_rgba8() != b.to_rgba8(),
                (Some(_), None) => {}
            }
            self.conflicts += usize::from(conflict);
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(*vertex);
        self.lookup.insert(key, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_doc::{Color, UnitSystem};
    use approx::assert_relative_eq;

    fn square(scale: f64) -> StagedMesh {
        let p = |x: f64, y: f64| DVec3::new(x * scale, y * scale, 0.0);
        StagedMesh::from_soup(
            MeshFormat::Stl,
            [
                [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)],
                [p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)],
            ],
        )
    }

    fn commit(staged: StagedMesh, doc: &mut Document, options: &ImportOptions) -> AmfResult<ImportReport> {
        staged.commit(doc, 0, 0, options, &NoTextures, &Progress::new())
    }

    #[test]
    fn test_coincident_points_are_merged() {
        let mut doc = Document::new();
        let report = commit(square(1.0), &mut doc, &ImportOptions::default()).unwrap();
        assert_eq!(report.vertices, 4);
        assert_eq!(report.merged_vertices, 2);
        assert_eq!(doc.mesh(0, 0).unwrap().vertex_count(), 4);
    }

    #[test]
    fn test_merge_fills_missing_attributes_and_counts_conflicts() {
        let red = Color::rgb(1.0, 0.0, 0.0);
        let blue = Color::rgb(0.0, 0.0, 1.0);
        let mut staged = StagedMesh::new(MeshFormat::X3d);
        let a = staged.push_vertex(Vertex::new(DVec3::ZERO));
        let b = staged.push_vertex(Vertex::new(DVec3::X).with_color(red));
        let c = staged.push_vertex(Vertex::new(DVec3::Y));
        // Same point as `a`, bringing a normal.
        let a2 = staged.push_vertex(Vertex::new(DVec3::ZERO).with_normal(DVec3::Z));
        // Same point as `b`, with a different color.
        let b2 = staged.push_vertex(Vertex::new(DVec3::X).with_color(blue));
        staged.push_triangle([a, b, c]);
        staged.push_triangle([a2, b2, c]);

        let mut doc = Document::new();
        let report = commit(staged, &mut doc, &ImportOptions::default()).unwrap();
        assert_eq!(report.merged_vertices, 2);
        assert_eq!(report.conflicting_attributes, 1);

        let vertices = &doc.mesh(0, 0).unwrap().vertices;
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].normal, Some(DVec3::Z));
        assert_eq!(vertices[1].color, Some(red));
    }

    #[test]
    fn test_first_import_sets_units() {
        let mut doc = Document::new();
        doc.set_import_units(UnitSystem::Inches);
        commit(square(1.0), &mut doc, &ImportOptions::default()).unwrap();
        assert_eq!(doc.units(), UnitSystem::Inches);
        let (_, max) = doc.object(0).unwrap().bounding_box().unwrap();
        assert_relative_eq!(max.x, 1.0);
    }

    #[test]
    fn test_later_imports_are_converted() {
        let mut doc = Document::new();
        commit(square(1.0), &mut doc, &ImportOptions::default()).unwrap();
        assert_eq!(doc.units(), UnitSystem::Millimeters);

        doc.set_import_units(UnitSystem::Inches);
        let report = square(1.0)
            .commit(&mut doc, 1, 0, &ImportOptions::default(), &NoTextures, &Progress::new())
            .unwrap();
        assert_eq!(report.object, 1);
        let (_, max) = doc.object(1).unwrap().bounding_box().unwrap();
        assert_relative_eq!(max.x, 25.4);
        assert_eq!(doc.units(), UnitSystem::Millimeters);
    }

    #[test]
    fn test_slot_gaps_are_rejected() {
        let mut doc = Document::new();
        let err = square(1.0)
            .commit(&mut doc, 1, 0, &ImportOptions::default(), &NoTextures, &Progress::new())
            .unwrap_err();
        assert!(matches!(err, AmfError::IndexOutOfRange { kind: EntityKind::Object, .. }));
        assert_eq!(doc.object_count(), 0);
    }

    #[test]
    fn test_strict_rejects_degenerate_lenient_skips() {
        let mut staged = square(1.0);
        staged.push_facet([DVec3::ZERO, DVec3::ZERO, DVec3::X]);
        staged.push_triangle([0, 1, 99]);

        let mut doc = Document::new();
        let err = commit(staged.clone(), &mut doc, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, AmfError::MalformedInput(_)));
        assert_eq!(doc, Document::new());

        let report = commit(staged, &mut doc, &ImportOptions::lenient()).unwrap();
        assert_eq!(report.triangles, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_non_finite_vertex() {
        let mut staged = square(1.0);
        staged.push_facet([DVec3::new(f64::NAN, 0.0, 0.0), DVec3::X, DVec3::Y]);
        let mut doc = Document::new();
        assert!(commit(staged.clone(), &mut doc, &ImportOptions::default()).is_err());
        let report = commit(staged, &mut doc, &ImportOptions::lenient()).unwrap();
        // One bad vertex, one triangle using it.
        assert_eq!(report.skipped, 2);
        assert_eq!(report.triangles, 2);
    }

    #[test]
    fn test_missing_texture() {
        let mut staged = StagedMesh::new(MeshFormat::X3d);
        let a = staged.push_vertex(Vertex::new(DVec3::ZERO));
        let b = staged.push_vertex(Vertex::new(DVec3::X));
        let c = staged.push_vertex(Vertex::new(DVec3::Y));
        staged.push_textured_triangle([a, b, c], [DVec2::ZERO, DVec2::X, DVec2::Y]);
        staged.set_texture_path("wood.png");

        let mut doc = Document::new();
        assert_eq!(
            commit(staged.clone(), &mut doc, &ImportOptions::default()),
            Err(AmfError::MissingResource {
                path: "wood.png".to_string()
            })
        );
        assert_eq!(doc.object_count(), 0);

        let report = commit(staged.clone(), &mut doc, &ImportOptions::lenient()).unwrap();
        assert_eq!(report.missing_texture.as_deref(), Some("wood.png"));
        assert_eq!(doc.texture_count(), 0);
        assert!(doc.volume(0, 0, 0).unwrap().triangles[0].tex_map.is_none());

        let textures =
            |path: &str| (path == "wood.png").then(|| Texture::solid("wood", Color::rgb(0.5, 0.3, 0.1)));
        staged
            .commit(&mut doc, 0, 0, &ImportOptions::default(), &textures, &Progress::new())
            .unwrap();
        assert_eq!(doc.texture_count(), 1);
        let map = doc.volume(0, 0, 1).unwrap().triangles[0].tex_map.unwrap();
        assert_eq!(map.texture, 0);
    }

    #[test]
    fn test_cancel_leaves_document_unchanged() {
        let mut staged = StagedMesh::new(MeshFormat::Stl);
        for i in 0..100 {
            let x = f64::from(i);
            staged.push_facet([DVec3::new(x, 0.0, 0.0), DVec3::new(x + 1.0, 0.0, 0.0), DVec3::new(x, 1.0, 0.0)]);
        }
        let mut doc = Document::new();
        doc.add_object("keep");
        let before = doc.clone();

        let progress = Progress::new();
        progress.cancel();
        let options = ImportOptions {
            config: EngineConfig::new(1000, config::constants::MAX_SLICE_PIXELS, 10).unwrap(),
            ..ImportOptions::default()
        };
        let err = staged
            .commit(&mut doc, 0, 0, &options, &NoTextures, &progress)
            .unwrap_err();
        assert_eq!(err, AmfError::Cancelled);
        assert_eq!(doc, before);
        assert_eq!(progress.current(), 0);
    }
}
