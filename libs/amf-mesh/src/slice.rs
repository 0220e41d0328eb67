//! # Color Slicing
//!
//! Rasterizes the Document at a Z height into an RGBA bitmap covering the
//! whole-Document envelope in XY.
//!
//! ## Plane Rule
//!
//! A triangle is active at `z` iff `zmin <= z < zmax`. A vertex is above the
//! plane iff `v.z >= z`; an edge crosses iff its ends are on opposite sides.
//! The rule is half-open, so a plane through a vertex or edge never counts a
//! crossing twice and flat triangles never intersect.
//!
//! ## Fill Rule
//!
//! Even-odd within a volume, so holes are honoured. Across volumes the last
//! volume in render order that covers a pixel owns it.
//!
//! ## Surface Depth
//!
//! A filled pixel within `surface_depth` (3D distance) of its volume's
//! surface takes the surface color at the closest surface point, so colored
//! caps extend into the slices below and above them.
//!
//! ## Cache
//!
//! Per volume, triangles are kept sorted by `zmin` with a cursor and an
//! active set. Ascending heights advance the cursor; a lower height rewinds
//! it. The active set stays sorted by triangle id, so a slice never depends
//! on the order of earlier calls. A different Document, a new revision or a
//! subdivision level change rebuilds the cache.

use amf_doc::{AmfError, AmfResult, Color, Document, Progress};
use config::constants::EngineConfig;
use glam::{DVec2, DVec3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::envelope::{scene_envelope, Envelope};
use crate::flatten::flatten;
use crate::subdivide::refine_document;
use crate::world::{world_volumes, WorldTriangle, WorldVolume};

/// An RGBA8 image, rows top (max Y) to bottom, pixels left (min X) to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceBitmap {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl SliceBitmap {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.width + x) * 4;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A 2D boundary segment of a cross-section, in world XY.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceSegment {
    pub start: DVec2,
    pub end: DVec2,
    /// Render item the segment belongs to.
    pub render: usize,
}

/// A plane crossing of one triangle.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    start: DVec2,
    end: DVec2,
}

#[derive(Debug)]
struct VolumeCache {
    volume: WorldVolume,
    /// Indices into `volume.triangles`, sorted by `zmin`.
    order: Vec<usize>,
    cursor: usize,
    /// Indices into `volume.triangles`, sorted by triangle id.
    active: Vec<usize>,
    last_z: f64,
}

impl VolumeCache {
    fn new(volume: WorldVolume) -> Self {
        let mut order: Vec<usize> = (0..volume.triangles.len()).collect();
        order.sort_by(|&a, &b| {
            volume.triangles[a]
                .zmin
                .total_cmp(&volume.triangles[b].zmin)
                .then(a.cmp(&b))
        });
        Self {
            volume,
            order,
            cursor: 0,
            active: Vec::new(),
            last_z: f64::NEG_INFINITY,
        }
    }

    fn advance(&mut self, z: f64) {
        if z < self.last_z {
            self.cursor = 0;
            self.active.clear();
        }
        let triangles = &self.volume.triangles;
        while let Some(&next) = self.order.get(self.cursor) {
            if triangles[next].zmin > z {
                break;
            }
            let id = triangles[next].id;
            let slot = self
                .active
                .partition_point(|&a| triangles[a].id < id);
            self.active.insert(slot, next);
            self.cursor += 1;
        }
        self.active.retain(|&i| triangles[i].zmax > z);
        self.last_z = z;
    }

    fn crossings(&self, z: f64) -> Vec<Crossing> {
        self.active
            .iter()
            .filter_map(|&i| cross(&self.volume.triangles[i], z))
            .collect()
    }

    /// Triangles whose Z extent comes within `depth` of `z`, in id order.
    fn near_surface(&self, z: f64, depth: f64) -> Vec<usize> {
        if depth <= 0.0 {
            return Vec::new();
        }
        let triangles = &self.volume.triangles;
        let mut near: Vec<usize> = (0..triangles.len())
            .filter(|&i| triangles[i].zmin <= z + depth && triangles[i].zmax >= z - depth)
            .collect();
        near.sort_by_key(|&i| triangles[i].id);
        near
    }
}

fn cross(triangle: &WorldTriangle, z: f64) -> Option<Crossing> {
    let above = triangle.corners.map(|c| c.z >= z);
    let mut ends = [DVec2::ZERO; 2];
    let mut found = 0;
    for (a, b) in [(0, 1), (1, 2), (2, 0)] {
        if above[a] == above[b] || found == 2 {
            continue;
        }
        let (pa, pb) = (triangle.corners[a], triangle.corners[b]);
        let t = (z - pa.z) / (pb.z - pa.z);
        ends[found] = pa.lerp(pb, t).truncate();
        found += 1;
    }
    (found == 2).then(|| Crossing {
        start: ends[0],
        end: ends[1],
    })
}

#[derive(Debug)]
struct SliceCache {
    document: u64,
    revision: u64,
    level: u32,
    envelope: Envelope,
    volumes: Vec<VolumeCache>,
}

/// Slices a Document, keeping per-volume state between calls.
///
/// ```
/// use amf_doc::{Document, Progress};
/// use amf_mesh::Slicer;
///
/// let doc = Document::new();
/// let mut slicer = Slicer::new();
/// let bitmap = slicer.slice(&doc, 0.1, 0.1, 0.0, 0.0, &Progress::new()).unwrap();
/// assert!(bitmap.is_empty());
/// assert!(slicer.slice(&doc, 0.0, 0.1, 0.0, 0.0, &Progress::new()).is_err());
/// ```
#[derive(Debug, Default)]
pub struct Slicer {
    config: EngineConfig,
    cache: Option<SliceCache>,
}

impl Slicer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config, cache: None }
    }

    /// Drops the cache; the next call rebuilds it.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Renders the slice at `z`. Pixel sizes are in Document units;
    /// `surface_depth` extrudes surface colors that far into each volume.
    pub fn slice(
        &mut self,
        doc: &Document,
        pixel_size_x: f64,
        pixel_size_y: f64,
        z: f64,
        surface_depth: f64,
        progress: &Progress,
    ) -> AmfResult<SliceBitmap> {
        for (name, size) in [("pixel_size_x", pixel_size_x), ("pixel_size_y", pixel_size_y)] {
            if !size.is_finite() || size <= 0.0 {
                return Err(AmfError::invalid(format!("{name} must be positive, got {size}")));
            }
        }
        if !z.is_finite() {
            return Err(AmfError::invalid(format!("slice height must be finite, got {z}")));
        }
        if !surface_depth.is_finite() || surface_depth < 0.0 {
            return Err(AmfError::invalid(format!(
                "surface depth must be non-negative, got {surface_depth}"
            )));
        }

        let max_pixels = self.config.max_pixels;
        let cache = self.prepare(doc, progress)?;
        let envelope = cache.envelope;
        if cache.volumes.is_empty() || envelope == Envelope::EMPTY {
            progress.begin(0, "Slicing");
            return Ok(SliceBitmap::default());
        }
        let (width, height) = grid(envelope.size, pixel_size_x, pixel_size_y, max_pixels)?;

        for volume in &mut cache.volumes {
            volume.advance(z);
        }
        let crossings: Vec<Vec<Crossing>> = cache.volumes.iter().map(|v| v.crossings(z)).collect();
        let surfaces: Vec<Vec<usize>> = cache
            .volumes
            .iter()
            .map(|v| v.near_surface(z, surface_depth))
            .collect();
        debug!(
            z,
            width,
            height,
            segments = crossings.iter().map(Vec::len).sum::<usize>(),
            "slicing"
        );

        progress.begin(height as u64, "Slicing");
        let volumes = &cache.volumes;
        let mut rgba = vec![0u8; width * height * 4];
        rgba.par_chunks_mut(width * 4)
            .enumerate()
            .try_for_each(|(row, pixels)| {
                progress.checkpoint()?;
                let y = envelope.max.y - (row as f64 + 0.5) * pixel_size_y;
                let mut owner: Vec<Option<usize>> = vec![None; width];
                for (v, segments) in crossings.iter().enumerate() {
                    fill_row(segments, y, envelope.min.x, pixel_size_x, v, &mut owner);
                }
                let near: Vec<Vec<usize>> = surfaces
                    .iter()
                    .zip(volumes)
                    .map(|(candidates, cache)| {
                        let triangles = &cache.volume.triangles;
                        candidates
                            .iter()
                            .copied()
                            .filter(|&i| {
                                triangles[i].min_y() <= y + surface_depth
                                    && triangles[i].max_y() >= y - surface_depth
                            })
                            .collect()
                    })
                    .collect();
                for (column, cell) in owner.into_iter().enumerate() {
                    let Some(v) = cell else { continue };
                    let x = envelope.min.x + (column as f64 + 0.5) * pixel_size_x;
                    let point = DVec3::new(x, y, z);
                    let color = shade(doc, &volumes[v].volume, &near[v], point, surface_depth);
                    pixels[column * 4..column * 4 + 4].copy_from_slice(&color.to_rgba8());
                }
                progress.advance(1);
                Ok(())
            })?;

        Ok(SliceBitmap {
            width,
            height,
            rgba,
        })
    }

    /// The cross-section boundary at `z`, in render order.
    pub fn segments(&mut self, doc: &Document, z: f64) -> AmfResult<Vec<SliceSegment>> {
        if !z.is_finite() {
            return Err(AmfError::invalid(format!("slice height must be finite, got {z}")));
        }
        let cache = self.prepare(doc, &Progress::new())?;
        let mut segments = Vec::new();
        for volume in &mut cache.volumes {
            volume.advance(z);
            let render = volume.volume.render;
            segments.extend(volume.crossings(z).into_iter().map(|c| SliceSegment {
                start: c.start,
                end: c.end,
                render,
            }));
        }
        Ok(segments)
    }

    fn prepare(&mut self, doc: &Document, progress: &Progress) -> AmfResult<&mut SliceCache> {
        let stale = self.cache.as_ref().map_or(true, |c| {
            c.document != doc.id()
                || c.revision != doc.revision()
                || c.level != doc.subdivision_level()
        });
        if stale {
            info!(
                document = doc.id(),
                revision = doc.revision(),
                level = doc.subdivision_level(),
                "Rebuilding slice cache"
            );
            let meshes = refine_document(doc, &self.config, progress)?;
            let items = flatten(doc);
            let envelope = scene_envelope(doc, &items);
            let volumes = world_volumes(&items, &meshes)
                .into_iter()
                .map(VolumeCache::new)
                .collect();
            self.cache = Some(SliceCache {
                document: doc.id(),
                revision: doc.revision(),
                level: doc.subdivision_level(),
                envelope,
                volumes,
            });
        }
        self.cache
            .as_mut()
            .ok_or_else(|| AmfError::invalid("slice cache unavailable"))
    }
}

/// Grid size for the envelope, refused above `max_pixels`.
fn grid(size: DVec3, pixel_size_x: f64, pixel_size_y: f64, max_pixels: usize) -> AmfResult<(usize, usize)> {
    let columns = (size.x / pixel_size_x).ceil().max(1.0);
    let rows = (size.y / pixel_size_y).ceil().max(1.0);
    // Saturating casts; an oversized grid fails the checked products.
    let (width, height) = (columns as usize, rows as usize);
    match width.checked_mul(height) {
        Some(pixels) if pixels <= max_pixels && pixels.checked_mul(4).is_some() => Ok((width, height)),
        _ => Err(AmfError::TooManyPixels {
            width: columns,
            height: rows,
            max: max_pixels,
        }),
    }
}

/// Marks the pixels of one row covered by a volume, even-odd.
fn fill_row(
    segments: &[Crossing],
    y: f64,
    min_x: f64,
    pixel_size_x: f64,
    volume: usize,
    owner: &mut [Option<usize>],
) {
    let mut xs: Vec<f64> = segments
        .iter()
        .filter(|s| (s.start.y > y) != (s.end.y > y))
        .map(|s| s.start.x + (y - s.start.y) * (s.end.x - s.start.x) / (s.end.y - s.start.y))
        .collect();
    xs.sort_by(f64::total_cmp);
    for span in xs.chunks_exact(2) {
        // First and last pixel centers inside [span[0], span[1]).
        let first = ((span[0] - min_x) / pixel_size_x - 0.5).ceil().max(0.0) as usize;
        let last = ((span[1] - min_x) / pixel_size_x - 0.5).ceil();
        if last <= 0.0 {
            continue;
        }
        let last = (last as usize).min(owner.len());
        for slot in owner.iter_mut().take(last).skip(first) {
            *slot = Some(volume);
        }
    }
}

/// Color of a filled pixel. `near` holds the candidate surface triangles.
fn shade(doc: &Document, volume: &WorldVolume, near: &[usize], point: DVec3, surface_depth: f64) -> Color {
    if surface_depth > 0.0 {
        let nearest = near
            .iter()
            .map(|&i| {
                let (weights, distance) = volume.triangles[i].closest_point(point);
                (i, weights, distance)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2));
        if let Some((triangle, weights, distance)) = nearest {
            if distance <= surface_depth {
                return surface_color(doc, volume, triangle, weights, point);
            }
        }
    }
    volume.interior_color(doc, point)
}

fn surface_color(doc: &Document, volume: &WorldVolume, triangle: usize, weights: [f64; 3], point: DVec3) -> Color {
    let triangle = &volume.triangles[triangle];

    if let Some(map) = triangle.tex_map {
        if let Some(texture) = doc.resolve_texture(map.texture) {
            let uv = map.uv[0] * weights[0] + map.uv[1] * weights[1] + map.uv[2] * weights[2];
            return texture.sample(uv);
        }
    }
    if let Some(colors) = triangle.colors {
        return Color::interpolate(colors, weights);
    }
    volume.interior_color(doc, point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn triangle(corners: [DVec3; 3], id: u32) -> WorldTriangle {
        WorldTriangle {
            id,
            corners,
            zmin: corners.iter().map(|c| c.z).fold(f64::INFINITY, f64::min),
            zmax: corners.iter().map(|c| c.z).fold(f64::NEG_INFINITY, f64::max),
            colors: None,
            tex_map: None,
        }
    }

    #[test]
    fn test_plane_through_vertex_is_half_open() {
        let t = triangle([DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 1.0), DVec3::new(0.0, 1.0, 1.0)], 0);
        // At the bottom vertex every corner counts as above: no crossing.
        assert!(cross(&t, 0.0).is_none());
        let mid = cross(&t, 0.5).unwrap();
        assert_eq!(mid.start, DVec2::new(0.5, 0.0));
        assert_eq!(mid.end, DVec2::new(0.0, 0.5));
        let flat = triangle([DVec3::ZERO, DVec3::X, DVec3::Y], 1);
        assert!(cross(&flat, 0.0).is_none());
    }

    #[test]
    fn test_active_set_is_history_independent() {
        let volume = WorldVolume {
            render: 0,
            pose: Pose::IDENTITY,
            material: None,
            color: None,
            triangles: vec![
                triangle([DVec3::new(0.0, 0.0, 2.0), DVec3::new(1.0, 0.0, 5.0), DVec3::new(0.0, 1.0, 5.0)], 0),
                triangle([DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 3.0), DVec3::new(0.0, 1.0, 3.0)], 1),
                triangle([DVec3::new(0.0, 0.0, 1.0), DVec3::new(1.0, 0.0, 4.0), DVec3::new(0.0, 1.0, 4.0)], 2),
            ],
        };
        let mut ascending = VolumeCache::new(volume.clone());
        for z in [0.5, 1.5, 2.5] {
            ascending.advance(z);
        }
        let mut direct = VolumeCache::new(volume.clone());
        direct.advance(2.5);
        assert_eq!(ascending.active, direct.active);
        assert_eq!(ascending.active, vec![0, 1, 2]);

        ascending.advance(3.5);
        assert_eq!(ascending.active, vec![0, 2]);
        ascending.advance(1.5);
        assert_eq!(ascending.active, vec![1, 2], "rewinds on lower z");
    }

    #[test]
    fn test_grid_is_bounded() {
        let size = DVec3::new(4.0, 2.0, 1.0);
        assert_eq!(grid(size, 1.0, 1.0, 8), Ok((4, 2)));
        assert_eq!(grid(DVec3::ZERO, 1.0, 1.0, 8), Ok((1, 1)));
        assert!(matches!(
            grid(size, 1.0, 0.5, 8),
            Err(AmfError::TooManyPixels { max: 8, .. })
        ));
        assert!(grid(size, 1e-300, 1e-300, usize::MAX).is_err());
    }

    #[test]
    fn test_fill_row_even_odd() {
        let seg = |x0: f64, x1: f64| Crossing {
            start: DVec2::new(x0, -1.0),
            end: DVec2::new(x1, 1.0),
        };
        // Outer span [0, 10), hole [4, 6).
        let segments = [seg(0.0, 0.0), seg(10.0, 10.0), seg(4.0, 4.0), seg(6.0, 6.0)];
        let mut owner = vec![None; 10];
        fill_row(&segments, 0.0, 0.0, 1.0, 3, &mut owner);
        let filled: Vec<bool> = owner.iter().map(Option::is_some).collect();
        assert_eq!(
            filled,
            [true, true, true, true, false, false, true, true, true, true]
        );
    }
}
