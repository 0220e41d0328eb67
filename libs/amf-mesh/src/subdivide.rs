//! # Curved-Triangle Subdivision
//!
//! Each level splits every triangle into four through its edge midpoints.
//! Midpoints are shared between the triangles of a mesh, so neighbours stay
//! connected. When both ends of an edge carry normals the midpoint is lifted
//! onto a cubic Hermite curve whose end tangents are the edge projected into
//! each end's tangent plane; otherwise the midpoint stays on the chord.

use std::borrow::Cow;
use std::collections::HashMap;

use amf_doc::{AmfError, AmfResult, Color, Document, Mesh, Progress, TexMap, Triangle, Vertex, Volume};
use config::constants::{projected_triangles, EngineConfig};
use glam::{DVec2, DVec3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Subdivides `mesh` `level` times. Level 0 returns an identical copy.
///
/// ```
/// use amf_doc::{Mesh, Triangle, Vertex, Volume};
/// use amf_mesh::subdivide_mesh;
/// use glam::DVec3;
///
/// let mut mesh = Mesh::new();
/// for p in [DVec3::ZERO, DVec3::X, DVec3::Y] {
///     mesh.add_vertex(Vertex::new(p));
/// }
/// let mut volume = Volume::new("v");
/// volume.triangles.push(Triangle::new(0, 1, 2));
/// mesh.volumes.push(volume);
///
/// let refined = subdivide_mesh(&mesh, 2);
/// assert_eq!(refined.triangle_count(), 16);
/// assert_eq!(refined.vertex_count(), 15);
/// ```
pub fn subdivide_mesh(mesh: &Mesh, level: u32) -> Mesh {
    let mut current = mesh.clone();
    for i in 0..level {
        current = subdivide_once(&current);
        debug!(
            level = i + 1,
            triangles = current.triangle_count(),
            vertices = current.vertex_count(),
            "subdivision pass"
        );
    }
    current
}

/// Refines every mesh of the Document at its subdivision level, returning
/// the meshes grouped per object.
///
/// The projected triangle count is checked against `config.max_triangles`
/// before anything is allocated. Meshes are refined in parallel and the
/// cancellation flag is polled once per mesh.
pub fn refine_document(
    doc: &Document,
    config: &EngineConfig,
    progress: &Progress,
) -> AmfResult<Vec<Vec<Mesh>>> {
    let level = doc.subdivision_level();
    let triangles = doc.triangle_count();
    match projected_triangles(triangles, level) {
        Some(count) if count <= config.max_triangles => {}
        projected => {
            return Err(AmfError::TooManyTriangles {
                count: projected.unwrap_or(usize::MAX),
                max: config.max_triangles,
            })
        }
    }

    let jobs: Vec<&Mesh> = doc.objects().iter().flat_map(|o| &o.meshes).collect();
    progress.begin(jobs.len() as u64, "Subdividing");
    if level > 0 {
        info!(level, triangles, meshes = jobs.len(), "Starting subdivision");
    }

    let refined = jobs
        .par_iter()
        .map(|mesh| {
            progress.checkpoint()?;
            let refined = subdivide_mesh(&sanitized(mesh), level);
            progress.advance(1);
            Ok(refined)
        })
        .collect::<AmfResult<Vec<_>>>()?;

    let mut refined = refined.into_iter();
    let grouped = doc
        .objects()
        .iter()
        .map(|o| refined.by_ref().take(o.meshes.len()).collect())
        .collect();
    if level > 0 {
        info!(level, "Subdivision complete");
    }
    Ok(grouped)
}

/// Drops triangles whose indices do not resolve. Only deserialized
/// Documents can carry them.
fn sanitized(mesh: &Mesh) -> Cow<'_, Mesh> {
    if mesh.validate() {
        return Cow::Borrowed(mesh);
    }
    let count = mesh.vertices.len() as u32;
    let mut clean = mesh.clone();
    for volume in &mut clean.volumes {
        let before = volume.triangles.len();
        volume.triangles.retain(|t| t.indices.iter().all(|&i| i < count));
        if volume.triangles.len() < before {
            warn!(
                volume = %volume.name,
                dropped = before - volume.triangles.len(),
                "dropping triangles with missing vertices"
            );
        }
    }
    Cow::Owned(clean)
}

fn subdivide_once(mesh: &Mesh) -> Mesh {
    let mut vertices = mesh.vertices.clone();
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut volumes = Vec::with_capacity(mesh.volumes.len());

    for volume in &mesh.volumes {
        let mut triangles = Vec::with_capacity(volume.triangles.len() * 4);
        for triangle in &volume.triangles {
            let [v0, v1, v2] = triangle.indices;
            let m01 = midpoint(v0, v1, &mesh.vertices, &mut vertices, &mut midpoints);
            let m12 = midpoint(v1, v2, &mesh.vertices, &mut vertices, &mut midpoints);
            let m20 = midpoint(v2, v0, &mesh.vertices, &mut vertices, &mut midpoints);

            let maps = triangle.tex_map.map(split_tex_map);
            let corners = [
                [v0, m01, m20],
                [v1, m12, m01],
                [v2, m20, m12],
                [m01, m12, m20],
            ];
            for (k, indices) in corners.into_iter().enumerate() {
                triangles.push(Triangle {
                    indices,
                    tex_map: maps.map(|m| m[k]),
                });
            }
        }
        volumes.push(Volume {
            name: volume.name.clone(),
            material: volume.material,
            color: volume.color,
            triangles,
        });
    }

    Mesh { vertices, volumes }
}

fn midpoint(
    a: u32,
    b: u32,
    source: &[Vertex],
    vertices: &mut Vec<Vertex>,
    midpoints: &mut HashMap<(u32, u32), u32>,
) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    *midpoints.entry(key).or_insert_with(|| {
        let index = vertices.len() as u32;
        vertices.push(midpoint_vertex(&source[key.0 as usize], &source[key.1 as usize]));
        index
    })
}

fn midpoint_vertex(a: &Vertex, b: &Vertex) -> Vertex {
    let (position, normal) = match (a.normal, b.normal) {
        (Some(na), Some(nb)) => (
            hermite_midpoint(a.position, na, b.position, nb),
            (na + nb).try_normalize(),
        ),
        _ => ((a.position + b.position) * 0.5, None),
    };
    let color = match (a.color, b.color) {
        (Some(ca), Some(cb)) => Some(Color::interpolate([ca, cb, cb], [0.5, 0.5, 0.0])),
        _ => None,
    };
    Vertex {
        position,
        normal,
        color,
    }
}

/// Cubic Hermite curve at `t = 0.5`.
pub(crate) fn hermite_midpoint(p0: DVec3, n0: DVec3, p1: DVec3, n1: DVec3) -> DVec3 {
    let edge = p1 - p0;
    let t0 = edge - n0 * edge.dot(n0);
    let t1 = edge - n1 * edge.dot(n1);
    (p0 + p1) * 0.5 + (t0 - t1) * 0.125
}

fn split_tex_map(map: TexMap) -> [TexMap; 4] {
    let [u0, u1, u2] = map.uv;
    let mid = |a: DVec2, b: DVec2| (a + b) * 0.5;
    let (u01, u12, u20) = (mid(u0, u1), mid(u1, u2), mid(u2, u0));
    [[u0, u01, u20], [u1, u12, u01], [u2, u20, u12], [u01, u12, u20]].map(|uv| TexMap {
        texture: map.texture,
        uv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ] {
            mesh.add_vertex(Vertex::new(p).with_normal(DVec3::Z));
        }
        let mut volume = Volume::new("quad");
        volume.triangles = vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)];
        mesh.volumes.push(volume);
        mesh
    }

    #[test]
    fn test_growth_is_four_per_level() {
        let mesh = quad();
        for level in 0..4 {
            let refined = subdivide_mesh(&mesh, level);
            assert_eq!(refined.triangle_count(), 2 * 4usize.pow(level));
            assert!(refined.validate());
        }
    }

    #[test]
    fn test_shared_edge_midpoint_is_reused() {
        let refined = subdivide_mesh(&quad(), 1);
        // 4 corners + 5 distinct edges.
        assert_eq!(refined.vertex_count(), 9);
    }

    #[test]
    fn test_flat_normals_keep_midpoints_on_plane() {
        let refined = subdivide_mesh(&quad(), 2);
        assert!(refined.vertices.iter().all(|v| v.position.z.abs() < 1e-12));
    }

    #[test]
    fn test_radial_normals_bulge_outwards() {
        let p0 = DVec3::X;
        let p1 = DVec3::Y;
        let mid = hermite_midpoint(p0, p0, p1, p1);
        let flat = (p0 + p1) * 0.5;
        assert!(mid.length() > flat.length());
        assert!(mid.length() < 1.0);
        assert_relative_eq!(mid.x, mid.y, epsilon = 1e-12);
    }

    #[test]
    fn test_uv_and_colors_interpolated() {
        let mut mesh = Mesh::new();
        let red = Color::rgb(1.0, 0.0, 0.0);
        let blue = Color::rgb(0.0, 0.0, 1.0);
        mesh.add_vertex(Vertex::new(DVec3::ZERO).with_color(red));
        mesh.add_vertex(Vertex::new(DVec3::X).with_color(blue));
        mesh.add_vertex(Vertex::new(DVec3::Y).with_color(blue));
        let mut volume = Volume::new("v");
        volume.triangles.push(Triangle {
            indices: [0, 1, 2],
            tex_map: Some(TexMap {
                texture: 0,
                uv: [DVec2::ZERO, DVec2::X, DVec2::Y],
            }),
        });
        mesh.volumes.push(volume);

        let refined = subdivide_mesh(&mesh, 1);
        let m01 = refined.vertices[3];
        let color = m01.color.unwrap();
        assert_relative_eq!(color.r, 0.5);
        assert_relative_eq!(color.b, 0.5);
        let first = refined.volumes[0].triangles[0].tex_map.unwrap();
        assert_eq!(first.uv[1], DVec2::new(0.5, 0.0));
    }

    #[test]
    fn test_refine_document_checks_limit_first() {
        let mut doc = Document::new();
        let mesh = quad();
        doc.append_volume(0, 0, mesh.vertices.clone(), mesh.volumes[0].clone())
            .unwrap();
        doc.set_subdivision_level(3).unwrap();
        let tight = EngineConfig::new(64, config::constants::MAX_SLICE_PIXELS, 16).unwrap();
        assert_eq!(
            refine_document(&doc, &tight, &Progress::new()),
            Err(AmfError::TooManyTriangles { count: 128, max: 64 })
        );

        let refined = refine_document(&doc, &EngineConfig::default(), &Progress::new()).unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0][0].triangle_count(), 128);
    }

    #[test]
    fn test_refine_document_cancelled() {
        let mut doc = Document::new();
        let mesh = quad();
        doc.append_volume(0, 0, mesh.vertices.clone(), mesh.volumes[0].clone())
            .unwrap();
        let progress = Progress::new();
        progress.cancel();
        assert_eq!(
            refine_document(&doc, &EngineConfig::default(), &progress),
            Err(AmfError::Cancelled)
        );
    }
}
