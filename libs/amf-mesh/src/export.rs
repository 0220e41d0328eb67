//! Flattened, posed and subdivided triangles for rendering back ends.

use amf_doc::{AmfResult, Color, Document, Progress};
use config::constants::EngineConfig;
use glam::DVec3;
use tracing::debug;

use crate::flatten::flatten;
use crate::subdivide::refine_document;
use crate::world::world_volumes;

/// A world-space triangle with its face normal and resolved base color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTriangle {
    pub corners: [DVec3; 3],
    /// Unit normal by the right-hand rule; zero for degenerate triangles.
    pub normal: DVec3,
    /// Volume color at the triangle centroid.
    pub color: Color,
    /// Render item the triangle belongs to.
    pub render: usize,
}

/// Every rendered triangle of the Document, in render order.
pub fn render_triangles(doc: &Document, progress: &Progress) -> AmfResult<Vec<RenderTriangle>> {
    render_triangles_with(doc, &EngineConfig::default(), progress)
}

pub fn render_triangles_with(
    doc: &Document,
    config: &EngineConfig,
    progress: &Progress,
) -> AmfResult<Vec<RenderTriangle>> {
    let meshes = refine_document(doc, config, progress)?;
    let items = flatten(doc);
    let triangles: Vec<RenderTriangle> = world_volumes(&items, &meshes)
        .iter()
        .flat_map(|volume| {
            volume.triangles.iter().map(move |t| {
                let [a, b, c] = t.corners;
                let centroid = (a + b + c) / 3.0;
                RenderTriangle {
                    corners: t.corners,
                    normal: (b - a).cross(c - a).normalize_or_zero(),
                    color: volume.interior_color(doc, centroid),
                    render: volume.render,
                }
            })
        })
        .collect();
    debug!(triangles = triangles.len(), items = items.len(), "render triangles");
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_doc::{InstanceParam, InstanceTarget, Triangle, Vertex, Volume};
    use approx::assert_relative_eq;

    fn doc_with_triangle() -> Document {
        let mut doc = Document::new();
        let vertices = [DVec3::ZERO, DVec3::X, DVec3::Y].into_iter().map(Vertex::new).collect();
        let mut volume = Volume::new("t");
        volume.triangles.push(Triangle::new(0, 1, 2));
        doc.append_volume(0, 0, vertices, volume).unwrap();
        doc
    }

    #[test]
    fn test_normals_and_default_color() {
        let doc = doc_with_triangle();
        let triangles = render_triangles(&doc, &Progress::new()).unwrap();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].normal, DVec3::Z);
        assert_eq!(triangles[0].color, Color::default());
    }

    #[test]
    fn test_instances_and_subdivision_multiply() {
        let mut doc = doc_with_triangle();
        let c = doc.add_constellation("c");
        doc.add_instance_of(c, InstanceTarget::Object(0)).unwrap();
        let i = doc.add_instance_of(c, InstanceTarget::Object(0)).unwrap();
        doc.set_instance_param(c, i, InstanceParam::Dz, 10.0).unwrap();
        doc.set_subdivision_level(2).unwrap();

        let triangles = render_triangles(&doc, &Progress::new()).unwrap();
        assert_eq!(triangles.len(), 2 * 16);
        let lifted = triangles.iter().filter(|t| t.render == 1).count();
        assert_eq!(lifted, 16);
        assert!(triangles
            .iter()
            .filter(|t| t.render == 1)
            .all(|t| t.corners.iter().all(|p| (p.z - 10.0).abs() < 1e-12)));
        assert_relative_eq!(triangles[0].normal.z, 1.0);
    }

    #[test]
    fn test_volume_color_override() {
        let mut doc = doc_with_triangle();
        let m = doc.add_material_with_color("m", Color::rgb(0.0, 1.0, 0.0));
        doc.set_volume_material(0, 0, 0, Some(m)).unwrap();
        let triangles = render_triangles(&doc, &Progress::new()).unwrap();
        assert_eq!(triangles[0].color, Color::rgb(0.0, 1.0, 0.0));

        doc.set_volume_color(0, 0, 0, Some(Color::rgb(1.0, 0.0, 0.0))).unwrap();
        let triangles = render_triangles(&doc, &Progress::new()).unwrap();
        assert_eq!(triangles[0].color, Color::rgb(1.0, 0.0, 0.0));
    }
}
