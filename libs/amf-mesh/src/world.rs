//! World-space volumes and material color resolution, shared by the slicer
//! and the render export.

use amf_doc::{Color, Document, Mesh, TexMap};
use config::constants::{MAX_RECURSION_DEPTH, VOID_MATERIAL_INDEX};
use glam::DVec3;

use crate::flatten::RenderItem;
use crate::pose::Pose;

/// A triangle of a rendered volume, in world coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorldTriangle {
    /// Position in the volume's original triangle order.
    pub id: u32,
    pub corners: [DVec3; 3],
    pub zmin: f64,
    pub zmax: f64,
    pub colors: Option<[Color; 3]>,
    pub tex_map: Option<TexMap>,
}

impl WorldTriangle {
    /// Closest point of the triangle to `p`, as barycentric weights of the
    /// corners, and its distance to `p`.
    ///
    /// Region tests after Ericson, "Real-Time Collision Detection" 5.1.5.
    pub fn closest_point(&self, p: DVec3) -> ([f64; 3], f64) {
        let [a, b, c] = self.corners;
        let weights = closest_weights(p, a, b, c);
        let q = a * weights[0] + b * weights[1] + c * weights[2];
        (weights, q.distance(p))
    }

    pub fn min_y(&self) -> f64 {
        self.corners.iter().map(|c| c.y).fold(f64::INFINITY, f64::min)
    }

    pub fn max_y(&self) -> f64 {
        self.corners.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max)
    }
}

fn closest_weights(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> [f64; 3] {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return [1.0, 0.0, 0.0];
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return [0.0, 1.0, 0.0];
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return [1.0 - v, v, 0.0];
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return [0.0, 0.0, 1.0];
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return [1.0 - w, 0.0, w];
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return [0.0, 1.0 - w, w];
    }

    let sum = va + vb + vc;
    if sum == 0.0 {
        // Degenerate triangle with every region test failing: use a corner.
        return [1.0, 0.0, 0.0];
    }
    let v = vb / sum;
    let w = vc / sum;
    [1.0 - v - w, v, w]
}

/// One volume of one render item.
#[derive(Debug, Clone)]
pub(crate) struct WorldVolume {
    pub render: usize,
    pub pose: Pose,
    pub material: Option<usize>,
    pub color: Option<Color>,
    pub triangles: Vec<WorldTriangle>,
}

impl WorldVolume {
    /// Interior color at a world point.
    pub fn interior_color(&self, doc: &Document, world: DVec3) -> Color {
        if let Some(color) = self.color {
            return color;
        }
        match self.material {
            Some(material) => {
                material_color(doc, material, self.pose.inverse_transform_point(world))
            }
            None => Color::default(),
        }
    }
}

/// Builds the world volumes of every render item, in render order.
/// `meshes` holds the (possibly refined) meshes per object.
pub(crate) fn world_volumes(items: &[RenderItem], meshes: &[Vec<Mesh>]) -> Vec<WorldVolume> {
    let mut volumes = Vec::new();
    for (render, item) in items.iter().enumerate() {
        let Some(object) = meshes.get(item.object) else {
            continue;
        };
        for mesh in object {
            for volume in &mesh.volumes {
                let triangles = volume
                    .triangles
                    .iter()
                    .enumerate()
                    .map(|(id, t)| {
                        let corners = mesh.corners(t).map(|p| item.pose.transform_point(p));
                        let colors = t
                            .indices
                            .map(|i| mesh.vertices[i as usize].color);
                        WorldTriangle {
                            id: id as u32,
                            corners,
                            zmin: corners.iter().map(|c| c.z).fold(f64::INFINITY, f64::min),
                            zmax: corners.iter().map(|c| c.z).fold(f64::NEG_INFINITY, f64::max),
                            colors: match colors {
                                [Some(a), Some(b), Some(c)] => Some([a, b, c]),
                                _ => None,
                            },
                            tex_map: t.tex_map,
                        }
                    })
                    .collect();
                volumes.push(WorldVolume {
                    render,
                    pose: item.pose,
                    material: volume.material,
                    color: volume.color,
                    triangles,
                });
            }
        }
    }
    volumes
}

/// Color of `material` at an object-local point, blended through its
/// composites.
///
/// Each composite contributes its own material's color weighted by its
/// equation, clamped to `[0, 1]`. Weights summing above one are normalized;
/// any remainder below one is filled with the base color. Void is fully
/// transparent, and a dangling index falls back to the default color.
///
/// Renumbering can leave the composite graph cyclic. A material already on
/// the blend path contributes its base color instead of being expanded.
pub fn material_color(doc: &Document, material: usize, local: DVec3) -> Color {
    blend(doc, material, local, &mut Vec::new())
}

fn blend(doc: &Document, material: usize, local: DVec3, path: &mut Vec<usize>) -> Color {
    if material == VOID_MATERIAL_INDEX {
        return Color::TRANSPARENT;
    }
    let Some(current) = doc.resolve_material(material) else {
        return Color::default();
    };
    if current.composites.is_empty() || path.len() >= MAX_RECURSION_DEPTH || path.contains(&material) {
        return current.color;
    }

    let weights: Vec<f64> = current
        .composites
        .iter()
        .map(|c| match c.equation.evaluate(local) {
            Some(w) if w.is_finite() => w.clamp(0.0, 1.0),
            _ => 0.0,
        })
        .collect();
    let total: f64 = weights.iter().sum();
    let norm = total.max(1.0);

    let mut color = current.color.scaled(1.0 - total / norm);
    path.push(material);
    for (composite, weight) in current.composites.iter().zip(&weights) {
        if *weight > 0.0 {
            let part = blend(doc, composite.material, local, path);
            color = color.add(part.scaled(weight / norm));
        }
    }
    path.pop();
    color.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_doc::Equation;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_material_uses_base_color() {
        let mut doc = Document::new();
        let m = doc.add_material_with_color("red", Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(material_color(&doc, m, DVec3::ZERO), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(material_color(&doc, 0, DVec3::ZERO), Color::TRANSPARENT);
        assert_eq!(material_color(&doc, 42, DVec3::ZERO), Color::default());
    }

    #[test]
    fn test_partial_composite_fills_with_base() {
        let mut doc = Document::new();
        let red = doc.add_material_with_color("red", Color::rgb(1.0, 0.0, 0.0));
        let blue = doc.add_material_with_color("blue", Color::rgb(0.0, 0.0, 1.0));
        doc.add_composite(red, blue, Equation::new("0.25")).unwrap();
        let c = material_color(&doc, red, DVec3::ZERO);
        assert_relative_eq!(c.r, 0.75);
        assert_relative_eq!(c.b, 0.25);
        assert_relative_eq!(c.a, 1.0);
    }

    #[test]
    fn test_overfull_composites_normalize() {
        let mut doc = Document::new();
        let base = doc.add_material_with_color("base", Color::rgb(1.0, 1.0, 1.0));
        let red = doc.add_material_with_color("red", Color::rgb(1.0, 0.0, 0.0));
        let blue = doc.add_material_with_color("blue", Color::rgb(0.0, 0.0, 1.0));
        doc.add_composite(base, red, Equation::new("1")).unwrap();
        doc.add_composite(base, blue, Equation::new("3")).unwrap();
        // Clamped to 1 + 1, normalized to halves.
        let c = material_color(&doc, base, DVec3::ZERO);
        assert_relative_eq!(c.r, 0.5);
        assert_relative_eq!(c.g, 0.0);
        assert_relative_eq!(c.b, 0.5);
    }

    #[test]
    fn test_fully_void_composite_is_transparent() {
        let mut doc = Document::new();
        let m = doc.add_material("hollow");
        doc.add_composite(m, 0, Equation::new("1")).unwrap();
        assert_eq!(material_color(&doc, m, DVec3::ZERO).a, 0.0);
    }

    #[test]
    fn test_spatial_equation_and_unevaluable_text() {
        let mut doc = Document::new();
        let base = doc.add_material_with_color("black", Color::rgb(0.0, 0.0, 0.0));
        let white = doc.add_material_with_color("white", Color::rgb(1.0, 1.0, 1.0));
        doc.add_composite(base, white, Equation::with_evaluator("x", |p: DVec3| p.x))
            .unwrap();
        assert_relative_eq!(material_color(&doc, base, DVec3::new(0.3, 0.0, 0.0)).r, 0.3);

        let other = doc.add_material_with_color("grey", Color::rgb(0.5, 0.5, 0.5));
        doc.add_composite(other, white, Equation::new("sin(x)")).unwrap();
        assert_relative_eq!(material_color(&doc, other, DVec3::ZERO).r, 0.5);
    }

    #[test]
    fn test_closest_point_regions() {
        let t = WorldTriangle {
            id: 0,
            corners: [DVec3::ZERO, DVec3::X, DVec3::Y],
            zmin: 0.0,
            zmax: 0.0,
            colors: None,
            tex_map: None,
        };
        let (w, d) = t.closest_point(DVec3::new(0.25, 0.25, 2.0));
        assert_relative_eq!(d, 2.0);
        assert_relative_eq!(w[1], 0.25);
        assert_relative_eq!(w[2], 0.25);

        let (w, d) = t.closest_point(DVec3::new(-1.0, -1.0, 0.0));
        assert_eq!(w, [1.0, 0.0, 0.0]);
        assert_relative_eq!(d, std::f64::consts::SQRT_2);

        // Beyond the hypotenuse.
        let (w, d) = t.closest_point(DVec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(w[1], 0.5);
        assert_relative_eq!(w[2], 0.5);
        assert_relative_eq!(d, std::f64::consts::FRAC_1_SQRT_2);
    }

    #[test]
    fn test_cyclic_composites_left_by_renumbering_terminate() {
        let mut doc = Document::new();
        let d = doc.add_material("d");
        let z = doc.add_material_with_color("z", Color::rgb(1.0, 0.0, 0.0));
        let y = doc.add_material_with_color("y", Color::rgb(0.0, 0.0, 1.0));
        doc.add_composite(y, z, Equation::new("0.4")).unwrap();
        doc.add_composite(y, z, Equation::new("0.4")).unwrap();

        // y (now 2) composites itself twice.
        doc.remove_material(d).unwrap();
        let c = material_color(&doc, 2, DVec3::ZERO);
        assert_relative_eq!(c.r, 0.0);
        assert_relative_eq!(c.b, 1.0);
        assert_relative_eq!(c.a, 1.0);
    }
}
