//! # Instance Flattening
//!
//! Walks the constellation graph and produces one [`RenderItem`] per object
//! placement. When the Document has no constellations every object is
//! rendered once in place.
//!
//! Top-level constellations are those no instance places. Dangling targets
//! are skipped. Index renumbering or a deserialized Document can leave the
//! graph cyclic: an instance whose target is already on the current path is
//! skipped, and recursion is cut at `MAX_RECURSION_DEPTH`.

use amf_doc::{Document, InstanceTarget};
use config::constants::{MAX_RECURSION_DEPTH, STACKER_RED_ZONE_BYTES, STACKER_STACK_SIZE_BYTES};
use stacker::maybe_grow;
use tracing::{debug, warn};

use crate::pose::Pose;

/// One rendered placement of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub object: usize,
    pub pose: Pose,
    /// `(constellation, instance)` pairs from the top level down.
    pub path: Vec<(usize, usize)>,
}

/// Flattens the Document into render items, in render order.
///
/// ```
/// use amf_doc::{Document, InstanceTarget};
/// use amf_mesh::flatten;
///
/// let mut doc = Document::new();
/// doc.add_object("part");
/// let plate = doc.add_constellation("plate");
/// doc.add_instance_of(plate, InstanceTarget::Object(0)).unwrap();
/// doc.add_instance_of(plate, InstanceTarget::Object(0)).unwrap();
/// assert_eq!(flatten(&doc).len(), 2);
/// ```
pub fn flatten(doc: &Document) -> Vec<RenderItem> {
    let constellations = doc.constellations();
    if constellations.is_empty() {
        return (0..doc.object_count())
            .map(|object| RenderItem {
                object,
                pose: Pose::IDENTITY,
                path: Vec::new(),
            })
            .collect();
    }

    let mut placed = vec![false; constellations.len()];
    for child in constellations
        .iter()
        .flat_map(|c| c.referenced_constellations())
    {
        if let Some(flag) = placed.get_mut(child) {
            *flag = true;
        }
    }

    let mut items = Vec::new();
    let mut path = Vec::new();
    for (index, _) in placed.iter().enumerate().filter(|(_, placed)| !**placed) {
        walk(doc, index, Pose::IDENTITY, &mut path, &mut items);
    }
    debug!(items = items.len(), "flattened constellations");
    items
}

fn walk(
    doc: &Document,
    constellation: usize,
    pose: Pose,
    path: &mut Vec<(usize, usize)>,
    items: &mut Vec<RenderItem>,
) {
    maybe_grow(STACKER_RED_ZONE_BYTES, STACKER_STACK_SIZE_BYTES, || {
        if path.len() >= MAX_RECURSION_DEPTH {
            warn!(constellation, depth = path.len(), "instance nesting too deep, skipping");
            return;
        }
        let Some(current) = doc.resolve_constellation(constellation) else {
            return;
        };
        for (i, instance) in current.instances.iter().enumerate() {
            let placed = pose.compose(&Pose::from_instance(instance));
            path.push((constellation, i));
            match instance.target {
                InstanceTarget::Object(object) if doc.resolve_object(object).is_some() => {
                    items.push(RenderItem {
                        object,
                        pose: placed,
                        path: path.clone(),
                    });
                }
                InstanceTarget::Constellation(child) if path.iter().any(|&(c, _)| c == child) => {
                    warn!(constellation, child, instance = i, "skipping cyclic instance");
                }
                InstanceTarget::Constellation(child) if doc.resolve_constellation(child).is_some() => {
                    walk(doc, child, placed, path, items);
                }
                target => debug!(?target, constellation, instance = i, "skipping dangling instance"),
            }
            path.pop();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf_doc::InstanceParam;
    use approx::assert_relative_eq;
    use glam::DVec3;

    #[test]
    fn test_objects_render_in_place_without_constellations() {
        let mut doc = Document::new();
        doc.add_object("a");
        doc.add_object("b");
        let items = flatten(&doc);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].object, 1);
        assert_eq!(items[1].pose, Pose::IDENTITY);
    }

    #[test]
    fn test_nested_offsets_accumulate() {
        let mut doc = Document::new();
        doc.add_object("part");
        let inner = doc.add_constellation("inner");
        let outer = doc.add_constellation("outer");
        let i = doc.add_instance_of(inner, InstanceTarget::Object(0)).unwrap();
        doc.set_instance_param(inner, i, InstanceParam::Dx, 1.0).unwrap();
        let j = doc.add_instance_of(outer, InstanceTarget::Constellation(inner)).unwrap();
        doc.set_instance_param(outer, j, InstanceParam::Rz, 90.0).unwrap();
        doc.set_instance_param(outer, j, InstanceParam::Dz, 2.0).unwrap();

        let items = flatten(&doc);
        assert_eq!(items.len(), 1, "inner is placed, so only outer is top level");
        assert_eq!(items[0].path, vec![(outer, j), (inner, i)]);
        let origin = items[0].pose.transform_point(DVec3::ZERO);
        assert_relative_eq!(origin.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(origin.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(origin.z, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dangling_targets_are_skipped() {
        let mut doc = Document::new();
        doc.add_object("a");
        doc.add_object("b");
        let c = doc.add_constellation("c");
        doc.add_instance_of(c, InstanceTarget::Object(0)).unwrap();
        doc.add_instance_of(c, InstanceTarget::Object(1)).unwrap();
        doc.remove_object(1).unwrap();

        let items = flatten(&doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].object, 0);
    }

    #[test]
    fn test_cycles_left_by_renumbering_are_cut() {
        let mut doc = Document::new();
        doc.add_object("part");
        let d = doc.add_constellation("d");
        let z = doc.add_constellation("z");
        let y = doc.add_constellation("y");
        let x = doc.add_constellation("x");
        doc.add_instance_of(z, InstanceTarget::Object(0)).unwrap();
        doc.add_instance_of(y, InstanceTarget::Constellation(z)).unwrap();
        doc.add_instance_of(y, InstanceTarget::Constellation(z)).unwrap();
        doc.add_instance_of(x, InstanceTarget::Constellation(z)).unwrap();

        // y (now 1) targets itself twice; x (now 2) targets y.
        doc.remove_constellation(d).unwrap();
        let items = flatten(&doc);
        assert_eq!(items.len(), 1, "only z places the object");
        assert_eq!(items[0].path, vec![(0, 0)]);
    }

    #[test]
    fn test_default_instance_with_no_objects_renders_nothing() {
        let mut doc = Document::new();
        let c = doc.add_constellation("empty");
        doc.add_instance(c).unwrap();
        assert!(flatten(&doc).is_empty());
    }
}
