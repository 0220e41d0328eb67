//! # Envelope
//!
//! Bounding boxes of the flattened scene, either for the whole Document or
//! for one render item. Envelopes use the base (unsubdivided) vertices.

use amf_doc::{AmfError, AmfResult, Document, EntityKind, Object};
use glam::{DQuat, DVec3};

use crate::flatten::{flatten, RenderItem};
use crate::pose::Pose;

/// World-space bounds plus the local frame of a render item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min: DVec3,
    pub max: DVec3,
    /// `max - min`.
    pub size: DVec3,
    /// Size of the untransformed, locally aligned box.
    pub dims: DVec3,
    /// Cumulative rotation of the item.
    pub rotation: DQuat,
    /// Local minimum corner mapped into world space. Zero for the whole
    /// Document, which has no local frame.
    pub origin: DVec3,
}

impl Envelope {
    /// The envelope of nothing: all zeros, identity rotation.
    pub const EMPTY: Envelope = Envelope {
        min: DVec3::ZERO,
        max: DVec3::ZERO,
        size: DVec3::ZERO,
        dims: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        origin: DVec3::ZERO,
    };

    /// Rotation as `(angle in radians, unit axis)`.
    pub fn angle_axis(&self) -> (f64, DVec3) {
        let (axis, angle) = self.rotation.to_axis_angle();
        (angle, axis)
    }

    /// True when the envelope has no extent at all.
    pub fn is_empty(&self) -> bool {
        self.size == DVec3::ZERO
    }
}

/// Computes the envelope of the whole Document (`None`) or of one render
/// item.
///
/// ```
/// use amf_mesh::envelope;
/// use amf_doc::Document;
///
/// let doc = Document::new();
/// assert!(envelope(&doc, None).unwrap().is_empty());
/// assert!(envelope(&doc, Some(0)).is_err());
/// ```
pub fn envelope(doc: &Document, render: Option<usize>) -> AmfResult<Envelope> {
    let items = flatten(doc);
    match render {
        Some(index) => {
            let item = items
                .get(index)
                .ok_or_else(|| AmfError::out_of_range(EntityKind::RenderItem, index, items.len()))?;
            Ok(item_envelope(doc, item))
        }
        None => Ok(scene_envelope(doc, &items)),
    }
}

/// Number of render items the Document flattens to.
pub fn render_count(doc: &Document) -> usize {
    flatten(doc).len()
}

pub(crate) fn scene_envelope(doc: &Document, items: &[RenderItem]) -> Envelope {
    let bounds = items
        .iter()
        .filter_map(|item| world_bounds(doc.resolve_object(item.object)?, &item.pose))
        .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)));
    match bounds {
        Some((min, max)) => Envelope {
            min,
            max,
            size: max - min,
            dims: max - min,
            rotation: DQuat::IDENTITY,
            origin: DVec3::ZERO,
        },
        None => Envelope::EMPTY,
    }
}

fn item_envelope(doc: &Document, item: &RenderItem) -> Envelope {
    let Some(object) = doc.resolve_object(item.object) else {
        return Envelope::EMPTY;
    };
    let (Some((local_min, local_max)), Some((min, max))) =
        (object.bounding_box(), world_bounds(object, &item.pose))
    else {
        return Envelope {
            rotation: item.pose.rotation,
            origin: item.pose.translation,
            min: item.pose.translation,
            max: item.pose.translation,
            ..Envelope::EMPTY
        };
    };
    Envelope {
        min,
        max,
        size: max - min,
        dims: local_max - local_min,
        rotation: item.pose.rotation,
        origin: item.pose.transform_point(local_min),
    }
}

fn world_bounds(object: &Object, pose: &Pose) -> Option<(DVec3, DVec3)> {
    let mut points = object
        .meshes
        .iter()
        .flat_map(|m| &m.vertices)
        .map(|v| pose.transform_point(v.position));
    let first = points.next()?;
    Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
}
