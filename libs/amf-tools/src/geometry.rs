//! Envelope queries, slicing and render export.

use amf_doc::EntityKind;
use amf_mesh::{envelope, render_count, render_triangles_with, Envelope, RenderTriangle, SliceBitmap};

use crate::{optional_slot, to_index, Amf};

impl Amf {
    // =========================================================================
    // Envelope
    // =========================================================================

    /// Number of rendered placements of objects.
    pub fn render_count(&self) -> i32 {
        to_index(render_count(&self.document))
    }

    /// World-space minimum corner of a render item, or of the whole Document
    /// for `-1`.
    pub fn envl_min(&self, render: i32) -> Option<[f64; 3]> {
        self.envelope_of(render).map(|e| e.min.to_array())
    }

    pub fn envl_max(&self, render: i32) -> Option<[f64; 3]> {
        self.envelope_of(render).map(|e| e.max.to_array())
    }

    pub fn envl_size(&self, render: i32) -> Option<[f64; 3]> {
        self.envelope_of(render).map(|e| e.size.to_array())
    }

    /// Extent of the item in its own, unrotated frame.
    pub fn envl_dims(&self, render: i32) -> Option<[f64; 3]> {
        self.envelope_of(render).map(|e| e.dims.to_array())
    }

    /// Cumulative rotation as `[x, y, z, w]`.
    pub fn envl_rot_quat(&self, render: i32) -> Option<[f64; 4]> {
        self.envelope_of(render).map(|e| e.rotation.to_array())
    }

    /// Cumulative rotation as an angle in radians and a unit axis.
    pub fn envl_rot_angle_axis(&self, render: i32) -> Option<(f64, [f64; 3])> {
        self.envelope_of(render).map(|e| {
            let (angle, axis) = e.angle_axis();
            (angle, axis.to_array())
        })
    }

    /// The item's local minimum corner in world space; zeros for `-1`.
    pub fn envl_origin(&self, render: i32) -> Option<[f64; 3]> {
        self.envelope_of(render).map(|e| e.origin.to_array())
    }

    fn envelope_of(&self, render: i32) -> Option<Envelope> {
        let result = optional_slot(render, EntityKind::RenderItem).and_then(|r| envelope(&self.document, r));
        self.record(result)
    }

    // =========================================================================
    // Slicing and rendering
    // =========================================================================

    /// RGBA8 slice of the whole Document at height `z`. Pixel sizes are in
    /// Document units; `surface_depth` extrudes surface colors inwards.
    pub fn slice_bitmap_rgba(
        &mut self,
        pixel_size_x: f64,
        pixel_size_y: f64,
        z: f64,
        surface_depth: f64,
    ) -> Option<SliceBitmap> {
        let result = self.slicer.slice(
            &self.document,
            pixel_size_x,
            pixel_size_y,
            z,
            surface_depth,
            &self.progress,
        );
        self.finish(result)
    }

    /// Cross-section boundary at `z` as `[x0, y0, x1, y1]` segments.
    pub fn slice_segments_xy(&mut self, z: f64) -> Option<Vec<[f64; 4]>> {
        let result = self.slicer.segments(&self.document, z).map(|segments| {
            segments
                .iter()
                .map(|s| [s.start.x, s.start.y, s.end.x, s.end.y])
                .collect()
        });
        self.record(result)
    }

    /// Posed, subdivided triangles of every render item.
    pub fn render_triangles(&self) -> Option<Vec<RenderTriangle>> {
        let result = render_triangles_with(&self.document, &self.config, &self.progress);
        self.finish(result)
    }
}
