//! Index-based access to objects, meshes, volumes, materials, composites,
//! constellations, instances and textures.

use amf_doc::{AmfResult, Color, EntityKind, Equation, InstanceParam, Texture};
use glam::DVec3;

use crate::{optional_slot, slot, to_index, Amf};

impl Amf {
    // =========================================================================
    // Objects
    // =========================================================================

    pub fn object_count(&self) -> i32 {
        to_index(self.document.object_count())
    }

    pub fn object_name(&self, object: i32) -> Option<String> {
        let result = slot(object, EntityKind::Object)
            .and_then(|o| self.document.object_name(o).map(str::to_owned));
        self.record(result)
    }

    pub fn rename_object(&mut self, object: i32, name: &str) -> bool {
        let result = slot(object, EntityKind::Object).and_then(|o| self.document.rename_object(o, name));
        self.succeeded(result)
    }

    pub fn add_object(&mut self, name: &str) -> i32 {
        to_index(self.document.add_object(name))
    }

    /// Removes an object. Later objects shift down by one; instances
    /// pointing at them are not updated.
    pub fn remove_object(&mut self, object: i32) -> bool {
        let result = slot(object, EntityKind::Object).and_then(|o| self.document.remove_object(o));
        self.succeeded(result)
    }

    pub fn translate_object(&mut self, object: i32, dx: f64, dy: f64, dz: f64) -> bool {
        let result = slot(object, EntityKind::Object)
            .and_then(|o| self.document.translate_object(o, DVec3::new(dx, dy, dz)));
        self.succeeded(result)
    }

    /// Rotates an object's vertices about the origin, in radians, X then Y
    /// then Z.
    pub fn rotate_object(&mut self, object: i32, rx: f64, ry: f64, rz: f64) -> bool {
        let result =
            slot(object, EntityKind::Object).and_then(|o| self.document.rotate_object(o, rx, ry, rz));
        self.succeeded(result)
    }

    // =========================================================================
    // Meshes and volumes
    // =========================================================================

    pub fn mesh_count(&self, object: i32) -> i32 {
        let result = slot(object, EntityKind::Object).and_then(|o| self.document.mesh_count(o));
        self.new_index(result)
    }

    pub fn add_mesh(&mut self, object: i32) -> i32 {
        let result = slot(object, EntityKind::Object).and_then(|o| self.document.add_mesh(o));
        self.new_index(result)
    }

    pub fn remove_mesh(&mut self, object: i32, mesh: i32) -> bool {
        let result = mesh_slot(object, mesh)
            .and_then(|(o, m)| self.document.remove_mesh(o, m));
        self.succeeded(result)
    }

    pub fn volume_count(&self, object: i32, mesh: i32) -> i32 {
        let result = mesh_slot(object, mesh)
            .and_then(|(o, m)| self.document.volume_count(o, m));
        self.new_index(result)
    }

    pub fn volume_name(&self, object: i32, mesh: i32, volume: i32) -> Option<String> {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.volume_name(o, m, v).map(str::to_owned));
        self.record(result)
    }

    pub fn rename_volume(&mut self, object: i32, mesh: i32, volume: i32, name: &str) -> bool {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.rename_volume(o, m, v, name));
        self.succeeded(result)
    }

    pub fn remove_volume(&mut self, object: i32, mesh: i32, volume: i32) -> bool {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.remove_volume(o, m, v));
        self.succeeded(result)
    }

    /// Material of a volume; `-1` when unassigned or on error.
    pub fn volume_material(&self, object: i32, mesh: i32, volume: i32) -> i32 {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.volume_material(o, m, v));
        self.record(result).flatten().map_or(-1, to_index)
    }

    /// Assigns a material; `-1` clears the assignment.
    pub fn set_volume_material(&mut self, object: i32, mesh: i32, volume: i32, material: i32) -> bool {
        let result = volume_slot(object, mesh, volume).and_then(|(o, m, v)| {
            let material = optional_slot(material, EntityKind::Material)?;
            self.document.set_volume_material(o, m, v, material)
        });
        self.succeeded(result)
    }

    /// Color override of a volume as RGBA, `None` when it has none.
    pub fn volume_color(&self, object: i32, mesh: i32, volume: i32) -> Option<[f64; 4]> {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.volume(o, m, v).map(|v| v.color));
        self.record(result).flatten().map(rgba)
    }

    pub fn set_volume_color(
        &mut self,
        object: i32,
        mesh: i32,
        volume: i32,
        r: f64,
        g: f64,
        b: f64,
        a: f64,
    ) -> bool {
        let result = volume_slot(object, mesh, volume).and_then(|(o, m, v)| {
            self.document
                .set_volume_color(o, m, v, Some(Color::rgba(r, g, b, a)))
        });
        self.succeeded(result)
    }

    pub fn clear_volume_color(&mut self, object: i32, mesh: i32, volume: i32) -> bool {
        let result = volume_slot(object, mesh, volume)
            .and_then(|(o, m, v)| self.document.set_volume_color(o, m, v, None));
        self.succeeded(result)
    }

    // =========================================================================
    // Materials
    // =========================================================================

    /// Number of materials, including the void material at index 0.
    pub fn material_count(&self) -> i32 {
        to_index(self.document.material_count())
    }

    pub fn material_name(&self, material: i32) -> Option<String> {
        let result = slot(material, EntityKind::Material)
            .and_then(|m| self.document.material_name(m).map(str::to_owned));
        self.record(result)
    }

    pub fn rename_material(&mut self, material: i32, name: &str) -> bool {
        let result =
            slot(material, EntityKind::Material).and_then(|m| self.document.rename_material(m, name));
        self.succeeded(result)
    }

    pub fn add_material(&mut self, name: &str) -> i32 {
        to_index(self.document.add_material(name))
    }

    pub fn remove_material(&mut self, material: i32) -> bool {
        let result = slot(material, EntityKind::Material).and_then(|m| self.document.remove_material(m));
        self.succeeded(result)
    }

    pub fn material_color(&self, material: i32) -> Option<[f64; 4]> {
        let result =
            slot(material, EntityKind::Material).and_then(|m| self.document.material_color(m));
        self.record(result).map(rgba)
    }

    /// Red, green and blue as 0–255 integers.
    pub fn material_color_u8(&self, material: i32) -> Option<[u8; 3]> {
        let result =
            slot(material, EntityKind::Material).and_then(|m| self.document.material_color(m));
        self.record(result).map(Color::to_u8_components)
    }

    /// Components are clamped to `[0, 1]`.
    pub fn set_material_color(&mut self, material: i32, r: f64, g: f64, b: f64, a: f64) -> bool {
        let result = slot(material, EntityKind::Material)
            .and_then(|m| self.document.set_material_color(m, Color::rgba(r, g, b, a)));
        self.succeeded(result)
    }

    /// Components are clamped to `0..=255`; alpha is kept.
    pub fn set_material_color_u8(&mut self, material: i32, r: i32, g: i32, b: i32) -> bool {
        let result = slot(material, EntityKind::Material)
            .and_then(|m| self.document.set_material_color_u8(m, r, g, b));
        self.succeeded(result)
    }

    /// True when `candidate` is `material` or reaches it through composites.
    pub fn is_material_referenced_by(&self, material: i32, candidate: i32) -> bool {
        match (usize::try_from(material), usize::try_from(candidate)) {
            (Ok(m), Ok(c)) => self.document.is_material_referenced_by(m, c),
            _ => false,
        }
    }

    // =========================================================================
    // Composites
    // =========================================================================

    pub fn composite_count(&self, material: i32) -> i32 {
        let result =
            slot(material, EntityKind::Material).and_then(|m| self.document.composite_count(m));
        self.new_index(result)
    }

    /// Blends `target` into `material` by `equation`. Fails when the blend
    /// would make `material` contain itself.
    pub fn add_composite(&mut self, material: i32, target: i32, equation: &str) -> i32 {
        let result = slot(material, EntityKind::Material).and_then(|m| {
            let t = slot(target, EntityKind::Material)?;
            self.document.add_composite(m, t, Equation::new(equation))
        });
        self.new_index(result)
    }

    pub fn remove_composite(&mut self, material: i32, composite: i32) -> bool {
        let result = composite_slot(material, composite)
            .and_then(|(m, c)| self.document.remove_composite(m, c));
        self.succeeded(result)
    }

    pub fn clear_composites(&mut self, material: i32) -> bool {
        let result =
            slot(material, EntityKind::Material).and_then(|m| self.document.clear_composites(m));
        self.succeeded(result)
    }

    pub fn composite_material(&self, material: i32, composite: i32) -> i32 {
        let result = composite_slot(material, composite)
            .and_then(|(m, c)| self.document.composite_material(m, c));
        self.new_index(result)
    }

    pub fn set_composite_material(&mut self, material: i32, composite: i32, target: i32) -> bool {
        let result = composite_slot(material, composite).and_then(|(m, c)| {
            let t = slot(target, EntityKind::Material)?;
            self.document.set_composite_material(m, c, t)
        });
        self.succeeded(result)
    }

    pub fn composite_equation(&self, material: i32, composite: i32) -> Option<String> {
        let result = composite_slot(material, composite)
            .and_then(|(m, c)| self.document.composite_equation(m, c).map(|e| e.source().to_owned()));
        self.record(result)
    }

    pub fn set_composite_equation(&mut self, material: i32, composite: i32, equation: &str) -> bool {
        let result = composite_slot(material, composite)
            .and_then(|(m, c)| self.document.set_composite_equation(m, c, Equation::new(equation)));
        self.succeeded(result)
    }

    // =========================================================================
    // Constellations and instances
    // =========================================================================

    pub fn constellation_count(&self) -> i32 {
        to_index(self.document.constellation_count())
    }

    pub fn constellation_name(&self, constellation: i32) -> Option<String> {
        let result = slot(constellation, EntityKind::Constellation)
            .and_then(|c| self.document.constellation_name(c).map(str::to_owned));
        self.record(result)
    }

    pub fn rename_constellation(&mut self, constellation: i32, name: &str) -> bool {
        let result = slot(constellation, EntityKind::Constellation)
            .and_then(|c| self.document.rename_constellation(c, name));
        self.succeeded(result)
    }

    pub fn add_constellation(&mut self, name: &str) -> i32 {
        to_index(self.document.add_constellation(name))
    }

    pub fn remove_constellation(&mut self, constellation: i32) -> bool {
        let result = slot(constellation, EntityKind::Constellation)
            .and_then(|c| self.document.remove_constellation(c));
        self.succeeded(result)
    }

    /// True when `candidate` is `constellation` or places it, directly or
    /// through nested instances.
    pub fn is_constellation_referenced_by(&self, constellation: i32, candidate: i32) -> bool {
        match (usize::try_from(constellation), usize::try_from(candidate)) {
            (Ok(c), Ok(k)) => self.document.is_constellation_referenced_by(c, k),
            _ => false,
        }
    }

    pub fn instance_count(&self, constellation: i32) -> i32 {
        let result = slot(constellation, EntityKind::Constellation)
            .and_then(|c| self.document.instance_count(c));
        self.new_index(result)
    }

    /// Adds an unplaced instance of object 0.
    pub fn add_instance(&mut self, constellation: i32) -> i32 {
        let result = slot(constellation, EntityKind::Constellation)
            .and_then(|c| self.document.add_instance(c));
        self.new_index(result)
    }

    pub fn remove_instance(&mut self, constellation: i32, instance: i32) -> bool {
        let result = instance_slot(constellation, instance)
            .and_then(|(c, i)| self.document.remove_instance(c, i));
        self.succeeded(result)
    }

    /// Object placed by an instance; `-1` when it places a constellation.
    pub fn instance_object(&self, constellation: i32, instance: i32) -> i32 {
        let result = instance_slot(constellation, instance)
            .and_then(|(c, i)| self.document.instance_object(c, i));
        self.record(result).flatten().map_or(-1, to_index)
    }

    pub fn set_instance_object(&mut self, constellation: i32, instance: i32, object: i32) -> bool {
        let result = instance_slot(constellation, instance).and_then(|(c, i)| {
            let o = slot(object, EntityKind::Object)?;
            self.document.set_instance_object(c, i, o)
        });
        self.succeeded(result)
    }

    /// Constellation placed by an instance; `-1` when it places an object.
    pub fn instance_constellation(&self, constellation: i32, instance: i32) -> i32 {
        let result = instance_slot(constellation, instance)
            .and_then(|(c, i)| self.document.instance_constellation(c, i));
        self.record(result).flatten().map_or(-1, to_index)
    }

    /// Places a constellation. Fails when it would place itself.
    pub fn set_instance_constellation(&mut self, constellation: i32, instance: i32, target: i32) -> bool {
        let result = instance_slot(constellation, instance).and_then(|(c, i)| {
            let t = slot(target, EntityKind::Constellation)?;
            self.document.set_instance_constellation(c, i, t)
        });
        self.succeeded(result)
    }

    /// Offsets are in Document units, rotations in degrees.
    pub fn instance_param(&self, constellation: i32, instance: i32, param: InstanceParam) -> Option<f64> {
        let result = instance_slot(constellation, instance)
            .and_then(|(c, i)| self.document.instance_param(c, i, param));
        self.record(result)
    }

    pub fn set_instance_param(
        &mut self,
        constellation: i32,
        instance: i32,
        param: InstanceParam,
        value: f64,
    ) -> bool {
        let result = instance_slot(constellation, instance)
            .and_then(|(c, i)| self.document.set_instance_param(c, i, param, value));
        self.succeeded(result)
    }

    // =========================================================================
    // Textures
    // =========================================================================

    pub fn texture_count(&self) -> i32 {
        to_index(self.document.texture_count())
    }

    pub fn texture_name(&self, texture: i32) -> Option<String> {
        let result = slot(texture, EntityKind::Texture)
            .and_then(|t| self.document.texture(t).map(|t| t.name.clone()));
        self.record(result)
    }

    /// Adds a decoded RGBA8 image, rows top first.
    pub fn add_texture(&mut self, name: &str, width: u32, height: u32, pixels: Vec<u8>) -> i32 {
        let result = Texture::new(name, width, height, pixels).map(|t| self.document.add_texture(t));
        self.new_index(result)
    }

    pub fn remove_texture(&mut self, texture: i32) -> bool {
        let result = slot(texture, EntityKind::Texture).and_then(|t| self.document.remove_texture(t));
        self.succeeded(result)
    }
}

fn mesh_slot(object: i32, mesh: i32) -> AmfResult<(usize, usize)> {
    Ok((slot(object, EntityKind::Object)?, slot(mesh, EntityKind::Mesh)?))
}

fn volume_slot(object: i32, mesh: i32, volume: i32) -> AmfResult<(usize, usize, usize)> {
    let (o, m) = mesh_slot(object, mesh)?;
    Ok((o, m, slot(volume, EntityKind::Volume)?))
}

fn composite_slot(material: i32, composite: i32) -> AmfResult<(usize, usize)> {
    Ok((
        slot(material, EntityKind::Material)?,
        slot(composite, EntityKind::Composite)?,
    ))
}

fn instance_slot(constellation: i32, instance: i32) -> AmfResult<(usize, usize)> {
    Ok((
        slot(constellation, EntityKind::Constellation)?,
        slot(instance, EntityKind::Instance)?,
    ))
}

fn rgba(color: Color) -> [f64; 4] {
    [color.r, color.g, color.b, color.a]
}
