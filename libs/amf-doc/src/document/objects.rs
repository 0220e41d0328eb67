//! Objects, meshes and volumes, plus whole-geometry transforms.

use config::constants::approx_zero;
use glam::{DMat3, DVec3};
use tracing::debug;

use super::Document;
use crate::color::Color;
use crate::error::{checked, checked_mut, AmfError, AmfResult, EntityKind};
use crate::geometry::{Mesh, Object, Vertex, Volume};

impl Document {
    // =========================================================================
    // OBJECTS
    // =========================================================================

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> AmfResult<&Object> {
        checked(&self.objects, EntityKind::Object, index)
    }

    /// The object at `index`, or `None` for a stale or dangling index.
    pub fn resolve_object(&self, index: usize) -> Option<&Object> {
        self.objects.get(index)
    }

    pub fn object_name(&self, index: usize) -> AmfResult<&str> {
        Ok(&self.object(index)?.name)
    }

    pub fn rename_object(&mut self, index: usize, name: impl Into<String>) -> AmfResult<()> {
        checked_mut(&mut self.objects, EntityKind::Object, index)?.name = name.into();
        self.touch();
        Ok(())
    }

    /// Appends an empty object and returns its index.
    pub fn add_object(&mut self, name: impl Into<String>) -> usize {
        self.objects.push(Object::new(name));
        self.touch();
        self.objects.len() - 1
    }

    /// Removes an object; later objects shift down by one. Instances that
    /// targeted them are left as they are.
    pub fn remove_object(&mut self, index: usize) -> AmfResult<Object> {
        checked(&self.objects, EntityKind::Object, index)?;
        self.touch();
        debug!(index, "object removed");
        Ok(self.objects.remove(index))
    }

    /// Moves every vertex of an object. All instances of it are affected.
    pub fn translate_object(&mut self, index: usize, offset: DVec3) -> AmfResult<()> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, index)?;
        for mesh in &mut object.meshes {
            mesh.translate(offset);
        }
        self.touch();
        Ok(())
    }

    /// Rotates every vertex of an object about the origin by `rx`, then `ry`,
    /// then `rz` radians about the fixed axes.
    pub fn rotate_object(&mut self, index: usize, rx: f64, ry: f64, rz: f64) -> AmfResult<()> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, index)?;
        let rotation = DMat3::from_rotation_z(rz) * DMat3::from_rotation_y(ry) * DMat3::from_rotation_x(rx);
        for mesh in &mut object.meshes {
            mesh.apply_linear(rotation);
        }
        self.touch();
        Ok(())
    }

    // =========================================================================
    // MESHES
    // =========================================================================

    pub fn mesh_count(&self, object: usize) -> AmfResult<usize> {
        Ok(self.object(object)?.meshes.len())
    }

    pub fn mesh(&self, object: usize, mesh: usize) -> AmfResult<&Mesh> {
        checked(&self.object(object)?.meshes, EntityKind::Mesh, mesh)
    }

    /// Appends an empty mesh to an object and returns its index.
    pub fn add_mesh(&mut self, object: usize) -> AmfResult<usize> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, object)?;
        object.meshes.push(Mesh::new());
        let index = object.meshes.len() - 1;
        self.touch();
        Ok(index)
    }

    pub fn remove_mesh(&mut self, object: usize, mesh: usize) -> AmfResult<Mesh> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, object)?;
        checked(&object.meshes, EntityKind::Mesh, mesh)?;
        let removed = object.meshes.remove(mesh);
        self.touch();
        Ok(removed)
    }

    /// Appends `vertices` to a mesh and a volume whose triangle indices are
    /// relative to those vertices.
    ///
    /// The object (or mesh) is created when its index equals the current
    /// count. Everything is validated before the Document changes.
    pub fn append_volume(
        &mut self,
        object: usize,
        mesh: usize,
        vertices: Vec<Vertex>,
        mut volume: Volume,
    ) -> AmfResult<usize> {
        let object_count = self.objects.len();
        if object > object_count {
            return Err(AmfError::out_of_range(EntityKind::Object, object, object_count));
        }
        let mesh_count = self.objects.get(object).map_or(0, |o| o.meshes.len());
        if mesh > mesh_count {
            return Err(AmfError::out_of_range(EntityKind::Mesh, mesh, mesh_count));
        }
        let local_count = vertices.len() as u32;
        if let Some(t) = volume
            .triangles
            .iter()
            .find(|t| t.indices.iter().any(|&i| i >= local_count))
        {
            return Err(AmfError::malformed(format!(
                "triangle {:?} references missing vertices (count: {local_count})",
                t.indices
            )));
        }
        if let Some(material) = volume.material {
            checked(&self.materials, EntityKind::Material, material)?;
        }

        if object == object_count {
            self.objects.push(Object::new(""));
        }
        let target = &mut self.objects[object];
        if mesh == mesh_count {
            target.meshes.push(Mesh::new());
        }
        let target = &mut target.meshes[mesh];
        let offset = target.vertices.len() as u32;
        for t in &mut volume.triangles {
            for i in &mut t.indices {
                *i += offset;
            }
        }
        target.vertices.extend(vertices);
        target.volumes.push(volume);
        let index = target.volumes.len() - 1;
        self.touch();
        Ok(index)
    }

    // =========================================================================
    // VOLUMES
    // =========================================================================

    pub fn volume_count(&self, object: usize, mesh: usize) -> AmfResult<usize> {
        Ok(self.mesh(object, mesh)?.volumes.len())
    }

    pub fn volume(&self, object: usize, mesh: usize, volume: usize) -> AmfResult<&Volume> {
        checked(&self.mesh(object, mesh)?.volumes, EntityKind::Volume, volume)
    }

    fn volume_mut(&mut self, object: usize, mesh: usize, volume: usize) -> AmfResult<&mut Volume> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, object)?;
        let mesh = checked_mut(&mut object.meshes, EntityKind::Mesh, mesh)?;
        checked_mut(&mut mesh.volumes, EntityKind::Volume, volume)
    }

    pub fn volume_name(&self, object: usize, mesh: usize, volume: usize) -> AmfResult<&str> {
        Ok(&self.volume(object, mesh, volume)?.name)
    }

    pub fn rename_volume(
        &mut self,
        object: usize,
        mesh: usize,
        volume: usize,
        name: impl Into<String>,
    ) -> AmfResult<()> {
        self.volume_mut(object, mesh, volume)?.name = name.into();
        self.touch();
        Ok(())
    }

    /// Material of a volume; `None` when unassigned.
    pub fn volume_material(&self, object: usize, mesh: usize, volume: usize) -> AmfResult<Option<usize>> {
        Ok(self.volume(object, mesh, volume)?.material)
    }

    /// Assigns (or clears) a volume's material. The material must exist.
    pub fn set_volume_material(
        &mut self,
        object: usize,
        mesh: usize,
        volume: usize,
        material: Option<usize>,
    ) -> AmfResult<()> {
        if let Some(material) = material {
            checked(&self.materials, EntityKind::Material, material)?;
        }
        self.volume_mut(object, mesh, volume)?.material = material;
        self.touch();
        Ok(())
    }

    /// Sets (or clears) the color override of a volume.
    pub fn set_volume_color(
        &mut self,
        object: usize,
        mesh: usize,
        volume: usize,
        color: Option<Color>,
    ) -> AmfResult<()> {
        self.volume_mut(object, mesh, volume)?.color = color;
        self.touch();
        Ok(())
    }

    /// Removes a volume. Its vertices stay in the mesh.
    pub fn remove_volume(&mut self, object: usize, mesh: usize, volume: usize) -> AmfResult<Volume> {
        let object = checked_mut(&mut self.objects, EntityKind::Object, object)?;
        let mesh = checked_mut(&mut object.meshes, EntityKind::Mesh, mesh)?;
        checked(&mesh.volumes, EntityKind::Volume, volume)?;
        let removed = mesh.volumes.remove(volume);
        self.touch();
        Ok(removed)
    }

    // =========================================================================
    // SCALE
    // =========================================================================

    /// Scales the whole Document by `factors` without changing its units.
    ///
    /// With `scale_constellations`, instance offsets are scaled too, so
    /// instanced parts keep their relative placement. With `scale_equations`,
    /// composite equations follow the geometry.
    pub fn scale(
        &mut self,
        factors: DVec3,
        scale_constellations: bool,
        scale_equations: bool,
    ) -> AmfResult<()> {
        let degenerate = factors.to_array().into_iter().any(|f| f <= 0.0 || approx_zero(f));
        if !factors.is_finite() || degenerate {
            return Err(AmfError::invalid(format!(
                "scale factors must be positive and finite, got {factors}"
            )));
        }
        let matrix = DMat3::from_diagonal(factors);
        for mesh in self.objects.iter_mut().flat_map(|o| &mut o.meshes) {
            mesh.apply_linear(matrix);
        }
        if scale_constellations {
            for instance in self.constellations.iter_mut().flat_map(|c| &mut c.instances) {
                let offset = DVec3::from_array(instance.offset) * factors;
                instance.offset = offset.to_array();
            }
        }
        if scale_equations {
            for composite in self.materials.iter_mut().flat_map(|m| &mut m.composites) {
                composite.equation.rescale(factors);
            }
        }
        self.touch();
        Ok(())
    }

    /// Isotropic form of [`Document::scale`].
    pub fn scale_uniform(
        &mut self,
        factor: f64,
        scale_constellations: bool,
        scale_equations: bool,
    ) -> AmfResult<()> {
        self.scale(DVec3::splat(factor), scale_constellations, scale_equations)
    }
}
