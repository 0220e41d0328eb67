//! Materials and their composites.
//!
//! Material 0 is the reserved void material. It can be referenced but not
//! renamed, removed or composited.

use config::constants::VOID_MATERIAL_INDEX;
use tracing::{debug, warn};

use super::Document;
use crate::color::Color;
use crate::equation::Equation;
use crate::error::{checked, checked_mut, AmfError, AmfResult, EntityKind};
use crate::guard::reaches;
use crate::material::{Composite, Material};

impl Document {
    /// Number of materials, including the void material.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, index: usize) -> AmfResult<&Material> {
        checked(&self.materials, EntityKind::Material, index)
    }

    pub fn resolve_material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn material_name(&self, index: usize) -> AmfResult<&str> {
        Ok(&self.material(index)?.name)
    }

    fn user_material_mut(&mut self, index: usize) -> AmfResult<&mut Material> {
        if index == VOID_MATERIAL_INDEX {
            checked(&self.materials, EntityKind::Material, index)?;
            return Err(AmfError::invalid("the void material cannot be modified"));
        }
        checked_mut(&mut self.materials, EntityKind::Material, index)
    }

    pub fn rename_material(&mut self, index: usize, name: impl Into<String>) -> AmfResult<()> {
        self.user_material_mut(index)?.name = name.into();
        self.touch();
        Ok(())
    }

    /// Appends a material with the default color and returns its index.
    pub fn add_material(&mut self, name: impl Into<String>) -> usize {
        self.add_material_with_color(name, Color::default())
    }

    pub fn add_material_with_color(&mut self, name: impl Into<String>, color: Color) -> usize {
        self.materials.push(Material::new(name).with_color(color));
        self.touch();
        self.materials.len() - 1
    }

    /// Removes a material; later materials shift down by one. Volumes and
    /// composites still pointing at the old indices are left untouched.
    pub fn remove_material(&mut self, index: usize) -> AmfResult<Material> {
        self.user_material_mut(index)?;
        self.touch();
        debug!(index, "material removed");
        Ok(self.materials.remove(index))
    }

    pub fn material_color(&self, index: usize) -> AmfResult<Color> {
        Ok(self.material(index)?.color)
    }

    /// Sets the base color; components are clamped to `[0, 1]`.
    pub fn set_material_color(&mut self, index: usize, color: Color) -> AmfResult<()> {
        self.user_material_mut(index)?.color = color.clamped();
        self.touch();
        Ok(())
    }

    /// Sets the base color from 8-bit components, clamped to `0..=255`.
    /// Alpha is kept.
    pub fn set_material_color_u8(&mut self, index: usize, r: i32, g: i32, b: i32) -> AmfResult<()> {
        let material = self.user_material_mut(index)?;
        let alpha = material.color.a;
        material.color = Color {
            a: alpha,
            ..Color::from_u8_components(r, g, b)
        };
        self.touch();
        Ok(())
    }

    /// True if `material` is reachable from `candidate` through composites,
    /// including `candidate == material`.
    pub fn is_material_referenced_by(&self, material: usize, candidate: usize) -> bool {
        reaches(material, candidate, |m| {
            self.materials
                .get(m)
                .map(|mat| mat.referenced_materials().collect::<Vec<_>>())
                .unwrap_or_default()
        })
    }

    fn reject_composite_cycle(&self, owner: usize, target: usize) -> AmfResult<()> {
        if self.is_material_referenced_by(owner, target) {
            warn!(owner, target, "composite would create a material cycle");
            return Err(AmfError::ReferenceCycle {
                kind: EntityKind::Material,
                from: owner,
                to: target,
            });
        }
        Ok(())
    }

    // =========================================================================
    // COMPOSITES
    // =========================================================================

    pub fn composite_count(&self, material: usize) -> AmfResult<usize> {
        Ok(self.material(material)?.composites.len())
    }

    pub fn composite(&self, material: usize, composite: usize) -> AmfResult<&Composite> {
        checked(&self.material(material)?.composites, EntityKind::Composite, composite)
    }

    /// Appends a composite of `target` to `material` and returns its index.
    ///
    /// Fails with [`AmfError::ReferenceCycle`] if `target` already composites
    /// `material` (directly or transitively) or is `material` itself.
    pub fn add_composite(&mut self, material: usize, target: usize, equation: Equation) -> AmfResult<usize> {
        self.user_material_mut(material)?;
        checked(&self.materials, EntityKind::Material, target)?;
        self.reject_composite_cycle(material, target)?;
        let composites = &mut self.materials[material].composites;
        composites.push(Composite::new(target, equation));
        let index = composites.len() - 1;
        self.touch();
        Ok(index)
    }

    pub fn remove_composite(&mut self, material: usize, composite: usize) -> AmfResult<Composite> {
        let owner = self.user_material_mut(material)?;
        checked(&owner.composites, EntityKind::Composite, composite)?;
        let removed = owner.composites.remove(composite);
        self.touch();
        Ok(removed)
    }

    /// Removes every composite of a material.
    pub fn clear_composites(&mut self, material: usize) -> AmfResult<()> {
        self.material(material)?;
        if let Some(owner) = self.materials.get_mut(material) {
            owner.composites.clear();
        }
        self.touch();
        Ok(())
    }

    pub fn composite_material(&self, material: usize, composite: usize) -> AmfResult<usize> {
        Ok(self.composite(material, composite)?.material)
    }

    /// Retargets a composite, with the same cycle check as
    /// [`Document::add_composite`].
    pub fn set_composite_material(&mut self, material: usize, composite: usize, target: usize) -> AmfResult<()> {
        self.composite(material, composite)?;
        checked(&self.materials, EntityKind::Material, target)?;
        self.reject_composite_cycle(material, target)?;
        self.materials[material].composites[composite].material = target;
        self.touch();
        Ok(())
    }

    pub fn composite_equation(&self, material: usize, composite: usize) -> AmfResult<&Equation> {
        Ok(&self.composite(material, composite)?.equation)
    }

    pub fn set_composite_equation(&mut self, material: usize, composite: usize, equation: Equation) -> AmfResult<()> {
        let owner = self.user_material_mut(material)?;
        checked_mut(&mut owner.composites, EntityKind::Composite, composite)?.equation = equation;
        self.touch();
        Ok(())
    }
}
