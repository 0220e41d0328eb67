use tracing::{debug, warn};

use super::Document;
use crate::error::{checked, checked_mut, AmfError, AmfResult, EntityKind};
use crate::guard::reaches;
use crate::scene::{Constellation, Instance, InstanceParam, InstanceTarget};

impl Document {
    pub fn constellation_count(&self) -> usize {
        self.constellations.len()
    }

    pub fn constellations(&self) -> &[Constellation] {
        &self.constellations
    }

    pub fn constellation(&self, index: usize) -> AmfResult<&Constellation> {
        checked(&self.constellations, EntityKind::Constellation, index)
    }

    pub fn resolve_constellation(&self, index: usize) -> Option<&Constellation> {
        self.constellations.get(index)
    }

    pub fn constellation_name(&self, index: usize) -> AmfResult<&str> {
        Ok(&self.constellation(index)?.name)
    }

    pub fn rename_constellation(&mut self, index: usize, name: impl Into<String>) -> AmfResult<()> {
        checked_mut(&mut self.constellations, EntityKind::Constellation, index)?.name = name.into();
        self.touch();
        Ok(())
    }

    pub fn add_constellation(&mut self, name: impl Into<String>) -> usize {
        self.constellations.push(Constellation::new(name));
        self.touch();
        self.constellations.len() - 1
    }

    /// Removes a constellation; later ones shift down by one.
    pub fn remove_constellation(&mut self, index: usize) -> AmfResult<Constellation> {
        checked(&self.constellations, EntityKind::Constellation, index)?;
        self.touch();
        debug!(index, "constellation removed");
        Ok(self.constellations.remove(index))
    }

    /// True if `constellation` is reachable from `candidate` through
    /// instances, including `candidate == constellation`.
    pub fn is_constellation_referenced_by(&self, constellation: usize, candidate: usize) -> bool {
        reaches(constellation, candidate, |c| {
            self.constellations
                .get(c)
                .map(|con| con.referenced_constellations().collect::<Vec<_>>())
                .unwrap_or_default()
        })
    }

    // =========================================================================
    // INSTANCES
    // =========================================================================

    pub fn instance_count(&self, constellation: usize) -> AmfResult<usize> {
        Ok(self.constellation(constellation)?.instances.len())
    }

    pub fn instance(&self, constellation: usize, instance: usize) -> AmfResult<&Instance> {
        checked(
            &self.constellation(constellation)?.instances,
            EntityKind::Instance,
            instance,
        )
    }

    fn instance_mut(&mut self, constellation: usize, instance: usize) -> AmfResult<&mut Instance> {
        let owner = checked_mut(&mut self.constellations, EntityKind::Constellation, constellation)?;
        checked_mut(&mut owner.instances, EntityKind::Instance, instance)
    }

    /// Appends a default instance (targeting object 0, no transform).
    pub fn add_instance(&mut self, constellation: usize) -> AmfResult<usize> {
        let owner = checked_mut(&mut self.constellations, EntityKind::Constellation, constellation)?;
        owner.instances.push(Instance::default());
        let index = owner.instances.len() - 1;
        self.touch();
        Ok(index)
    }

    /// Appends an instance of `target`, validating it like the setters do.
    pub fn add_instance_of(&mut self, constellation: usize, target: InstanceTarget) -> AmfResult<usize> {
        self.constellation(constellation)?;
        self.validate_target(constellation, target)?;
        let instances = &mut self.constellations[constellation].instances;
        instances.push(Instance::new(target));
        let index = instances.len() - 1;
        self.touch();
        Ok(index)
    }

    pub fn remove_instance(&mut self, constellation: usize, instance: usize) -> AmfResult<Instance> {
        let owner = checked_mut(&mut self.constellations, EntityKind::Constellation, constellation)?;
        checked(&owner.instances, EntityKind::Instance, instance)?;
        let removed = owner.instances.remove(instance);
        self.touch();
        Ok(removed)
    }

    fn validate_target(&self, constellation: usize, target: InstanceTarget) -> AmfResult<()> {
        match target {
            InstanceTarget::Object(object) => {
                checked(&self.objects, EntityKind::Object, object)?;
            }
            InstanceTarget::Constellation(child) => {
                checked(&self.constellations, EntityKind::Constellation, child)?;
                if self.is_constellation_referenced_by(constellation, child) {
                    warn!(constellation, child, "instance would create a constellation cycle");
                    return Err(AmfError::ReferenceCycle {
                        kind: EntityKind::Constellation,
                        from: constellation,
                        to: child,
                    });
                }
            }
        }
        Ok(())
    }

    /// Points an instance at an object. Clears any constellation target.
    pub fn set_instance_object(&mut self, constellation: usize, instance: usize, object: usize) -> AmfResult<()> {
        self.set_instance_target(constellation, instance, InstanceTarget::Object(object))
    }

    /// Points an instance at a constellation. Clears any object target.
    ///
    /// Fails with [`AmfError::ReferenceCycle`] if `child` already places
    /// `constellation` or is `constellation` itself.
    pub fn set_instance_constellation(
        &mut self,
        constellation: usize,
        instance: usize,
        child: usize,
    ) -> AmfResult<()> {
        self.set_instance_target(constellation, instance, InstanceTarget::Constellation(child))
    }

    pub fn set_instance_target(
        &mut self,
        constellation: usize,
        instance: usize,
        target: InstanceTarget,
    ) -> AmfResult<()> {
        self.instance(constellation, instance)?;
        self.validate_target(constellation, target)?;
        self.instance_mut(constellation, instance)?.target = target;
        self.touch();
        Ok(())
    }

    /// The object an instance places, `None` when it places a constellation.
    pub fn instance_object(&self, constellation: usize, instance: usize) -> AmfResult<Option<usize>> {
        Ok(self.instance(constellation, instance)?.object())
    }

    /// The constellation an instance places, `None` when it places an object.
    pub fn instance_constellation(&self, constellation: usize, instance: usize) -> AmfResult<Option<usize>> {
        Ok(self.instance(constellation, instance)?.constellation())
    }

    pub fn instance_param(&self, constellation: usize, instance: usize, param: InstanceParam) -> AmfResult<f64> {
        Ok(self.instance(constellation, instance)?.param(param))
    }

    /// Sets one placement parameter; rotations are in degrees.
    pub fn set_instance_param(
        &mut self,
        constellation: usize,
        instance: usize,
        param: InstanceParam,
        value: f64,
    ) -> AmfResult<()> {
        if !value.is_finite() {
            return Err(AmfError::invalid(format!("{param:?} must be finite, got {value}")));
        }
        self.instance_mut(constellation, instance)?.set_param(param, value);
        self.touch();
        Ok(())
    }
}
