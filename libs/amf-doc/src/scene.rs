//! # Constellations
//!
//! Constellations place instances of objects or of other constellations.
//! Instance rotations are stored in degrees, applied X then Y then Z about
//! the original axes, before the translation.

use serde::{Deserialize, Serialize};

/// What an instance places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceTarget {
    Object(usize),
    Constellation(usize),
}

impl Default for InstanceTarget {
    fn default() -> Self {
        InstanceTarget::Object(0)
    }
}

/// One of the six instance placement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceParam {
    Dx,
    Dy,
    Dz,
    Rx,
    Ry,
    Rz,
}

impl InstanceParam {
    pub const ALL: [InstanceParam; 6] = [
        InstanceParam::Dx,
        InstanceParam::Dy,
        InstanceParam::Dz,
        InstanceParam::Rx,
        InstanceParam::Ry,
        InstanceParam::Rz,
    ];

    /// True for the three rotation parameters.
    pub fn is_rotation(self) -> bool {
        matches!(self, InstanceParam::Rx | InstanceParam::Ry | InstanceParam::Rz)
    }
}

/// A placement of a target within a constellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub target: InstanceTarget,
    /// Offset in Document units.
    pub offset: [f64; 3],
    /// Rotation about X, Y, Z in degrees.
    pub rotation: [f64; 3],
}

impl Instance {
    pub fn new(target: InstanceTarget) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn param(&self, param: InstanceParam) -> f64 {
        match param {
            InstanceParam::Dx => self.offset[0],
            InstanceParam::Dy => self.offset[1],
            InstanceParam::Dz => self.offset[2],
            InstanceParam::Rx => self.rotation[0],
            InstanceParam::Ry => self.rotation[1],
            InstanceParam::Rz => self.rotation[2],
        }
    }

    pub fn set_param(&mut self, param: InstanceParam, value: f64) {
        match param {
            InstanceParam::Dx => self.offset[0] = value,
            InstanceParam::Dy => self.offset[1] = value,
            InstanceParam::Dz => self.offset[2] = value,
            InstanceParam::Rx => self.rotation[0] = value,
            InstanceParam::Ry => self.rotation[1] = value,
            InstanceParam::Rz => self.rotation[2] = value,
        }
    }

    /// The targeted object index, if the instance places an object.
    pub fn object(&self) -> Option<usize> {
        match self.target {
            InstanceTarget::Object(i) => Some(i),
            InstanceTarget::Constellation(_) => None,
        }
    }

    /// The targeted constellation index, if the instance places one.
    pub fn constellation(&self) -> Option<usize> {
        match self.target {
            InstanceTarget::Constellation(i) => Some(i),
            InstanceTarget::Object(_) => None,
        }
    }
}

/// A named group of instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constellation {
    pub name: String,
    pub instances: Vec<Instance>,
}

impl Constellation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    /// Constellation indices placed directly by this constellation.
    pub fn referenced_constellations(&self) -> impl Iterator<Item = usize> + '_ {
        self.instances.iter().filter_map(Instance::constellation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_round_trip_through_setters() {
        let mut instance = Instance::default();
        for (i, param) in InstanceParam::ALL.into_iter().enumerate() {
            instance.set_param(param, i as f64 + 1.0);
        }
        assert_eq!(instance.offset, [1.0, 2.0, 3.0]);
        assert_eq!(instance.rotation, [4.0, 5.0, 6.0]);
        assert_eq!(instance.param(InstanceParam::Ry), 5.0);
    }

    #[test]
    fn test_target_is_exclusive() {
        let instance = Instance::new(InstanceTarget::Constellation(3));
        assert_eq!(instance.constellation(), Some(3));
        assert_eq!(instance.object(), None);
        assert_eq!(Instance::default().object(), Some(0));
    }
}
