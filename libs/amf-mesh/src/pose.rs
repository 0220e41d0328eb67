//! Rigid placements accumulated through nested instances.

use amf_doc::Instance;
use glam::{DMat4, DQuat, DVec3};

/// Rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Placement of one instance: rotate about X, then Y, then Z (fixed
    /// axes, degrees), then translate.
    pub fn from_instance(instance: &Instance) -> Self {
        let [rx, ry, rz] = instance.rotation.map(f64::to_radians);
        Self {
            rotation: DQuat::from_rotation_z(rz)
                * DQuat::from_rotation_y(ry)
                * DQuat::from_rotation_x(rx),
            translation: DVec3::from_array(instance.offset),
        }
    }

    /// `self` applied after `child`.
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * child.rotation,
            translation: self.rotation * child.translation + self.translation,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Maps a world point back into the local frame.
    #[inline]
    pub fn inverse_transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation.inverse() * (point - self.translation)
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }
}
