use glam::{DMat4, DQuat, DVec3};

use crate::math::{euler_degrees_to_quat, quat_to_euler_degrees};

/// Transform component
///
/// Local position, rotation and scale of a scene node together with the
/// cached local matrix. Setters keep the cache in sync, so reads never need
/// a separate update pass.
#[derive(Debug, Clone)]
pub struct Transform {
    position: DVec3,
    rotation: DQuat,
    scale: DVec3,

    local_matrix: DMat4,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            local_matrix: DMat4::IDENTITY,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> DVec3 {
        self.scale
    }

    /// Euler angles in degrees (X applied first).
    #[must_use]
    pub fn rotation_euler(&self) -> DVec3 {
        quat_to_euler_degrees(self.rotation)
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &DMat4 {
        &self.local_matrix
    }

    // ========================================================================
    // Setters
    // ========================================================================

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.refresh();
    }

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation;
        self.refresh();
    }

    /// Sets the rotation from Euler angles in degrees.
    pub fn set_rotation_euler(&mut self, degrees: DVec3) {
        self.set_rotation(euler_degrees_to_quat(degrees));
    }

    pub fn set_scale(&mut self, scale: DVec3) {
        self.scale = scale;
        self.refresh();
    }

    /// Sets the local matrix directly.
    ///
    /// The matrix is decomposed back into position/rotation/scale; shear is lost.
    pub fn apply_local_matrix(&mut self, matrix: DMat4) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = translation;
        self.local_matrix = matrix;
    }

    fn refresh(&mut self) {
        self.local_matrix =
            DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
