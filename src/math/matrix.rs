use glam::{DMat4, DQuat, DVec3, EulerRot};

/// Sixteen floats in column-major order, translation at indices 12..15.
///
/// This is also the flat layout of a row-vector host matrix, so documents
/// written by the host load without transposition.
pub type FlatMatrix = [f64; 16];

/// Intrinsic Z-Y-X is the same rotation as extrinsic X, then Y, then Z.
const ROTATION_ORDER: EulerRot = EulerRot::ZYX;

#[inline]
#[must_use]
pub fn to_flat(matrix: &DMat4) -> FlatMatrix {
    matrix.to_cols_array()
}

#[inline]
#[must_use]
pub fn from_flat(values: &FlatMatrix) -> DMat4 {
    DMat4::from_cols_array(values)
}

/// Converts Euler angles in degrees (X applied first, then Y, then Z) to a quaternion.
#[must_use]
pub fn euler_degrees_to_quat(degrees: DVec3) -> DQuat {
    DQuat::from_euler(
        ROTATION_ORDER,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// Inverse of [`euler_degrees_to_quat`].
#[must_use]
pub fn quat_to_euler_degrees(rotation: DQuat) -> DVec3 {
    let (z, y, x) = rotation.to_euler(ROTATION_ORDER);
    DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Translation, Euler rotation (degrees) and scale of a local transform.
///
/// This is the attribute-level view riggers edit; matrices are the storage view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Trs {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DVec3::ZERO,
        scale: DVec3::ONE,
    };

    /// Decomposes a matrix. Shear is lost.
    #[must_use]
    pub fn from_matrix(matrix: &DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation: quat_to_euler_degrees(rotation),
            scale,
        }
    }

    #[must_use]
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(
            self.scale,
            euler_degrees_to_quat(self.rotation),
            self.translation,
        )
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}
