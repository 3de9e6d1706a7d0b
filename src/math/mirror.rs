//! Reflection of local transforms across the world YZ plane.
//!
//! All functions take the *parent* world matrices of the source transform and of
//! its mirror counterpart, and work on local (parent-space) values. The mirror
//! plane is fixed: world X is negated. Callers with a different symmetry axis
//! must rotate into an X-aligned frame first.
//!
//! Euler angles are degrees with X applied first, then Y, then Z. Angles near
//! ±180° may come back on the other branch of the wrap.

use glam::{DMat4, DQuat, DVec3};

use super::matrix::{Trs, euler_degrees_to_quat, quat_to_euler_degrees};

#[inline]
fn reflection() -> DMat4 {
    DMat4::from_scale(DVec3::new(-1.0, 1.0, 1.0))
}

/// Mirrors a local position into the target's parent space.
#[must_use]
pub fn mirror_position(source_parent: &DMat4, target_parent: &DMat4, position: DVec3) -> DVec3 {
    let world = source_parent.transform_point3(position);
    let reflected = reflection().transform_point3(world);
    target_parent.inverse().transform_point3(reflected)
}

/// Mirrors a local Euler rotation (degrees) into the target's parent space.
///
/// The rotation is expressed about the source parent's frame, reflected by
/// negating the quaternion's X and W components, then brought into the target
/// parent's frame.
#[must_use]
pub fn mirror_rotation(source_parent: &DMat4, target_parent: &DMat4, rotation: DVec3) -> DVec3 {
    let local = DMat4::from_quat(euler_degrees_to_quat(rotation));
    let about_parent = *source_parent * local * source_parent.inverse();
    let (_, q, _) = about_parent.to_scale_rotation_translation();

    let reflected = DQuat::from_xyzw(-q.x, q.y, q.z, -q.w);

    let target_local = target_parent.inverse() * DMat4::from_quat(reflected) * *target_parent;
    let (_, q, _) = target_local.to_scale_rotation_translation();
    quat_to_euler_degrees(q)
}

/// Scale is assumed symmetric and copied as is.
#[inline]
#[must_use]
pub fn mirror_scale(scale: DVec3) -> DVec3 {
    scale
}

/// Mirrors position, rotation and scale of a driven transform.
#[must_use]
pub fn mirror_trs(source_parent: &DMat4, target_parent: &DMat4, source: &Trs) -> Trs {
    Trs {
        translation: mirror_position(source_parent, target_parent, source.translation),
        rotation: mirror_rotation(source_parent, target_parent, source.rotation),
        scale: mirror_scale(source.scale),
    }
}

/// Mirrors a driver: rotation and scale only.
///
/// Driver joints share their pivot with their mirror counterpart, so the
/// target keeps its own translation.
#[must_use]
pub fn mirror_driver_trs(
    source_parent: &DMat4,
    target_parent: &DMat4,
    source: &Trs,
    target_translation: DVec3,
) -> Trs {
    Trs {
        translation: target_translation,
        rotation: mirror_rotation(source_parent, target_parent, source.rotation),
        scale: mirror_scale(source.scale),
    }
}
