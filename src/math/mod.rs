//! Matrix helpers and mirror math.
//!
//! - [`matrix`]: flat matrix layout, Euler conversions, TRS decomposition
//! - [`mirror`]: reflection of local transforms across the world YZ plane

pub mod matrix;
pub mod mirror;

pub use matrix::{FlatMatrix, Trs, euler_degrees_to_quat, from_flat, quat_to_euler_degrees, to_flat};
pub use mirror::{mirror_driver_trs, mirror_position, mirror_rotation, mirror_scale, mirror_trs};
