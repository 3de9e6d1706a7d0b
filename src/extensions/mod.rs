//! Built-in session extensions.
//!
//! Register them explicitly:
//!
//! ```rust,ignore
//! session.register_extension(|_| CopyPasteTrs::new());
//! session.register_extension(|_| GenerateInbetweens::new(3, "raise"));
//! ```

pub mod bake;
pub mod copy_paste;
pub mod inbetweens;
pub mod zero_pose;

pub use bake::{BakePoses, BakedPoses};
pub use copy_paste::CopyPasteTrs;
pub use inbetweens::GenerateInbetweens;
pub use zero_pose::ZeroDefaultPose;
