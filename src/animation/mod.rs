//! Keyframe animation for baked poses.

mod values;
pub mod clip;
pub mod tracks;

pub use clip::{AnimationClip, ClipBuilder, TargetPath, Track, TrackData, TrackMeta};
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::Interpolatable;
