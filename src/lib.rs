#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Authoring core for RBF pose networks.
//!
//! Solvers map driver rotations to blended driven transforms through a set of
//! recorded poses. This crate keeps that data consistent, mirrors solvers
//! across the body's left/right plane and round-trips them through JSON. The
//! RBF kernel itself and the host scene are collaborators behind traits
//! ([`RbfEvaluator`], [`SceneGraph`]).

pub mod animation;
pub mod errors;
pub mod extensions;
pub mod math;
pub mod mirror;
pub mod network;
pub mod scene;
pub mod serialization;
pub mod session;

pub use errors::{PoseWranglerError, Result};
pub use math::Trs;
pub use mirror::{MirrorMapping, Side};
pub use network::{
    BlenderHandle, DEFAULT_POSE, PoseData, PoseNetwork, PoseRef, PoseSample, RbfEvaluator, SolverConfig,
    SolverHandle,
};
pub use scene::{MemoryScene, SceneGraph};
pub use serialization::Document;
pub use session::{Context, Extension, Session, Settings};
