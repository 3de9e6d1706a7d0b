//! Solver documents
//!
//! Lossless round-trip of solvers to JSON. Loading a document into a network
//! that already has some of its solvers updates them in place.

pub mod codec;
pub mod document;

pub use codec::{
    deserialize, deserialize_from_file, from_json_str, read_document, serialize, serialize_all, serialize_solver,
    serialize_to_file, to_json_string, write_document,
};
pub use document::{BlendshapeDocument, Document, OrderedPoses, PoseDocument, SolverDocument};
