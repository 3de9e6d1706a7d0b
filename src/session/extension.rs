use std::any::Any;

use crate::errors::Result;
use crate::scene::SceneGraph;
use crate::session::{Context, Session};

/// A tool registered with a [`Session`].
///
/// While an extension runs it is detached from the session, so it can take
/// the session mutably and still reach the other registered extensions.
pub trait Extension<S: SceneGraph + 'static>: Any {
    fn name(&self) -> &'static str;

    /// Called after every mutation of the session.
    fn on_context_changed(&mut self, _context: &Context) {}

    /// Runs the extension's main action against the current solver.
    fn execute(&mut self, session: &mut Session<S>) -> Result<()>;
}
