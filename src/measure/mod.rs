//! Measurement core: segments, the session state machine, and the traits
//! the host implements to feed and render it.

mod collab;
mod plugin;
mod segment;
mod session;

pub use collab::*;
pub use plugin::MeasurePlugin;
pub(crate) use plugin::drive_session;
pub use segment::*;
pub use session::*;
