//! The voice conversation state machine and its event-queue runner.

mod actor;
mod session;

pub use actor::*;
pub use session::*;
