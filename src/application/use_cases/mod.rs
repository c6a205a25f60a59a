mod answer_question;
mod clear_index;
mod conversation;
mod populate_index;
mod retrieve_context;
mod timeouts;

pub use answer_question::*;
pub use clear_index::*;
pub use conversation::*;
pub use populate_index::*;
pub use retrieve_context::*;
pub use timeouts::*;
