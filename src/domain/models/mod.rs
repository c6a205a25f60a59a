mod audio;
mod catalog_record;
mod conversation;
mod document;
mod embedding;
mod search_result;

pub use audio::*;
pub use catalog_record::*;
pub use conversation::*;
pub use document::*;
pub use embedding::*;
pub use search_result::*;
