//! # Application Layer
//!
//! Service interfaces plus the use cases coordinating domain and connector layers:
//! catalog ingestion, retrieval, answering, and the voice conversation session.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
