mod catalog_source;
mod chat_client;
mod embedding_service;
mod speech;
mod vector_repository;

pub use catalog_source::*;
pub use chat_client::*;
pub use embedding_service::*;
pub use speech::*;
pub use vector_repository::*;
