pub mod container;
pub mod controller;
pub mod router;
pub mod server;

pub use container::{expand_tilde, Container, ContainerConfig, GenerationProvider};
pub use router::Router;
pub use server::{serve, HttpServer};
