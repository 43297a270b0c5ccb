//! Server module for building the storefront HTTP server
//!
//! This module provides a `ServerBuilder` that wires a store into the order,
//! account and product handlers and mounts them next to the health routes.

pub mod builder;
pub mod extractors;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use extractors::Validated;
pub use handlers::AppState;
