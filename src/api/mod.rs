//! HTTP API Service
//!
//! Server-authoritative deployment of the outcome engine: the server holds
//! each session's seeds and nonce counter and players act through these
//! endpoints.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{build_app, ApiServer};
