//! HTTP/JSON boundary.
//!
//! Thin layer over the service modules: DTO validation, the `{code, msg,
//! data}` envelope and error-code mapping. Authentication is performed by
//! the surrounding layer; every request names its acting user explicitly.

pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod types;

pub use routes::router;
pub use state::AppState;
