//! HTTP surface.
//!
//! - [`state`]: configuration and services shared by every handler
//! - [`routes`]: router assembly and handlers

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
