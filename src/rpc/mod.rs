//! RPC proxy components.
//!
//! This module provides the pieces in front of the node:
//! - Fixed-window rate limiting per route class
//! - Origin allow-list for cross-origin calls
//! - Method and parameter validated forwarding
//! - Security header policy

pub mod cors;
pub mod gateway;
pub mod middleware;
pub mod rate_limiter;

pub use cors::*;
pub use gateway::*;
pub use middleware::*;
pub use rate_limiter::*;
