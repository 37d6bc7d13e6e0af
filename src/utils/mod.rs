//! Shared utilities for the gateway.
//!
//! - Constants
//! - Ticker sanitization
//! - RPC method and parameter validation
//! - Bounded upstream body reads

pub mod body;
pub mod constants;
pub mod sanitize;
pub mod validation;

pub use body::*;
pub use constants::*;
pub use sanitize::*;
pub use validation::*;
