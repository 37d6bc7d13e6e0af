//! Exchange ticker proxy.
//!
//! This module provides the price data shown on the site:
//! - Source descriptions for the supported exchanges
//! - A shared fetch, bound, parse, extract and sanitize pipeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use site_gateway::exchange::{ExchangeProxy, ExchangeSource, TickerOutcome};
//!
//! let proxy = ExchangeProxy::new(Duration::from_secs(10), 1024 * 1024)?;
//! match proxy.fetch_ticker(&ExchangeSource::klingex()).await? {
//!     TickerOutcome::Found(ticker) => println!("last: {}", ticker.last_price),
//!     TickerOutcome::PairNotFound { error } => println!("{error}"),
//! }
//! ```

pub mod fetchers;
pub mod sources;

pub use fetchers::*;
pub use sources::*;
