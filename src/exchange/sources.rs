//! Exchange ticker sources.
//!
//! A source describes where a ticker lives and how to find the configured pair
//! in the upstream document. Both supported exchanges go through the same
//! pipeline; only the [`ResponseShape`] differs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::utils::constants::{
    KLINGEX_PAIR, KLINGEX_TICKERS_URL, RABIDRABBIT_PAIR, RABIDRABBIT_TICKER_URL,
};

/// Top-level layout of an exchange ticker document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Array of ticker objects, matched on `ticker_id`
    TickerList,
    /// Object keyed by pair identifier
    TickerMap,
}

/// One upstream ticker endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSource {
    /// Short name used in logs
    pub name: String,
    /// Ticker endpoint URL
    pub url: String,
    /// Trading pair identifier to extract
    pub pair: String,
    /// Document layout
    pub shape: ResponseShape,
}

impl ExchangeSource {
    /// Create a new source
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        pair: impl Into<String>,
        shape: ResponseShape,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            pair: pair.into(),
            shape,
        }
    }

    /// KlingEx: `GET /api/tickers` returns an array of tickers
    pub fn klingex() -> Self {
        Self::new("klingex", KLINGEX_TICKERS_URL, KLINGEX_PAIR, ResponseShape::TickerList)
    }

    /// RabidRabbit: ticker endpoint returns a mapping keyed by pair
    pub fn rabidrabbit() -> Self {
        Self::new(
            "rabidrabbit",
            RABIDRABBIT_TICKER_URL,
            RABIDRABBIT_PAIR,
            ResponseShape::TickerMap,
        )
    }

    /// Locate the configured pair in a parsed document.
    ///
    /// `Err` means the document has the wrong top-level shape; `Ok(None)`
    /// means the shape is right but the pair is absent.
    pub fn extract<'a>(&self, document: &'a Value) -> Result<Option<&'a Value>> {
        match self.shape {
            ResponseShape::TickerList => {
                let tickers = document
                    .as_array()
                    .ok_or_else(|| Error::InvalidResponseFormat(self.name.clone()))?;

                Ok(tickers.iter().find(|ticker| {
                    ticker.get("ticker_id").and_then(Value::as_str) == Some(self.pair.as_str())
                }))
            }
            ResponseShape::TickerMap => {
                let tickers = document
                    .as_object()
                    .ok_or_else(|| Error::InvalidResponseFormat(self.name.clone()))?;

                Ok(tickers.get(&self.pair))
            }
        }
    }

    /// Body returned when the pair is missing
    pub fn not_found_message(&self) -> String {
        format!("{} not found", self.pair)
    }
}

/// The two exchanges the site shows prices from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSources {
    /// List-shaped source
    pub klingex: ExchangeSource,
    /// Map-shaped source
    pub rabidrabbit: ExchangeSource,
}

impl Default for ExchangeSources {
    fn default() -> Self {
        Self {
            klingex: ExchangeSource::klingex(),
            rabidrabbit: ExchangeSource::rabidrabbit(),
        }
    }
}

impl ExchangeSources {
    /// Iterate over all sources
    pub fn iter(&self) -> impl Iterator<Item = &ExchangeSource> {
        [&self.klingex, &self.rabidrabbit].into_iter()
    }
}
