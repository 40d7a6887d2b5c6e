//! Upstream market data sources.
//!
//! This module contains:
//! - The `TickerSource` and `Ticker` traits the client drives
//! - The browser header set applied to every outbound connection
//! - The Yahoo Finance implementation (pooled and direct strategies)

mod headers;
mod traits;

pub mod yahoo;

// Re-exports
pub use headers::{browser_headers, BROWSER_USER_AGENT};
pub use traits::{Ticker, TickerSource};
