//! Remote data gateways.
//!
//! All network I/O lives here. The calculation engine consumes the typed
//! snapshots these clients produce and never touches HTTP itself.

pub mod market;
pub mod tvl;

pub use market::{MarketClient, MarketSnapshot, TradeQuote};
pub use tvl::{RawTvlData, TvlClient};
