//! Trade Formatter
//!
//! Turns a raw swap quote (fixed-point digit strings) into display
//! amounts and derived metrics. Thin by design - no market logic here.

use crate::gateway::market::{TradeQuote, STABLE_DECIMALS, YT_DECIMALS};
use crate::units;

/// Human-readable view of an executed (or quoted) swap.
#[derive(Debug, Clone)]
pub struct FormattedTrade {
    /// Stable tokens paid in
    pub paid: f64,
    pub paid_display: String,

    /// YT received
    pub yt_received: f64,
    pub yt_display: String,

    /// Fee, in the stable token
    pub fee: f64,
    pub fee_display: String,

    /// Stable cost per YT; 0 when nothing was received
    pub price_per_yt: f64,

    /// YT exposure per stable token spent ("leverage" on yield)
    pub yt_per_stable: f64,
}

/// Decode a quote's wire amounts into display values.
pub fn format_trade(quote: &TradeQuote) -> FormattedTrade {
    let paid = units::from_fixed(&quote.net_from_taker, STABLE_DECIMALS as u32);
    let yt_received = units::from_fixed(&quote.net_to_taker, YT_DECIMALS);
    let fee = units::from_fixed(&quote.fee, STABLE_DECIMALS as u32);

    let price_per_yt = if yt_received > 0.0 { paid / yt_received } else { 0.0 };
    let yt_per_stable = if paid > 0.0 { yt_received / paid } else { 0.0 };

    FormattedTrade {
        paid,
        paid_display: units::format_fixed(&quote.net_from_taker, STABLE_DECIMALS as u32),
        yt_received,
        yt_display: units::format_fixed(&quote.net_to_taker, YT_DECIMALS),
        fee,
        fee_display: units::format_fixed(&quote.fee, STABLE_DECIMALS as u32),
        price_per_yt,
        yt_per_stable,
    }
}
