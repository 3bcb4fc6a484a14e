//! Market Data Gateway
//!
//! Fetches per-market state (APYs, pool liquidity, pool reserves) and
//! trade quotes from the market maker's public HTTP API. Failures surface
//! as `CalcError::DataSource` with the upstream message; there is no
//! retry here - a calculation run either has fresh data or reports why
//! it does not.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CalcError, CalcResult};
use crate::units;

// ============================================
// CONSTANTS
// ============================================

/// Swap type for buying YT with the stable token
const SWAP_TYPE_YT: u32 = 2;

/// Decimals of the stable token side of a quote
pub const STABLE_DECIMALS: usize = 18;

/// Decimals of the YT side of a quote
pub const YT_DECIMALS: u32 = 6;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct MarketDataResponse {
    #[serde(rename = "underlyingApy", default)]
    underlying_apy: f64,
    #[serde(rename = "impliedApy", default)]
    implied_apy: f64,
    #[serde(default)]
    liquidity: LiquidityField,
    #[serde(rename = "totalPt", default)]
    total_pt: f64,
    #[serde(rename = "totalSy", default)]
    total_sy: f64,
    #[serde(rename = "assetPriceUsd", default)]
    asset_price_usd: f64,
}

#[derive(Debug, Default, Deserialize)]
struct LiquidityField {
    #[serde(default)]
    usd: f64,
}

#[derive(Debug, Deserialize)]
struct SwapQuoteResponse {
    /// Full order: limit-order fills plus the market leg
    #[serde(rename = "totalTrade")]
    total_trade: Option<TradeLeg>,
    /// Market leg only, used when no total is reported
    #[serde(rename = "marketTrade")]
    market_trade: Option<TradeLeg>,
}

#[derive(Debug, Deserialize)]
struct TradeLeg {
    #[serde(rename = "netFromTaker")]
    net_from_taker: String,
    #[serde(rename = "netToTaker")]
    net_to_taker: String,
    #[serde(default)]
    fee: String,
}

// ============================================
// SNAPSHOT TYPES
// ============================================

/// Per-market observation returned by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    /// Yield of the underlying asset (fraction, 0.08 = 8%)
    pub underlying_apy: f64,

    /// Market-implied yield priced into YT
    pub implied_apy: f64,

    /// Total pool liquidity in USD
    pub liquidity_usd: f64,

    /// Pool principal-token reserve (token units)
    pub total_pt: f64,

    /// Pool yield-bearing reserve (token units)
    pub total_sy: f64,

    /// Reference price used to value principal tokens
    pub asset_price_usd: f64,
}

/// A swap quote: fixed-point digit strings exactly as the API returned
/// them. Decoding to display amounts is the trade formatter's job.
#[derive(Debug, Clone)]
pub struct TradeQuote {
    /// Stable-token amount paid in (18 decimals)
    pub net_from_taker: String,

    /// YT amount received (6 decimals)
    pub net_to_taker: String,

    /// Fee charged, in the stable token (18 decimals)
    pub fee: String,
}

// ============================================
// MARKET CLIENT
// ============================================

pub struct MarketClient {
    http_client: Client,
    api_url: String,
    quote_api_url: String,
    chain_id: u64,
}

impl MarketClient {
    pub fn new(config: &Config) -> CalcResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| CalcError::DataSource(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: config.market_api_url.clone(),
            quote_api_url: config.quote_api_url.clone(),
            chain_id: config.chain_id,
        })
    }

    /// Fetch current market state for one market address.
    pub async fn fetch_market(&self, address: &str) -> CalcResult<MarketSnapshot> {
        let url = format!("{}/{}/data", self.api_url, address);
        debug!("Fetching market data: {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CalcError::DataSource(format!("market data request: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalcError::DataSource(format!(
                "market data HTTP {} for {}",
                response.status(),
                address
            )));
        }

        let data: MarketDataResponse = response
            .json()
            .await
            .map_err(|e| CalcError::DataSource(format!("market data decode: {}", e)))?;

        if data.liquidity.usd == 0.0 {
            warn!("Market {} reports zero liquidity", address);
        }

        Ok(MarketSnapshot {
            underlying_apy: data.underlying_apy,
            implied_apy: data.implied_apy,
            liquidity_usd: data.liquidity.usd,
            total_pt: data.total_pt,
            total_sy: data.total_sy,
            asset_price_usd: data.asset_price_usd,
        })
    }

    /// Quote a stable-token -> YT swap for a given USD-denominated amount.
    ///
    /// The amount is converted to an 18-decimal fixed-point string with
    /// digit-string arithmetic, so quotes for very large positions stay
    /// exact on the wire.
    pub async fn quote_yt_swap(&self, market_address: &str, amount: f64) -> CalcResult<TradeQuote> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CalcError::InvalidInput(format!(
                "swap amount must be positive, got {}",
                amount
            )));
        }

        let net_from_taker = units::f64_to_fixed(amount, STABLE_DECIMALS);
        let payload = json!({
            "chainId": self.chain_id,
            "market": market_address,
            "netFromTaker": net_from_taker,
            "type": SWAP_TYPE_YT,
            "cappedAmountToMarket": true,
        });

        debug!("Requesting YT quote for {} on {}", amount, market_address);

        let response = self
            .http_client
            .post(&self.quote_api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CalcError::DataSource(format!("quote request: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalcError::DataSource(format!(
                "quote HTTP {} for {}",
                response.status(),
                market_address
            )));
        }

        let quote: SwapQuoteResponse = response
            .json()
            .await
            .map_err(|e| CalcError::DataSource(format!("quote decode: {}", e)))?;

        // Prefer the full order over the market-only leg
        let leg = quote
            .total_trade
            .or(quote.market_trade)
            .ok_or_else(|| CalcError::DataSource("quote has no trade data".to_string()))?;

        Ok(TradeQuote {
            net_from_taker: leg.net_from_taker,
            net_to_taker: leg.net_to_taker,
            fee: leg.fee,
        })
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_response_decodes_nested_liquidity() {
        let body = r#"{
            "underlyingApy": 0.082,
            "impliedApy": 0.121,
            "liquidity": {"usd": 1234567.89},
            "totalPt": 500000.0,
            "totalSy": 700000.0,
            "assetPriceUsd": 0.998
        }"#;
        let data: MarketDataResponse = serde_json::from_str(body).unwrap();
        assert!((data.liquidity.usd - 1234567.89).abs() < 1e-6);
        assert!((data.underlying_apy - 0.082).abs() < 1e-9);
    }

    #[test]
    fn test_market_response_tolerates_missing_fields() {
        // Sparse payloads default numeric fields to zero instead of failing
        let data: MarketDataResponse =
            serde_json::from_str(r#"{"impliedApy": 0.1}"#).unwrap();
        assert_eq!(data.underlying_apy, 0.0);
        assert_eq!(data.liquidity.usd, 0.0);
        assert!((data.implied_apy - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_quote_prefers_total_trade() {
        let body = r#"{
            "totalTrade": {"netFromTaker": "1000000000000000000000",
                           "netToTaker": "10616200000",
                           "fee": "500000000000000000"},
            "marketTrade": {"netFromTaker": "900000000000000000000",
                            "netToTaker": "9500000000"}
        }"#;
        let quote: SwapQuoteResponse = serde_json::from_str(body).unwrap();
        let leg = quote.total_trade.or(quote.market_trade).unwrap();
        assert_eq!(leg.net_to_taker, "10616200000");
        assert_eq!(leg.fee, "500000000000000000");
    }

    #[test]
    fn test_quote_falls_back_to_market_trade() {
        let body = r#"{"marketTrade": {"netFromTaker": "1000000000000000000",
                                        "netToTaker": "1050000"}}"#;
        let quote: SwapQuoteResponse = serde_json::from_str(body).unwrap();
        let leg = quote.total_trade.or(quote.market_trade).unwrap();
        assert_eq!(leg.net_to_taker, "1050000");
        assert_eq!(leg.fee, "");
    }
}
