//! TVL Data Gateway - Block Explorer + Vault API Integration
//!
//! Collects the raw on-chain balances behind a TVL snapshot: stable-token
//! total supplies, the vault-locked stable balance, per-market YT holder
//! supplies, and the Curve-pool reserves. Supplies and balances come from
//! the block-explorer API; live share prices come from the vault API and
//! fall back to configured reference prices when that fetch fails.
//!
//! The explorer free tier rate-limits aggressively, so calls are strictly
//! sequential with a fixed delay between them.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CalcError, CalcResult};

// ============================================
// CONSTANTS
// ============================================

/// Stable tokens and the vault balance use 18 decimals
const STABLE_DECIMALS: i32 = 18;

/// YT tokens use 6 decimals
const YT_DECIMALS: i32 = 6;

/// The Curve quote-side token uses 6 decimals
const QUOTE_DECIMALS: i32 = 6;

/// Reference price for the Curve quote-side token
const QUOTE_PRICE_USD: f64 = 1.0;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VaultListResponse {
    #[serde(default)]
    vaults: Vec<VaultEntry>,
}

#[derive(Debug, Deserialize)]
struct VaultEntry {
    address: String,
    #[serde(default)]
    state: Option<VaultState>,
}

#[derive(Debug, Deserialize)]
struct VaultState {
    #[serde(rename = "pricePerShareUsd")]
    price_per_share_usd: Option<f64>,
}

// ============================================
// RAW TVL DATA
// ============================================

/// Raw balances and live prices for one snapshot. Token amounts are
/// already converted out of fixed point; classification and pricing into
/// USD categories happens in the engine.
#[derive(Debug, Clone)]
pub struct RawTvlData {
    pub stable_supply: f64,
    pub pool_stable_supply: f64,

    /// Stable-token balance held by the vault contract
    pub vault_locked_balance: f64,

    /// YT holder supply per market key
    pub yt_supply_by_market: HashMap<String, f64>,

    /// Curve-pool stable-token reserve
    pub curve_stable_balance: f64,

    /// Curve-pool quote-token reserve (priced at the fixed reference)
    pub curve_quote_balance: f64,

    pub stable_price: f64,
    pub pool_stable_price: f64,
}

impl RawTvlData {
    /// USD value of the Curve-pool reserves.
    pub fn curve_usd(&self) -> f64 {
        self.curve_stable_balance * self.stable_price
            + self.curve_quote_balance * QUOTE_PRICE_USD
    }
}

// ============================================
// TVL CLIENT
// ============================================

pub struct TvlClient {
    http_client: Client,
    explorer_api_url: String,
    explorer_api_key: Option<String>,
    vault_api_url: String,
    chain_id: u64,
    call_delay: Duration,
}

impl TvlClient {
    pub fn new(config: &Config) -> CalcResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| CalcError::DataSource(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            explorer_api_url: config.explorer_api_url.clone(),
            explorer_api_key: config.explorer_api_key.clone(),
            vault_api_url: config.vault_api_url.clone(),
            chain_id: config.chain_id,
            call_delay: Duration::from_millis(config.explorer_call_delay_ms),
        })
    }

    /// Fetch everything a TVL snapshot needs. Explorer calls run in a
    /// fixed sequence with the configured delay; a failure of any balance
    /// call aborts the snapshot, while price failures fall back.
    pub async fn fetch_raw_tvl(&self, config: &Config) -> CalcResult<RawTvlData> {
        let stable_price = self
            .fetch_share_price(&config.stable_token, config.fallback_stable_price)
            .await;
        let pool_stable_price = self
            .fetch_share_price(&config.pool_stable_token, config.fallback_pool_stable_price)
            .await;

        let stable_supply = self
            .token_supply(&config.stable_token, STABLE_DECIMALS)
            .await?;
        self.throttle().await;

        let pool_stable_supply = self
            .token_supply(&config.pool_stable_token, STABLE_DECIMALS)
            .await?;
        self.throttle().await;

        let vault_locked_balance = self
            .token_balance(&config.stable_token, &config.vault_contract, STABLE_DECIMALS)
            .await?;
        self.throttle().await;

        let mut yt_supply_by_market = HashMap::new();
        for market in &config.markets {
            let supply = self.token_supply(&market.yt_token, YT_DECIMALS).await?;
            yt_supply_by_market.insert(market.key.clone(), supply);
            self.throttle().await;
        }

        let curve_stable_balance = self
            .token_balance(&config.stable_token, &config.curve_pool, STABLE_DECIMALS)
            .await?;
        self.throttle().await;

        let curve_quote_balance = self
            .token_balance(&config.curve_quote_token, &config.curve_pool, QUOTE_DECIMALS)
            .await?;

        info!(
            "TVL raw data: supplies {:.0}/{:.0}, vault {:.0}, curve {:.0}+{:.0}",
            stable_supply,
            pool_stable_supply,
            vault_locked_balance,
            curve_stable_balance,
            curve_quote_balance
        );

        Ok(RawTvlData {
            stable_supply,
            pool_stable_supply,
            vault_locked_balance,
            yt_supply_by_market,
            curve_stable_balance,
            curve_quote_balance,
            stable_price,
            pool_stable_price,
        })
    }

    async fn throttle(&self) {
        tokio::time::sleep(self.call_delay).await;
    }

    /// Live share price from the vault API, falling back on any failure.
    async fn fetch_share_price(&self, vault: &str, fallback: f64) -> f64 {
        match self.try_fetch_share_price(vault).await {
            Ok(price) => {
                debug!("Live share price for {}: {}", vault, price);
                price
            }
            Err(e) => {
                warn!("Share price fetch failed for {}: {} - using fallback {}", vault, e, fallback);
                fallback
            }
        }
    }

    async fn try_fetch_share_price(&self, vault: &str) -> CalcResult<f64> {
        let url = format!(
            "{}?chainId={}&vault={}",
            self.vault_api_url, self.chain_id, vault
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CalcError::DataSource(format!("vault API request: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalcError::DataSource(format!(
                "vault API HTTP {}",
                response.status()
            )));
        }

        let list: VaultListResponse = response
            .json()
            .await
            .map_err(|e| CalcError::DataSource(format!("vault API decode: {}", e)))?;

        list.vaults
            .iter()
            .find(|v| v.address.eq_ignore_ascii_case(vault))
            .and_then(|v| v.state.as_ref())
            .and_then(|s| s.price_per_share_usd)
            .ok_or_else(|| {
                CalcError::DataSource(format!("vault {} not in price response", vault))
            })
    }

    /// Total supply of a token, converted out of fixed point.
    async fn token_supply(&self, token: &str, decimals: i32) -> CalcResult<f64> {
        let url = format!(
            "{}?chainid={}&module=stats&action=tokensupply&contractaddress={}&apikey={}",
            self.explorer_api_url,
            self.chain_id,
            token,
            self.explorer_api_key.as_deref().unwrap_or("")
        );
        self.explorer_amount(&url, decimals, "tokensupply").await
    }

    /// Balance of a token held by one address, converted out of fixed point.
    async fn token_balance(&self, token: &str, holder: &str, decimals: i32) -> CalcResult<f64> {
        let url = format!(
            "{}?chainid={}&module=account&action=tokenbalance&contractaddress={}&address={}&tag=latest&apikey={}",
            self.explorer_api_url,
            self.chain_id,
            token,
            holder,
            self.explorer_api_key.as_deref().unwrap_or("")
        );
        self.explorer_amount(&url, decimals, "tokenbalance").await
    }

    async fn explorer_amount(&self, url: &str, decimals: i32, what: &str) -> CalcResult<f64> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CalcError::DataSource(format!("{} request: {}", what, e)))?;

        if !response.status().is_success() {
            return Err(CalcError::DataSource(format!(
                "{} HTTP {}",
                what,
                response.status()
            )));
        }

        let body: ExplorerResponse = response
            .json()
            .await
            .map_err(|e| CalcError::DataSource(format!("{} decode: {}", what, e)))?;

        if body.status != "1" {
            return Err(CalcError::DataSource(format!(
                "{} failed: {}",
                what, body.message
            )));
        }

        let raw = body
            .result
            .ok_or_else(|| CalcError::DataSource(format!("{}: empty result", what)))?;
        let amount: f64 = raw
            .parse()
            .map_err(|e| CalcError::DataSource(format!("{} parse '{}': {}", what, raw, e)))?;

        Ok(amount / 10f64.powi(decimals))
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_response_decodes() {
        let body = r#"{"status":"1","message":"OK","result":"12345000000000000000000"}"#;
        let resp: ExplorerResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, "1");
        assert_eq!(resp.result.as_deref(), Some("12345000000000000000000"));
    }

    #[test]
    fn test_explorer_error_status() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let resp: ExplorerResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, "0");
    }

    #[test]
    fn test_vault_response_decodes_nested_price() {
        let body = r#"{
            "vaults": [
                {"address": "0xDCD0f5ab30856F28385F641580Bbd85f88349124",
                 "state": {"pricePerShareUsd": 1.0312}}
            ],
            "totalCount": 1
        }"#;
        let list: VaultListResponse = serde_json::from_str(body).unwrap();
        let price = list.vaults[0]
            .state
            .as_ref()
            .unwrap()
            .price_per_share_usd
            .unwrap();
        assert!((price - 1.0312).abs() < 1e-9);
    }

    #[test]
    fn test_curve_usd_sums_both_reserves() {
        let raw = RawTvlData {
            stable_supply: 0.0,
            pool_stable_supply: 0.0,
            vault_locked_balance: 0.0,
            yt_supply_by_market: HashMap::new(),
            curve_stable_balance: 100_000.0,
            curve_quote_balance: 50_000.0,
            stable_price: 1.02,
            pool_stable_price: 1.01,
        };
        assert!((raw.curve_usd() - 152_000.0).abs() < 1e-6);
    }
}
