//! Calculator configuration
//!
//! All parameters are fixed at initialization and passed by value into the
//! computation calls - nothing here is mutated at runtime. Each refresh
//! cycle builds a fresh TVL snapshot from gateway data instead of patching
//! prices into a shared config object.

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

// ============================================
// MARKETS
// ============================================

/// A fixed-maturity market instance. Markets are a keyed collection
/// iterated uniformly - adding or retiring one is a data change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Short identifier used in CLI args and per-market maps
    pub key: String,

    /// On-chain market address (opaque - only forwarded to the gateway)
    pub address: String,

    /// YT token contract for holder-supply queries
    pub yt_token: String,

    /// Fixed maturity instant (UTC). Never changes after creation.
    pub maturity: DateTime<Utc>,

    /// Whether the market's gateway data exposes pool-reserve composition
    /// (SY vs PT amounts), enabling the LP value split
    pub has_pool_composition: bool,
}

// ============================================
// POINTS EMISSION
// ============================================

/// Boost multipliers per TVL category. The LP boost depends on how many
/// markets are simultaneously active: `lp_single` applies when exactly one
/// market remains non-matured, `lp_multi` otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostTable {
    pub yt: f64,
    pub lp_multi: f64,
    pub lp_single: f64,
    pub curve: f64,
    pub other: f64,
}

impl Default for BoostTable {
    fn default() -> Self {
        Self {
            yt: 5.0,
            lp_multi: 1.25,
            lp_single: 1.5,
            curve: 3.0,
            other: 1.0,
        }
    }
}

/// Points program parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsEmissionConfig {
    /// Points distributed pro-rata per day. The referral reserve is
    /// already excluded from this figure.
    pub daily_emission: f64,

    /// Points reserved off the top for the referral program each day.
    /// A separate constant bucket - never enters the pro-rata formula.
    pub referral_reserve: f64,

    /// Platform fee applied to the YT category's emitted points only,
    /// deducted after pro-rata allocation
    pub yt_fee_rate: f64,

    /// Total token supply used to convert an FDV into a per-token price
    pub total_token_supply: f64,

    /// Hypothetical FDV scenarios to evaluate, in millions of USD,
    /// in display order
    pub fdv_scenarios_musd: Vec<f64>,

    pub boosts: BoostTable,
}

impl Default for PointsEmissionConfig {
    fn default() -> Self {
        Self {
            // 333,333 gross minus the 16,667 referral reserve
            daily_emission: 316_666.0,
            referral_reserve: 16_667.0,
            yt_fee_rate: 0.05,
            total_token_supply: 1_000_000_000.0,
            fdv_scenarios_musd: vec![90.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0],
            boosts: BoostTable::default(),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== API endpoints ==========
    /// Market-data API base URL (per-market data is at `{base}/{address}/data`)
    pub market_api_url: String,

    /// Swap-quote (market-order) endpoint
    pub quote_api_url: String,

    /// Block-explorer API base URL for supplies and balances
    pub explorer_api_url: String,

    /// Block-explorer API key
    pub explorer_api_key: Option<String>,

    /// Vault API returning live share prices for the stable tokens
    pub vault_api_url: String,

    pub chain_id: u64,

    // ========== Token addresses ==========
    /// Primary stable-value token (prices YT 1:1 for points purposes)
    pub stable_token: String,

    /// Secondary stable-value token
    pub pool_stable_token: String,

    /// Yield-bearing vault contract; its stable-token balance is capital
    /// already counted in total supply and is subtracted from net TVL
    pub vault_contract: String,

    /// Curve pool whose token balances earn the curve boost
    pub curve_pool: String,

    /// The quote-side token of the Curve pool (6 decimals, priced 1:1)
    pub curve_quote_token: String,

    // ========== Fallback prices ==========
    /// Used when the live price fetch fails
    pub fallback_stable_price: f64,
    pub fallback_pool_stable_price: f64,

    // ========== Classification policy ==========
    /// Whether "other" TVL subtracts the Curve-pool value in addition to
    /// the vault-locked value. The subtracted set is a business-policy
    /// choice; both variants have shipped.
    pub subtract_curve_from_other: bool,

    // ========== Rate limiting ==========
    /// Fixed delay between consecutive explorer calls (milliseconds)
    pub explorer_call_delay_ms: u64,

    /// Per-request HTTP timeout (seconds)
    pub http_timeout_secs: u64,

    pub markets: Vec<MarketConfig>,
    pub points: PointsEmissionConfig,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = env::var("MARKET_API_URL") {
            config.market_api_url = url;
        }
        if let Ok(url) = env::var("QUOTE_API_URL") {
            config.quote_api_url = url;
        }
        if let Ok(url) = env::var("EXPLORER_API_URL") {
            config.explorer_api_url = url;
        }
        config.explorer_api_key = env::var("EXPLORER_API_KEY").ok();
        if let Ok(url) = env::var("VAULT_API_URL") {
            config.vault_api_url = url;
        }
        if let Ok(v) = env::var("CHAIN_ID") {
            config.chain_id = v.parse().unwrap_or(1);
        }
        if let Ok(v) = env::var("EXPLORER_CALL_DELAY_MS") {
            config.explorer_call_delay_ms = v.parse().unwrap_or(250);
        }
        if let Ok(v) = env::var("SUBTRACT_CURVE_FROM_OTHER") {
            config.subtract_curve_from_other = v.parse().unwrap_or(true);
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Default market set: the October and December maturities
    fn default_markets() -> Vec<MarketConfig> {
        vec![
            MarketConfig {
                key: "oct23".to_string(),
                address: "0x79f06a8dc564717a9ad418049d0be9a60f2646c0".to_string(),
                yt_token: "0xd7c3fc198Bd7A50B99629cfe302006E9224f087b".to_string(),
                maturity: "2025-10-23T00:00:00Z".parse().expect("valid maturity"),
                has_pool_composition: false,
            },
            MarketConfig {
                key: "dec11".to_string(),
                address: "0x9b4b9d91f9d0a1b1dbdd1b8f6b6b44e3b8a78f7f".to_string(),
                yt_token: "0xBA31C7c0189E9B6ab6CF6b27CD3D1A4D6d3d0Fd6".to_string(),
                maturity: "2025-12-11T00:00:00Z".parse().expect("valid maturity"),
                has_pool_composition: true,
            },
        ]
    }

    /// Look up a market by key
    pub fn market(&self, key: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.key == key)
    }

    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            return Err(eyre::eyre!("at least one market must be configured"));
        }

        let mut keys = HashSet::new();
        for market in &self.markets {
            if !keys.insert(market.key.as_str()) {
                return Err(eyre::eyre!("duplicate market key: {}", market.key));
            }
        }

        let p = &self.points;
        if p.daily_emission <= 0.0 {
            return Err(eyre::eyre!("daily_emission must be positive"));
        }
        if !(0.0..=1.0).contains(&p.yt_fee_rate) {
            return Err(eyre::eyre!(
                "yt_fee_rate must be in [0,1] (currently {})",
                p.yt_fee_rate
            ));
        }
        if p.total_token_supply <= 0.0 {
            return Err(eyre::eyre!("total_token_supply must be positive"));
        }
        if p.fdv_scenarios_musd.is_empty() {
            return Err(eyre::eyre!("at least one FDV scenario is required"));
        }
        let b = &p.boosts;
        for (name, v) in [
            ("yt", b.yt),
            ("lp_multi", b.lp_multi),
            ("lp_single", b.lp_single),
            ("curve", b.curve),
            ("other", b.other),
        ] {
            if v < 0.0 {
                return Err(eyre::eyre!("boost {} must be non-negative", name));
            }
        }

        if self.fallback_stable_price <= 0.0 || self.fallback_pool_stable_price <= 0.0 {
            return Err(eyre::eyre!("fallback prices must be positive"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║            MOONSHOT CALCULATOR - CONFIGURATION             ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Markets:           {:^40} ║", self.markets.len());
        for market in &self.markets {
            println!(
                "║ • {:<10} maturity {:<37} ║",
                market.key,
                market.maturity.format("%Y-%m-%d").to_string()
            );
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ POINTS PROGRAM                                             ║");
        println!("║ • Daily emission:  {:<40.0} ║", self.points.daily_emission);
        println!("║ • Referral reserve:{:<40.0} ║", self.points.referral_reserve);
        println!(
            "║ • YT fee rate:     {:<39.1}% ║",
            self.points.yt_fee_rate * 100.0
        );
        println!(
            "║ • FDV scenarios:   {:^40} ║",
            self.points.fdv_scenarios_musd.len()
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║ Explorer API key:  {:^40} ║",
            if self.explorer_api_key.is_some() {
                "✓ Configured"
            } else {
                "✗ Not Set"
            }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market_api_url: "https://api-v2.pendle.finance/core/v2/1/markets".to_string(),
            quote_api_url:
                "https://api-v2.pendle.finance/limit-order/v2/limit-order/market-order"
                    .to_string(),
            explorer_api_url: "https://api.etherscan.io/v2/api".to_string(),
            explorer_api_key: None,
            vault_api_url: "https://app.lagoon.finance/api/vaults".to_string(),
            chain_id: 1,
            stable_token: "0xDCD0f5ab30856F28385F641580Bbd85f88349124".to_string(),
            pool_stable_token: "0x5a97b0b97197299456af841f8605543b13b12ee3".to_string(),
            vault_contract: "0x8e5e017d6b3F567623B5d4a690a2a686bF7BA515".to_string(),
            curve_pool: "0x463626cF9028d96eAd5084954FF634f813D5fFB9".to_string(),
            curve_quote_token: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
            fallback_stable_price: 1.0243,
            fallback_pool_stable_price: 1.01,
            subtract_curve_from_other: true,
            explorer_call_delay_ms: 250,
            http_timeout_secs: 10,
            markets: Self::default_markets(),
            points: PointsEmissionConfig::default(),
        }
    }
}

// ============================================
// TESTS
// ============================================
