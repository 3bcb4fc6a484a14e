//! TVL Classification & Weighting Engine
//!
//! `classify` partitions gross TVL into mutually exclusive categories per
//! market (YT, LP split into yield-bearing vs. principal portions when the
//! pool exposes composition, "other"), and `weight` applies boost
//! multipliers to produce the points-allocation denominator.
//!
//! EXCLUSION RULES:
//! - Principal-token value always carries boost 0 and never enters the
//!   weighted total.
//! - A matured market's YT and LP categories are forced to boost 0.
//! - The vault-locked stable balance is capital already counted in token
//!   supply; it is subtracted from net TVL and never re-counted as "other".

use chrono::{DateTime, Utc};

use crate::config::{Config, MarketConfig, PointsEmissionConfig};
use crate::error::{CalcError, CalcResult};
use crate::gateway::market::MarketSnapshot;
use crate::gateway::tvl::RawTvlData;
use crate::maturity::is_matured_at;

// ============================================
// CATEGORIES
// ============================================

/// Closed set of points-eligible TVL categories. YT and LP positions
/// belong to a specific market; Curve and wallet holdings are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Yt(String),
    Lp(String),
    Curve,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Yt(key) => write!(f, "YT ({})", key),
            Category::Lp(key) => write!(f, "LP ({})", key),
            Category::Curve => write!(f, "Curve Pool"),
            Category::Other => write!(f, "Other"),
        }
    }
}

// ============================================
// SNAPSHOT TYPES
// ============================================

/// LP value split into its pool-reserve components.
#[derive(Debug, Clone, Copy)]
pub struct LpSplit {
    /// Yield-bearing portion (pool SY reserve x live stable price)
    pub sy_usd: f64,
    /// Principal portion (pool PT reserve x peg price) - points-excluded
    pub pt_usd: f64,
}

/// Per-market classified TVL.
#[derive(Debug, Clone)]
pub struct MarketTvl {
    pub key: String,
    pub maturity: DateTime<Utc>,
    pub underlying_apy: f64,
    pub implied_apy: f64,

    /// YT-holder value: YT supply x live stable price (the derivative is
    /// treated as 1:1 redeemable in the stable token for pricing)
    pub yt_usd: f64,

    /// Total pool liquidity as reported by the market gateway
    pub lp_usd: f64,

    /// Present when pool-reserve composition is available
    pub lp_split: Option<LpSplit>,

    /// Principal-token value - permanently points-excluded
    pub pt_usd: f64,
}

impl MarketTvl {
    /// The LP value that is points-eligible: the yield-bearing portion
    /// when a split is available, the whole pool otherwise.
    pub fn lp_eligible_usd(&self) -> f64 {
        match self.lp_split {
            Some(split) => split.sy_usd,
            None => self.lp_usd,
        }
    }
}

/// A point-in-time classification of protocol-wide value. Immutable once
/// constructed; superseded in whole by the next fetch cycle.
#[derive(Debug, Clone)]
pub struct TvlSnapshot {
    /// Sum of (token supply x live price) across both stable tokens
    pub gross_tvl: f64,

    /// Gross minus the vault-locked value
    pub net_tvl: f64,

    pub vault_locked_usd: f64,
    pub curve_usd: f64,

    /// Residual wallet holdings, clamped to zero - data staleness between
    /// sources can otherwise produce small negative artifacts
    pub other_usd: f64,

    pub stable_price: f64,
    pub pool_stable_price: f64,

    pub markets: Vec<MarketTvl>,
}

/// Classify raw gateway balances into the TVL snapshot.
pub fn classify(
    raw: &RawTvlData,
    market_data: &[(MarketConfig, MarketSnapshot)],
    config: &Config,
) -> CalcResult<TvlSnapshot> {
    for (label, value) in [
        ("stable token supply", raw.stable_supply),
        ("pool stable token supply", raw.pool_stable_supply),
        ("vault-locked balance", raw.vault_locked_balance),
        ("curve pool stable balance", raw.curve_stable_balance),
        ("curve pool quote balance", raw.curve_quote_balance),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(CalcError::InvalidInput(format!(
                "{} is {}",
                label, value
            )));
        }
    }

    let stable_price = raw.stable_price;
    let pool_stable_price = raw.pool_stable_price;

    let gross_tvl =
        raw.stable_supply * stable_price + raw.pool_stable_supply * pool_stable_price;
    let vault_locked_usd = raw.vault_locked_balance * stable_price;
    let net_tvl = (gross_tvl - vault_locked_usd).max(0.0);
    let curve_usd = raw.curve_usd();

    let mut markets = Vec::with_capacity(market_data.len());
    for (market, snapshot) in market_data {
        let yt_supply = raw
            .yt_supply_by_market
            .get(&market.key)
            .copied()
            .unwrap_or(0.0);
        let yt_usd = yt_supply * stable_price;

        // Peg price for PT valuation; the gateway's asset price when
        // present, the stable live price otherwise
        let peg_price = if snapshot.asset_price_usd > 0.0 {
            snapshot.asset_price_usd
        } else {
            stable_price
        };
        let pt_usd = snapshot.total_pt * peg_price;

        let lp_split = if market.has_pool_composition
            && (snapshot.total_sy > 0.0 || snapshot.total_pt > 0.0)
        {
            Some(LpSplit {
                sy_usd: snapshot.total_sy * stable_price,
                pt_usd: snapshot.total_pt * peg_price,
            })
        } else {
            None
        };

        markets.push(MarketTvl {
            key: market.key.clone(),
            maturity: market.maturity,
            underlying_apy: snapshot.underlying_apy,
            implied_apy: snapshot.implied_apy,
            yt_usd,
            lp_usd: snapshot.liquidity_usd,
            lp_split,
            pt_usd,
        });
    }

    // Residual holdings. Which categories get subtracted is policy: the
    // default subtracts both the vault value and the Curve-pool value.
    let mut other_usd = gross_tvl - vault_locked_usd;
    if config.subtract_curve_from_other {
        other_usd -= curve_usd;
    }
    let other_usd = other_usd.max(0.0);

    Ok(TvlSnapshot {
        gross_tvl,
        net_tvl,
        vault_locked_usd,
        curve_usd,
        other_usd,
        stable_price,
        pool_stable_price,
        markets,
    })
}

// ============================================
// WEIGHTING
// ============================================

/// One boost-weighted category amount.
#[derive(Debug, Clone, Copy)]
pub struct WeightedCategory {
    pub raw_usd: f64,
    pub boost: f64,
    pub weighted_usd: f64,
}

impl WeightedCategory {
    fn new(raw_usd: f64, boost: f64) -> Self {
        Self {
            raw_usd,
            boost,
            weighted_usd: raw_usd * boost,
        }
    }
}

/// Weighted view of one market.
#[derive(Debug, Clone)]
pub struct WeightedMarket {
    pub key: String,
    pub is_matured: bool,
    pub yt: WeightedCategory,
    /// Eligible LP portion (SY side when split, whole pool otherwise)
    pub lp: WeightedCategory,
    /// Principal portion of the pool, excluded (always weight 0)
    pub lp_pt_usd: f64,
    /// Market-wide principal value, excluded (always weight 0)
    pub pt_usd: f64,
}

/// The TVL snapshot transformed into boost-weighted allocation shares.
#[derive(Debug, Clone)]
pub struct WeightedTvl {
    pub markets: Vec<WeightedMarket>,
    pub curve: WeightedCategory,
    pub other: WeightedCategory,

    /// Denominator of the pro-rata points-share formula. Principal
    /// amounts contribute zero by construction.
    pub total_weighted: f64,

    /// Net TVL carried through for display
    pub total_tvl: f64,

    pub active_market_count: usize,
}

impl WeightedTvl {
    pub fn market(&self, key: &str) -> Option<&WeightedMarket> {
        self.markets.iter().find(|m| m.key == key)
    }

    /// Resolve the effective boost for a category, including the
    /// maturity-forced zeros baked in at weighting time.
    pub fn effective_boost(&self, category: &Category) -> CalcResult<f64> {
        match category {
            Category::Yt(key) => self
                .market(key)
                .map(|m| m.yt.boost)
                .ok_or_else(|| CalcError::InvalidInput(format!("unknown market: {}", key))),
            Category::Lp(key) => self
                .market(key)
                .map(|m| m.lp.boost)
                .ok_or_else(|| CalcError::InvalidInput(format!("unknown market: {}", key))),
            Category::Curve => Ok(self.curve.boost),
            Category::Other => Ok(self.other.boost),
        }
    }
}

/// Apply boost multipliers to a classified snapshot.
///
/// The LP boost is conditional on how many markets are simultaneously
/// non-matured: exactly one active market earns the higher single-market
/// boost. Matured markets are forced to boost 0 regardless of raw value.
pub fn weight(snapshot: &TvlSnapshot, points: &PointsEmissionConfig, now: DateTime<Utc>) -> WeightedTvl {
    let boosts = &points.boosts;

    let active_market_count = snapshot
        .markets
        .iter()
        .filter(|m| !is_matured_at(m.maturity, now))
        .count();

    let lp_boost_active = if active_market_count == 1 {
        boosts.lp_single
    } else {
        boosts.lp_multi
    };

    let mut markets = Vec::with_capacity(snapshot.markets.len());
    let mut total_weighted = 0.0;

    for market in &snapshot.markets {
        let matured = is_matured_at(market.maturity, now);
        let yt_boost = if matured { 0.0 } else { boosts.yt };
        let lp_boost = if matured { 0.0 } else { lp_boost_active };

        let yt = WeightedCategory::new(market.yt_usd, yt_boost);
        let lp = WeightedCategory::new(market.lp_eligible_usd(), lp_boost);
        total_weighted += yt.weighted_usd + lp.weighted_usd;

        markets.push(WeightedMarket {
            key: market.key.clone(),
            is_matured: matured,
            yt,
            lp,
            lp_pt_usd: market.lp_split.map(|s| s.pt_usd).unwrap_or(0.0),
            pt_usd: market.pt_usd,
        });
    }

    let curve = WeightedCategory::new(snapshot.curve_usd, boosts.curve);
    let other = WeightedCategory::new(snapshot.other_usd, boosts.other);
    total_weighted += curve.weighted_usd + other.weighted_usd;

    WeightedTvl {
        markets,
        curve,
        other,
        total_weighted,
        total_tvl: snapshot.net_tvl,
        active_market_count,
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config::default()
    }

    fn raw_data() -> RawTvlData {
        let mut yt_supply_by_market = HashMap::new();
        yt_supply_by_market.insert("oct23".to_string(), 1_000_000.0);
        yt_supply_by_market.insert("dec11".to_string(), 2_000_000.0);

        RawTvlData {
            stable_supply: 10_000_000.0,
            pool_stable_supply: 5_000_000.0,
            vault_locked_balance: 1_000_000.0,
            curve_stable_balance: 500_000.0,
            curve_quote_balance: 0.0,
            yt_supply_by_market,
            stable_price: 1.0,
            pool_stable_price: 1.0,
        }
    }

    fn snapshot_for(liquidity_usd: f64, total_pt: f64, total_sy: f64) -> MarketSnapshot {
        MarketSnapshot {
            underlying_apy: 0.08,
            implied_apy: 0.12,
            liquidity_usd,
            total_pt,
            total_sy,
            asset_price_usd: 1.0,
        }
    }

    fn market_pair(config: &Config) -> Vec<(MarketConfig, MarketSnapshot)> {
        vec![
            (
                config.market("oct23").unwrap().clone(),
                snapshot_for(400_000.0, 300_000.0, 0.0),
            ),
            (
                config.market("dec11").unwrap().clone(),
                snapshot_for(600_000.0, 250_000.0, 350_000.0),
            ),
        ]
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_classify_gross_and_net() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        assert!((snap.gross_tvl - 15_000_000.0).abs() < 1e-6);
        assert!((snap.vault_locked_usd - 1_000_000.0).abs() < 1e-6);
        assert!((snap.net_tvl - 14_000_000.0).abs() < 1e-6);
        assert!(snap.gross_tvl >= snap.net_tvl && snap.net_tvl >= 0.0);
    }

    #[test]
    fn test_classify_other_subtracts_vault_and_curve() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        // 15M gross - 1M vault - 0.5M curve
        assert!((snap.other_usd - 13_500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_classify_other_vault_only_variant() {
        let mut config = test_config();
        config.subtract_curve_from_other = false;
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        assert!((snap.other_usd - 14_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_classify_other_clamped_non_negative() {
        let config = test_config();
        let mut raw = raw_data();
        // Stale curve balance larger than everything else
        raw.curve_stable_balance = 50_000_000.0;
        let snap = classify(&raw, &market_pair(&config), &config).unwrap();
        assert_eq!(snap.other_usd, 0.0);
    }

    #[test]
    fn test_classify_lp_split_present_only_with_composition() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        let oct = &snap.markets[0];
        let dec = &snap.markets[1];
        assert!(oct.lp_split.is_none());
        let split = dec.lp_split.unwrap();
        assert!((split.sy_usd - 350_000.0).abs() < 1e-6);
        assert!((split.pt_usd - 250_000.0).abs() < 1e-6);
        // Split sums to roughly the reported pool value
        assert!((split.sy_usd + split.pt_usd - dec.lp_usd).abs() / dec.lp_usd < 0.01);
    }

    #[test]
    fn test_classify_rejects_negative_supply() {
        let config = test_config();
        let mut raw = raw_data();
        raw.stable_supply = -1.0;
        assert!(matches!(
            classify(&raw, &market_pair(&config), &config),
            Err(CalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_weight_matured_market_forces_zero() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        // Between the two maturities: oct23 matured, dec11 active
        let now = utc("2025-11-15T12:00:00Z");
        let weighted = weight(&snap, &config.points, now);

        let oct = weighted.market("oct23").unwrap();
        assert!(oct.is_matured);
        assert_eq!(oct.yt.weighted_usd, 0.0);
        assert_eq!(oct.lp.weighted_usd, 0.0);
        // Raw amounts are preserved for display
        assert!(oct.yt.raw_usd > 0.0);
    }

    #[test]
    fn test_weight_single_market_lp_boost() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();

        // One active market -> higher LP boost
        let weighted = weight(&snap, &config.points, utc("2025-11-15T00:00:00Z"));
        assert_eq!(weighted.active_market_count, 1);
        let dec = weighted.market("dec11").unwrap();
        assert_eq!(dec.lp.boost, config.points.boosts.lp_single);

        // Two active markets -> multi boost
        let weighted = weight(&snap, &config.points, utc("2025-09-01T00:00:00Z"));
        assert_eq!(weighted.active_market_count, 2);
        let dec = weighted.market("dec11").unwrap();
        assert_eq!(dec.lp.boost, config.points.boosts.lp_multi);
    }

    #[test]
    fn test_weight_pt_never_contributes() {
        let config = test_config();
        let mut raw = raw_data();
        raw.curve_stable_balance = 0.0;
        let mut markets = market_pair(&config);
        // Enormous PT supply must not move the weighted total
        markets[1].1.total_pt = 1_000_000_000.0;
        markets[1].1.total_sy = 0.0;

        let snap = classify(&raw, &markets, &config).unwrap();
        let weighted = weight(&snap, &config.points, utc("2025-09-01T00:00:00Z"));

        let expected = weighted
            .markets
            .iter()
            .map(|m| m.yt.weighted_usd + m.lp.weighted_usd)
            .sum::<f64>()
            + weighted.curve.weighted_usd
            + weighted.other.weighted_usd;
        assert!((weighted.total_weighted - expected).abs() < 1e-6);

        let dec = weighted.market("dec11").unwrap();
        assert!(dec.pt_usd >= 1_000_000_000.0);
        // PT value appears nowhere in the weighted sum
        assert!(weighted.total_weighted < 100_000_000.0);
    }

    #[test]
    fn test_effective_boost_unknown_market() {
        let config = test_config();
        let snap = classify(&raw_data(), &market_pair(&config), &config).unwrap();
        let weighted = weight(&snap, &config.points, utc("2025-09-01T00:00:00Z"));

        assert!(weighted
            .effective_boost(&Category::Yt("nope".to_string()))
            .is_err());
        assert_eq!(
            weighted.effective_boost(&Category::Other).unwrap(),
            config.points.boosts.other
        );
    }
}
