//! Moonshot - YT Points & Earnings Calculator
//!
//! Run with: cargo run -- --amount 1000
//!
//! Fetches live market and TVL data, classifies protocol TVL into
//! boost-weighted categories, and projects points earnings for a YT
//! position across FDV scenarios up to maturity.

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use futures::future::try_join_all;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod error;
mod gateway;
mod maturity;
mod trade;
mod units;

use config::{Config, MarketConfig};
use engine::classify::WeightedTvl;
use engine::points::{self, BreakevenStatus};
use engine::{classify, daily_points, weight, Category};
use gateway::market::MarketSnapshot;
use gateway::{MarketClient, TvlClient};
use trade::format_trade;

// ============================================
// CLI
// ============================================

#[derive(Debug, Parser)]
#[command(name = "moonshot", about = "YT points & earnings calculator")]
struct Args {
    /// Stable-token amount to swap into YT (fetches a live quote)
    #[arg(long, conflicts_with = "yt_amount")]
    amount: Option<f64>,

    /// Existing YT position size (skips the quote)
    #[arg(long, requires = "cost")]
    yt_amount: Option<f64>,

    /// Cost basis of the existing position in USD
    #[arg(long)]
    cost: Option<f64>,

    /// Market key to evaluate
    #[arg(long, default_value = "dec11")]
    market: String,

    /// Optional TOML config file (falls back to env + defaults)
    #[arg(long)]
    config: Option<String>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🌙 MOONSHOT - YT Points & Earnings Calculator").cyan().bold()
    );
    println!(
        "{}",
        style("    Live TVL | Boosted Points | FDV Scenarios").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

// ============================================
// DISPLAY TABLES
// ============================================

fn print_tvl_table(weighted: &WeightedTvl, referral_reserve: f64) {
    println!();
    println!(
        "  {:<22} {:>16} {:>8} {:>18}",
        style("Category").bold(),
        style("TVL (USD)").bold(),
        style("Boost").bold(),
        style("Weighted (USD)").bold()
    );
    println!("  {}", "─".repeat(68));

    for market in &weighted.markets {
        let suffix = if market.is_matured { " (matured)" } else { "" };
        println!(
            "  {:<22} {:>16.0} {:>8.2} {:>18.0}",
            format!("YT {}{}", market.key, suffix),
            market.yt.raw_usd,
            market.yt.boost,
            market.yt.weighted_usd
        );
        println!(
            "  {:<22} {:>16.0} {:>8.2} {:>18.0}",
            format!("LP {}{}", market.key, suffix),
            market.lp.raw_usd,
            market.lp.boost,
            market.lp.weighted_usd
        );
        if market.lp_pt_usd > 0.0 {
            println!(
                "  {:<22} {:>16.0} {:>8} {:>18}",
                format!("LP {} (PT side)", market.key),
                market.lp_pt_usd,
                "-",
                style("EXCLUDED").dim()
            );
        }
        println!(
            "  {:<22} {:>16.0} {:>8} {:>18}",
            format!("PT {}", market.key),
            market.pt_usd,
            "-",
            style("EXCLUDED").dim()
        );
    }

    println!(
        "  {:<22} {:>16.0} {:>8.2} {:>18.0}",
        "Curve Pool",
        weighted.curve.raw_usd,
        weighted.curve.boost,
        weighted.curve.weighted_usd
    );
    println!(
        "  {:<22} {:>16.0} {:>8.2} {:>18.0}",
        "Other",
        weighted.other.raw_usd,
        weighted.other.boost,
        weighted.other.weighted_usd
    );

    println!("  {}", "─".repeat(68));
    println!(
        "  {:<22} {:>16.0} {:>8} {:>18.0}",
        style("TOTAL").bold(),
        weighted.total_tvl,
        "",
        weighted.total_weighted
    );
    println!(
        "  {:<22} {:>16} {:>8} {:>18.0}",
        style("Referral reserve").dim(),
        "",
        "",
        referral_reserve
    );
}

fn print_minimum_funds_table(weighted: &WeightedTvl, config: &Config) -> Result<()> {
    let rows = points::minimum_funds_for_one_point(weighted, &config.points)?;

    println!();
    println!("{}", style("Minimum funds for 1 point/day:").blue());
    for row in rows {
        if row.min_usd.is_finite() {
            println!(
                "  {:<22} boost {:>5.2}  ${:>12.2}",
                row.category.to_string(),
                row.boost,
                row.min_usd
            );
        } else {
            println!(
                "  {:<22} boost {:>5.2}  {}",
                row.category.to_string(),
                row.boost,
                style("not earning").dim()
            );
        }
    }
    Ok(())
}

fn print_projection_table(
    yt_amount: f64,
    days: u64,
    weighted: &WeightedTvl,
    market_key: &str,
    underlying_apy: f64,
    cost_basis: f64,
    config: &Config,
) -> Result<()> {
    let breakdown = daily_points(
        yt_amount,
        weighted,
        &Category::Yt(market_key.to_string()),
        &config.points,
    )?;

    println!();
    println!(
        "{} Daily points: {:.2} gross, {:.2} fee ({:.0}%), {:.2} net",
        style("✓").green(),
        breakdown.gross,
        breakdown.fee,
        config.points.yt_fee_rate * 100.0,
        breakdown.net
    );
    println!(
        "  Over {} days: {:.2} net points, {:.2} held as fee",
        days,
        breakdown.net * days as f64,
        breakdown.fee * days as f64
    );

    let projections = points::project_earnings(
        yt_amount,
        days,
        weighted,
        market_key,
        underlying_apy,
        cost_basis,
        &config.points,
    )?;

    println!();
    println!(
        "  {:>8} {:>10} {:>14} {:>12} {:>14} {:>9} {:>14}",
        style("FDV ($M)").bold(),
        style("Token $").bold(),
        style("Points $").bold(),
        style("Yield $").bold(),
        style("Total $").bold(),
        style("ROI %").bold(),
        style("Breakeven").bold()
    );
    println!("  {}", "─".repeat(88));

    for p in &projections {
        let breakeven = match p.breakeven {
            BreakevenStatus::Days(d) if d > days => format!("{} d (>mat.)", d),
            BreakevenStatus::Days(d) => format!("{} d", d),
            BreakevenStatus::NoBreakeven => "no breakeven".to_string(),
        };
        let roi = if p.is_profit {
            style(format!("{:>9.2}", p.roi_percent)).green()
        } else {
            style(format!("{:>9.2}", p.roi_percent)).red()
        };
        println!(
            "  {:>8.0} {:>10.4} {:>14.2} {:>12.2} {:>14.2} {} {:>14}",
            p.fdv_musd, p.token_price, p.points_usd, p.yield_usd, p.total_earnings, roi, breakeven
        );
    }

    let breakeven_fdv = points::solve_breakeven_fdv(
        yt_amount,
        days,
        weighted,
        market_key,
        underlying_apy,
        cost_basis,
        &config.points,
    )?;

    println!("  {}", "─".repeat(88));
    match breakeven_fdv {
        Some(fdv) => println!(
            "  {} Breakeven FDV: {}",
            style("◆").cyan(),
            style(format!("${:.1}M", fdv)).cyan().bold()
        ),
        None => println!(
            "  {} No breakeven FDV needed (yield covers cost, or no net points)",
            style("◆").cyan()
        ),
    }

    Ok(())
}

// ============================================
// MAIN
// ============================================

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("moonshot=info".parse()?),
        )
        .init();

    let args = Args::parse();

    print_banner();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }
    config.print_summary();
    println!();

    let market = config
        .market(&args.market)
        .ok_or_else(|| eyre!("unknown market key: {}", args.market))?
        .clone();

    // =============================================
    // PHASE 1: MARKET DATA
    // =============================================
    println!("{}", style("═══ PHASE 1: MARKET DATA ═══").blue().bold());
    println!();

    let market_client = MarketClient::new(&config)?;
    let start = Instant::now();

    // Fan out one fetch per configured market, await jointly
    let snapshots: Vec<MarketSnapshot> = try_join_all(
        config
            .markets
            .iter()
            .map(|m| market_client.fetch_market(&m.address)),
    )
    .await?;
    let market_data: Vec<(MarketConfig, MarketSnapshot)> = config
        .markets
        .iter()
        .cloned()
        .zip(snapshots)
        .collect();

    println!(
        "{} Fetched {} markets in {:?}",
        style("✓").green(),
        market_data.len(),
        start.elapsed()
    );
    for (m, snap) in &market_data {
        let days = maturity::days_to_maturity(m.maturity);
        let status = if maturity::is_matured(m.maturity) {
            style("matured").red().to_string()
        } else {
            format!("{} days left", days)
        };
        println!(
            "   {:<8} underlying {:.2}% | implied {:.2}% | liquidity ${:.0} | {}",
            m.key,
            snap.underlying_apy * 100.0,
            snap.implied_apy * 100.0,
            snap.liquidity_usd,
            status
        );
    }

    let (_, selected_snapshot) = market_data
        .iter()
        .find(|(m, _)| m.key == market.key)
        .ok_or_else(|| eyre!("selected market missing from fetch results"))?;
    let selected_snapshot = *selected_snapshot;

    let days = maturity::days_to_maturity(market.maturity);
    if maturity::is_matured(market.maturity) {
        warn!("Market {} is matured - no further points accrue", market.key);
    }

    // =============================================
    // PHASE 2: TVL CLASSIFICATION
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 2: TVL CLASSIFICATION ═══").magenta().bold());
    println!();

    let tvl_client = TvlClient::new(&config)?;
    let start = Instant::now();
    let raw_tvl = tvl_client.fetch_raw_tvl(&config).await?;
    println!(
        "{} Fetched TVL data in {:?} (prices: {:.4} / {:.4})",
        style("✓").green(),
        start.elapsed(),
        raw_tvl.stable_price,
        raw_tvl.pool_stable_price
    );

    let snapshot = classify(&raw_tvl, &market_data, &config)?;
    let weighted = weight(&snapshot, &config.points, chrono::Utc::now());

    info!(
        "Gross TVL ${:.0}, net ${:.0}, weighted ${:.0} ({} active markets)",
        snapshot.gross_tvl, snapshot.net_tvl, weighted.total_weighted, weighted.active_market_count
    );

    print_tvl_table(&weighted, config.points.referral_reserve);
    print_minimum_funds_table(&weighted, &config)?;

    // =============================================
    // PHASE 3: POSITION
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 3: POSITION ═══").green().bold());
    println!();

    let position = match (args.amount, args.yt_amount) {
        (Some(amount), _) => {
            println!(
                "{}",
                style(format!("Quoting swap of {} stable into YT {}...", amount, market.key))
                    .green()
            );
            let quote = market_client.quote_yt_swap(&market.address, amount).await?;
            let trade = format_trade(&quote);
            println!(
                "{} Pay {} stable → receive {} YT (fee {})",
                style("✓").green(),
                trade.paid_display,
                trade.yt_display,
                trade.fee_display
            );
            println!(
                "   Price per YT: {:.6} | YT exposure per stable: {:.4}x",
                trade.price_per_yt, trade.yt_per_stable
            );
            Some((trade.yt_received, trade.paid))
        }
        (None, Some(yt_amount)) => {
            let cost = args.cost.unwrap_or(0.0);
            println!(
                "Existing position: {} YT {} (cost basis ${:.2})",
                yt_amount, market.key, cost
            );
            Some((yt_amount, cost))
        }
        (None, None) => {
            println!(
                "{}",
                style("No position given - showing TVL and distribution only.").yellow()
            );
            None
        }
    };

    // =============================================
    // PHASE 4: PROJECTIONS
    // =============================================
    if let Some((yt_amount, cost_basis)) = position {
        println!();
        println!("{}", style("═══ PHASE 4: PROJECTIONS ═══").yellow().bold());

        let maturity_apy = points::maturity_return(selected_snapshot.underlying_apy, days);
        println!();
        println!(
            "  Horizon: {} days | underlying APY {:.2}% | compounded return to maturity {:.3}%",
            days,
            selected_snapshot.underlying_apy * 100.0,
            maturity_apy * 100.0
        );

        print_projection_table(
            yt_amount,
            days,
            &weighted,
            &market.key,
            selected_snapshot.underlying_apy,
            cost_basis,
            &config,
        )?;
    }

    // =============================================
    // SUMMARY
    // =============================================
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("{}", style(" ✅ CALCULATION COMPLETE").green().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!();
    println!("Summary:");
    println!("  • Markets fetched: {}", market_data.len());
    println!("  • Active markets: {}", weighted.active_market_count);
    println!("  • Net TVL: ${:.0}", snapshot.net_tvl);
    println!("  • Total weighted TVL: ${:.0}", weighted.total_weighted);
    println!("  • Evaluated market: {} ({} days to maturity)", market.key, days);
    println!();

    Ok(())
}
