//! Calculation core: TVL classification/weighting and points projection.
//!
//! Pure and deterministic - all inputs arrive as immutable snapshots from
//! the gateways, all outputs are fresh values. Nothing here performs I/O.

pub mod classify;
pub mod points;

pub use classify::{classify, weight, Category, TvlSnapshot, WeightedTvl};
pub use points::{
    daily_points, minimum_funds_for_one_point, project_earnings, solve_breakeven_fdv,
    BreakevenStatus, EarningsProjection, PointsBreakdown,
};
