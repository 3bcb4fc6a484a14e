//! Typed failures for the calculation core.
//!
//! Gateway failures propagate as `DataSource`; arithmetic precondition
//! violations (empty TVL) fail fast as `DivisionByZero` instead of leaking
//! NaN/Infinity into downstream tables. Zero cost basis is NOT an error -
//! the ratio formulas substitute 0 locally (see engine::points).

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    /// An upstream gateway call failed or returned a non-success payload.
    /// Carries the upstream message. The core never retries.
    DataSource(String),

    /// Total weighted TVL is zero or TVL data is entirely absent when a
    /// points share is requested.
    DivisionByZero(&'static str),

    /// Negative or non-finite amount supplied to a computation.
    InvalidInput(String),
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::DataSource(msg) => write!(f, "data source error: {}", msg),
            CalcError::DivisionByZero(what) => {
                write!(f, "division by zero: {} is zero or missing", what)
            }
            CalcError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

impl std::error::Error for CalcError {}

pub type CalcResult<T> = Result<T, CalcError>;
