//! Maturity Clock
//!
//! Day counting is done at calendar-day granularity in UTC: both "now" and
//! the maturity instant are floored to UTC midnight before subtracting.
//! On the maturity date itself 0 days remain - the last day points accrue
//! is the calendar day immediately before maturity.

use chrono::{DateTime, TimeZone, Utc};

/// A market is matured once the current instant reaches its maturity
/// instant. The maturity instant itself counts as matured - no points are
/// earned that day.
pub fn is_matured_at(maturity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= maturity
}

pub fn is_matured(maturity: DateTime<Utc>) -> bool {
    is_matured_at(maturity, Utc::now())
}

/// Whole calendar days remaining until maturity.
///
/// Both instants are floored to UTC midnight; the result is forced to 0
/// when the floored "now" day is on or after the floored maturity day,
/// even if sub-day time remains.
pub fn days_to_maturity_at(maturity: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let today = floor_to_utc_midnight(now);
    let maturity_day = floor_to_utc_midnight(maturity);

    if today >= maturity_day {
        return 0;
    }

    (maturity_day - today).num_days() as u64
}

pub fn days_to_maturity(maturity: DateTime<Utc>) -> u64 {
    days_to_maturity_at(maturity, Utc::now())
}

fn floor_to_utc_midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    let date = instant.date_naive();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}
