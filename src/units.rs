//! Unit conversion between human-readable decimal amounts and fixed-point
//! integer token representations.
//!
//! Conversion INTO fixed point is done with digit-string manipulation so
//! that large amounts never round-trip through f64 on the way to the wire.
//! Conversion OUT is for display only, so f64 precision is acceptable.

/// Convert a decimal amount string to a fixed-point integer string.
///
/// `to_fixed("1.5", 18)` -> `"1500000000000000000"`. Fractional digits
/// beyond `decimals` are truncated, not rounded.
pub fn to_fixed(amount: &str, decimals: usize) -> String {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    let mut frac = frac_part.to_string();
    frac.truncate(decimals);
    while frac.len() < decimals {
        frac.push('0');
    }

    let combined = format!("{}{}", int_part, frac);
    let trimmed = combined.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Convert an f64 amount to a fixed-point integer string.
///
/// Formats with full `decimals` precision first so the digit-string path
/// does the heavy lifting.
pub fn f64_to_fixed(amount: f64, decimals: usize) -> String {
    to_fixed(&format!("{:.*}", decimals, amount), decimals)
}

/// Convert a fixed-point integer string back to an f64 amount.
pub fn from_fixed(raw: &str, decimals: u32) -> f64 {
    raw.parse::<f64>().unwrap_or(0.0) / 10f64.powi(decimals as i32)
}

/// Format a fixed-point integer string as a decimal string with 6 fraction
/// digits (display convention for token amounts).
pub fn format_fixed(raw: &str, decimals: u32) -> String {
    format!("{:.6}", from_fixed(raw, decimals))
}
