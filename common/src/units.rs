use alloy::primitives::{utils::format_units, U256};

/// Normalized amounts below this are treated as dust and not reported.
pub const DUST_THRESHOLD: f64 = 0.000001;

/// Converts a raw integer amount into display units, i.e. `raw / 10^decimals`.
pub fn to_display_amount(raw: U256, decimals: u8) -> crate::Result<f64> {
    let formatted = format_units(raw, decimals)
        .map_err(|error| crate::Error::UnitsFormatFailed { decimals, error })?;

    formatted
        .parse::<f64>()
        .map_err(|e| crate::Error::AmountParseFailed(formatted, e))
}

pub fn is_dust(amount: f64) -> bool {
    amount < DUST_THRESHOLD
}
