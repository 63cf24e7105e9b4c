use alloy::primitives::utils::UnitsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to format amount with {decimals} decimals. (Error: {error})")]
    UnitsFormatFailed { decimals: u8, error: UnitsError },

    #[error("Formatted amount '{0}' is not a valid number. (Error: {1})")]
    AmountParseFailed(String, std::num::ParseFloatError),
}
