//! HTTP surface for balance snapshots.
//!
//! `GET /balances/{address}` bootstraps the token list if needed, aggregates
//! the balances of `address` and responds with a JSON object mapping asset
//! symbol to amount.
pub mod error;
mod serve;

pub use error::{Result, ServerError as Error};
pub use serve::*;
