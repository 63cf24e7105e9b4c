use std::{path::PathBuf, time::Duration};

use alloy::primitives::Address;
use url::Url;

use crate::reqwest::{ReqwestErrorContext, ReqwestInnerError, ReqwestStage};

pub type Result<T> = std::result::Result<T, UtilsError>;

#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    #[error(transparent)]
    Units(#[from] tally_common::Error),

    #[error("Address '{0}' is not a valid Ethereum address.")]
    InvalidAddress(String),

    #[error("RPC URL '{0}' expects an API key, please set `rpc_api_key` in the config.")]
    RpcApiKeyNotSet(String),

    #[error("Failed to get base directories.")]
    BaseDirsFailed,

    #[error("Failed to create directory: {0:?}. (Error: {1:?})")]
    CreateDirAllFailed(PathBuf, std::io::Error),

    #[error("Failed to read the file: {0}. (Error: {1:?})")]
    FileReadFailed(PathBuf, std::io::Error),

    #[error("Failed to write to the file: {0}. (Error: {1:?})")]
    FileWriteFailed(PathBuf, std::io::Error),

    #[error("Parsing the toml file failed: {0}. (Error: {1:?})")]
    TomlParsingFailed(PathBuf, toml::de::Error),

    #[error("Formatting to toml format failed: {0}. (Error: {1:?})")]
    TomlFormattingFailed(String, toml::ser::Error),

    #[error("Parsing the json file failed: {0}. (Error: {1:?})")]
    JsonParsingFailed(PathBuf, serde_json::Error),

    #[error("Formatting to json format failed: {0}. (Error: {1:?})")]
    JsonFormattingFailed(String, serde_json::Error),

    #[error("Failed to parse URL: {0}. (Error: {1:?})")]
    UrlParsingFailed(String, url::ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Please check your internet connection, the URL seems to be unreachable: {0}")]
    Internet(Url),

    #[error("Request '{url}' failed at stage '{stage:?}' (Error='{inner:?}', Context='{context:?}')", url = context.url)]
    ReqwestFailed {
        stage: ReqwestStage,
        context: Box<ReqwestErrorContext>,
        inner: ReqwestInnerError,
    },

    #[error("Reqwest builder missing error context, this is a bug please report it.")]
    ReqwestErrorContextMissing,

    #[error("Failed to fetch native balance of {address}. (Error: {error})")]
    NativeBalanceFailed {
        address: Address,
        error: Box<alloy::transports::TransportError>,
    },

    #[error("Call to {method}() on token contract {contract} failed. (Error: {error})")]
    ContractCallFailed {
        contract: Address,
        method: &'static str,
        error: Box<alloy::contract::Error>,
    },

    #[error("Query '{query}' did not complete within {after:?}.")]
    QueryTimedOut {
        query: &'static str,
        after: Duration,
    },
}
