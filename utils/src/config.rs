use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::disk_storage::{DiskStorageInterface, FileFormat};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint, a `{}` in the URL is replaced with `rpc_api_key`
    pub rpc_url: String,
    pub rpc_api_key: Option<String>,
    /// Coin registry listing every asset with its per-network contract addresses
    pub registry_url: String,
    /// Registry platform key of the target chain
    pub platform: String,
    pub token_list_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub max_concurrency: usize,
    pub query_timeout_secs: u64,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.infura.io/v3/{}".to_string(),
            rpc_api_key: None,
            registry_url: "https://api.coingecko.com/api/v3/coins/list".to_string(),
            platform: "ethereum".to_string(),
            token_list_path: PathBuf::from("tokens.json"),
            snapshot_path: PathBuf::from("latest_balance.json"),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
            max_concurrency: 32,
            query_timeout_secs: 30,
            port: 3000,
        }
    }
}

impl DiskStorageInterface for Config {
    const FILE_NAME: &'static str = "config";
    const FORMAT: FileFormat = FileFormat::TOML;
}

impl Config {
    pub fn get_rpc(&self) -> crate::Result<String> {
        if self.rpc_url.contains("{}") {
            let api_key = self
                .rpc_api_key
                .as_ref()
                .ok_or_else(|| crate::Error::RpcApiKeyNotSet(self.rpc_url.clone()))?;
            Ok(self.rpc_url.replace("{}", api_key))
        } else {
            Ok(self.rpc_url.clone())
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_storage::tests::temp_path;

    #[test]
    fn test_get_rpc_substitutes_api_key() {
        let config = Config {
            rpc_api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.get_rpc().unwrap(),
            "https://mainnet.infura.io/v3/abc123"
        );
    }

    #[test]
    fn test_get_rpc_without_placeholder() {
        let config = Config {
            rpc_url: "http://localhost:8545".to_string(),
            ..Default::default()
        };
        assert_eq!(config.get_rpc().unwrap(), "http://localhost:8545");
    }

    #[test]
    fn test_get_rpc_missing_api_key() {
        assert!(matches!(
            Config::default().get_rpc(),
            Err(crate::Error::RpcApiKeyNotSet(_))
        ));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let path = temp_path("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "native_symbol = \"MATIC\"\nport = 8080\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.native_symbol, "MATIC");
        assert_eq!(config.port, 8080);
        assert_eq!(config.native_decimals, 18);
        assert_eq!(config.platform, "ethereum");
    }
}
