use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    disk_storage::{DiskStorageInterface, FileFormat},
    Reqwest,
};

/// A fungible token contract known to the registry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TokenDescriptor {
    pub name: String,
    pub symbol: String,
    #[serde(rename = "ethereumAddress", alias = "contractAddress")]
    pub contract_address: String,
}

/// The token list as persisted on disk, a plain JSON array of descriptors.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct TokenList(pub Vec<TokenDescriptor>);

impl DiskStorageInterface for TokenList {
    const FILE_NAME: &'static str = "tokens";
    const FORMAT: FileFormat = FileFormat::JSON;
}

/// Entry of the remote coin registry.
#[derive(Deserialize, Debug)]
pub struct Coin {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub platforms: HashMap<String, Option<String>>,
}

/// Keeps coins deployed on `platform` and shapes them into descriptors.
pub fn tokens_on_platform(coins: Vec<Coin>, platform: &str) -> Vec<TokenDescriptor> {
    coins
        .into_iter()
        .filter_map(|coin| {
            let contract_address = coin.platforms.get(platform).cloned().flatten()?;
            (!contract_address.trim().is_empty()).then_some(TokenDescriptor {
                name: coin.name,
                symbol: coin.symbol,
                contract_address,
            })
        })
        .collect()
}

/// Local token list, bootstrapped once from the remote registry.
pub struct TokenRegistry {
    path: PathBuf,
    registry_url: String,
    platform: String,
    bootstrap: Mutex<()>,
    descriptors: ArcSwapOption<Vec<TokenDescriptor>>,
}

impl TokenRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.token_list_path.clone(),
            registry_url: config.registry_url.clone(),
            platform: config.platform.clone(),
            bootstrap: Mutex::new(()),
            descriptors: ArcSwapOption::empty(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetches the token list from the registry if it is not on disk yet.
    /// Concurrent callers wait on a single bootstrap.
    pub async fn ensure_loaded(&self) -> crate::Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        let _guard = self.bootstrap.lock().await;
        if self.path.exists() {
            return Ok(());
        }

        info!(url = %self.registry_url, "token list not found, fetching from registry");
        let coins = Reqwest::get(&self.registry_url)?
            .query(&[("include_platform", "true")])
            .receive_json::<Vec<Coin>>()
            .await?;

        let tokens = tokens_on_platform(coins, &self.platform);
        info!(
            count = tokens.len(),
            platform = %self.platform,
            path = %self.path.display(),
            "saving token list"
        );

        TokenList(tokens).save_to(&self.path)?;
        self.descriptors.store(None);

        Ok(())
    }

    /// Token descriptors from disk, cached after the first successful read.
    /// A failed read is logged and gives an empty list.
    pub fn load_descriptors(&self) -> Arc<Vec<TokenDescriptor>> {
        if let Some(descriptors) = self.descriptors.load_full() {
            return descriptors;
        }

        if !self.path.exists() {
            debug!(path = %self.path.display(), "token list not on disk");
            return Arc::new(Vec::new());
        }

        match TokenList::load_from(&self.path) {
            Ok(TokenList(tokens)) => {
                let tokens = Arc::new(tokens);
                self.descriptors.store(Some(Arc::clone(&tokens)));
                tokens
            }
            Err(e) => {
                warn!("failed to load token list: {e}");
                Arc::new(Vec::new())
            }
        }
    }
}
