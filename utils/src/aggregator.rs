//! Balance aggregation: one native balance query plus a bounded fan-out of
//! ERC-20 queries, merged into a single [`BalanceSnapshot`].
//!
//! Every sub-query is best-effort. A failed, timed out or dust-sized result
//! only drops its own entry, the aggregation as a whole never fails.

use std::{
    collections::{BTreeMap, HashSet},
    future::Future,
    sync::Arc,
    time::Duration,
};

use alloy::primitives::Address;
use futures::stream::{self, StreamExt};
use tally_common::units::{is_dust, to_display_amount};
use tracing::{debug, info};

use crate::{
    alloy::StringExt,
    config::Config,
    contract_cache::ContractCache,
    snapshot::{BalanceSnapshot, SnapshotSink},
    source::{BalanceSource, TokenContract},
    token_list::TokenDescriptor,
};

#[derive(Clone, Debug)]
pub struct AggregatorOptions {
    pub native_symbol: String,
    pub native_decimals: u8,
    /// Upper bound on token queries in flight at once
    pub max_concurrency: usize,
    /// Applied to each RPC call separately
    pub query_timeout: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AggregatorOptions {
    fn from(config: &Config) -> Self {
        Self {
            native_symbol: config.native_symbol.clone(),
            native_decimals: config.native_decimals,
            max_concurrency: config.max_concurrency,
            query_timeout: config.query_timeout(),
        }
    }
}

struct TokenEntry {
    name: String,
    symbol: String,
    contract: Address,
    amount: f64,
}

pub struct Aggregator<S: BalanceSource> {
    source: S,
    sink: Arc<dyn SnapshotSink>,
    options: AggregatorOptions,
}

impl<S: BalanceSource> Aggregator<S> {
    pub fn new(source: S, sink: Arc<dyn SnapshotSink>, options: AggregatorOptions) -> Self {
        Self {
            source,
            sink,
            options,
        }
    }

    /// Snapshot of `address` across the native asset and `tokens`.
    ///
    /// The snapshot is handed to the sink before it is returned.
    pub async fn aggregate(&self, address: &str, tokens: &[TokenDescriptor]) -> BalanceSnapshot {
        let snapshot = match address.parse_as_address() {
            Ok(owner) => {
                let (native, token_entries) =
                    tokio::join!(self.native_entry(owner), self.token_entries(owner, tokens));
                BalanceSnapshot::new(self.merge(native, token_entries))
            }
            Err(e) => {
                debug!("every query fails for this account: {e}");
                BalanceSnapshot::new(BTreeMap::new())
            }
        };

        info!(
            %address,
            tokens = tokens.len(),
            reported = snapshot.len(),
            "aggregation complete"
        );

        self.sink.persist(&snapshot);
        snapshot
    }

    async fn native_entry(&self, owner: Address) -> Option<f64> {
        let result = async {
            let raw = self
                .timed("native balance", self.source.native_balance(owner))
                .await?;
            Ok::<_, crate::Error>(to_display_amount(raw, self.options.native_decimals)?)
        }
        .await;

        result
            .inspect_err(|e| {
                debug!(symbol = %self.options.native_symbol, "skipping native balance: {e}")
            })
            .ok()
    }

    /// Results come back in the order of `tokens`, which keeps the merge deterministic.
    async fn token_entries(
        &self,
        owner: Address,
        tokens: &[TokenDescriptor],
    ) -> Vec<Option<TokenEntry>> {
        let cache = ContractCache::new();

        // Built up front: a borrowing `.map` closure kept inside the stream makes the
        // future non-`Send`. Each query stays idle until `buffered` polls it.
        let queries: Vec<_> = tokens
            .iter()
            .map(|token| self.token_entry(&cache, owner, token))
            .collect();

        stream::iter(queries)
            .buffered(self.options.max_concurrency.max(1))
            .collect()
            .await
    }

    async fn token_entry(
        &self,
        cache: &ContractCache<S::Contract>,
        owner: Address,
        token: &TokenDescriptor,
    ) -> Option<TokenEntry> {
        match self.query_token(cache, owner, token).await {
            Ok((_, amount)) if is_dust(amount) => {
                debug!(token = %token.name, amount, "below dust threshold");
                None
            }
            Ok((contract, amount)) => Some(TokenEntry {
                name: token.name.clone(),
                symbol: token.symbol.clone(),
                contract,
                amount,
            }),
            Err(e) => {
                debug!(token = %token.name, "skipping token: {e}");
                None
            }
        }
    }

    async fn query_token(
        &self,
        cache: &ContractCache<S::Contract>,
        owner: Address,
        token: &TokenDescriptor,
    ) -> crate::Result<(Address, f64)> {
        let address = token.contract_address.parse_as_address()?;
        let contract = cache.get(address, || self.source.contract(address)).await;

        let (decimals, raw) = tokio::try_join!(
            self.timed("decimals", contract.decimals()),
            self.timed("balanceOf", contract.balance_of(owner)),
        )?;

        Ok((address, to_display_amount(raw, decimals)?))
    }

    async fn timed<T>(
        &self,
        query: &'static str,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        let after = self.options.query_timeout;
        tokio::time::timeout(after, fut)
            .await
            .map_err(|_| crate::Error::QueryTimedOut { query, after })?
    }

    /// Native entry first, then tokens in list order. A contract listed twice
    /// is reported once. A display name already taken is qualified with the
    /// symbol, then with the contract address.
    fn merge(
        &self,
        native: Option<f64>,
        tokens: Vec<Option<TokenEntry>>,
    ) -> BTreeMap<String, f64> {
        let mut balances = BTreeMap::new();
        if let Some(amount) = native {
            balances.insert(self.options.native_symbol.clone(), amount);
        }

        let mut seen = HashSet::new();
        for entry in tokens.into_iter().flatten() {
            if !seen.insert(entry.contract) {
                continue;
            }

            let key = [
                entry.name.clone(),
                format!("{} ({})", entry.name, entry.symbol),
                format!("{} ({})", entry.name, entry.contract),
            ]
            .into_iter()
            .find(|key| !balances.contains_key(key));

            match key {
                Some(key) => {
                    balances.insert(key, entry.amount);
                }
                None => debug!(
                    token = %entry.name,
                    contract = %entry.contract,
                    "no free key for token"
                ),
            }
        }

        balances
    }
}
