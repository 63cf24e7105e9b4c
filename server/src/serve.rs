use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tally_utils::{Aggregator, BalanceSource, TokenRegistry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct AppState<S: BalanceSource> {
    aggregator: Arc<Aggregator<S>>,
    registry: Arc<TokenRegistry>,
}

impl<S: BalanceSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            aggregator: Arc::clone(&self.aggregator),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: BalanceSource> AppState<S> {
    pub fn new(aggregator: Aggregator<S>, registry: TokenRegistry) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            registry: Arc::new(registry),
        }
    }
}

pub fn router<S: BalanceSource>(state: AppState<S>) -> Router {
    Router::new()
        .route("/balances/{address}", get(balances::<S>))
        .with_state(state)
}

/// Start the HTTP server. Runs until `shutdown_signal` is cancelled, then
/// lets in-flight requests finish.
///
/// # Arguments
/// * `port` - Port to listen on.
/// * `state` - Aggregator and token registry shared by all requests.
/// * `shutdown_signal` - Cancel to stop accepting connections.
pub async fn serve<S: BalanceSource>(
    port: u16,
    state: AppState<S>,
    shutdown_signal: CancellationToken,
) -> crate::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| crate::Error::PortBindingFailed(port, e))?;
    info!(port, "listening for balance requests");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown_signal.cancelled().await })
        .await
        .map_err(crate::Error::ServerCrashed)?;

    info!("server stopped");
    Ok(())
}

async fn balances<S: BalanceSource>(
    State(state): State<AppState<S>>,
    Path(address): Path<String>,
) -> crate::Result<Json<BTreeMap<String, f64>>> {
    if let Err(e) = state.registry.ensure_loaded().await {
        warn!("token list bootstrap failed: {e}");
    }
    let tokens = state.registry.load_descriptors();

    // A panic inside the aggregation surfaces as a 500 instead of a dropped connection
    let aggregator = Arc::clone(&state.aggregator);
    let snapshot =
        tokio::spawn(async move { aggregator.aggregate(&address, &tokens).await }).await?;

    Ok(Json(snapshot.balances))
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use alloy::primitives::{Address, U256};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tally_utils::{
        config::Config, disk_storage::DiskStorageInterface, token_list::TokenList,
        AggregatorOptions, BalanceSnapshot, SnapshotSink, TokenContract, TokenDescriptor,
    };
    use tower::ServiceExt;

    use super::*;

    const OWNER: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    /// 1.5 of the native asset, 2.0 of every token.
    struct StaticSource;

    #[derive(Clone)]
    struct StaticContract;

    impl BalanceSource for StaticSource {
        type Contract = StaticContract;

        async fn native_balance(&self, _owner: Address) -> tally_utils::Result<U256> {
            Ok(U256::from(1_500_000_000_000_000_000u128))
        }

        fn contract(&self, _address: Address) -> StaticContract {
            StaticContract
        }
    }

    impl TokenContract for StaticContract {
        async fn decimals(&self) -> tally_utils::Result<u8> {
            Ok(6)
        }

        async fn balance_of(&self, _owner: Address) -> tally_utils::Result<U256> {
            Ok(U256::from(2_000_000u64))
        }
    }

    /// Fails hard on the native balance query.
    struct PanickingSource;

    impl BalanceSource for PanickingSource {
        type Contract = StaticContract;

        async fn native_balance(&self, _owner: Address) -> tally_utils::Result<U256> {
            panic!("rpc client poisoned")
        }

        fn contract(&self, _address: Address) -> StaticContract {
            StaticContract
        }
    }

    struct NullSink;

    impl SnapshotSink for NullSink {
        fn persist(&self, _snapshot: &BalanceSnapshot) {}
    }

    fn temp_path(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("tally-server-test-{}-{n}", std::process::id()))
            .join(name)
    }

    fn app_with<S: BalanceSource>(source: S, token_list_path: PathBuf) -> Router {
        let config = Config {
            token_list_path,
            registry_url: "http://127.0.0.1:9/coins/list".to_string(),
            ..Default::default()
        };
        let aggregator = Aggregator::new(
            source,
            Arc::new(NullSink),
            AggregatorOptions::from(&config),
        );
        router(AppState::new(aggregator, TokenRegistry::new(&config)))
    }

    fn app(token_list_path: PathBuf) -> Router {
        app_with(StaticSource, token_list_path)
    }

    fn app_with_usdc() -> Router {
        let path = temp_path("tokens.json");
        TokenList(vec![TokenDescriptor {
            name: "USDC".to_string(),
            symbol: "usdc".to_string(),
            contract_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
        }])
        .save_to(&path)
        .unwrap();
        app(path)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_balances() {
        let (status, body) = get(app_with_usdc(), &format!("/balances/{OWNER}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ETH": 1.5, "USDC": 2.0 }));
    }

    #[tokio::test]
    async fn test_malformed_address_gives_empty_object() {
        let (status, body) = get(app_with_usdc(), "/balances/not-an-address").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_failed_bootstrap_still_reports_native() {
        let app = app(temp_path("tokens.json"));
        let (status, body) = get(app, &format!("/balances/{OWNER}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ETH": 1.5 }));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get(app_with_usdc(), "/balance").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_panicking_aggregation_is_500() {
        let path = temp_path("tokens.json");
        TokenList(vec![]).save_to(&path).unwrap();
        let app = app_with(PanickingSource, path);

        let (status, body) = get(app, &format!("/balances/{OWNER}")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Aggregation task did not complete"));
    }
}
