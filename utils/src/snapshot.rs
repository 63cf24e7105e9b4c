use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use crate::disk_storage::{DiskStorageInterface, FileFormat};

/// Balances of one account at the time an aggregation completed.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub balances: BTreeMap<String, f64>,
}

impl BalanceSnapshot {
    pub fn new(balances: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            balances,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }
}

/// On-disk form of the most recent snapshot.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct LatestBalance {
    pub time: String,
    pub balance: BTreeMap<String, f64>,
}

impl From<&BalanceSnapshot> for LatestBalance {
    fn from(snapshot: &BalanceSnapshot) -> Self {
        Self {
            time: snapshot
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            balance: snapshot.balances.clone(),
        }
    }
}

impl DiskStorageInterface for LatestBalance {
    const FILE_NAME: &'static str = "latest_balance";
    const FORMAT: FileFormat = FileFormat::JSON;
}

/// Receives every completed snapshot. Must not block and must not fail
/// the aggregation.
pub trait SnapshotSink: Send + Sync + 'static {
    fn persist(&self, snapshot: &BalanceSnapshot);
}

/// Hands snapshots to a background task that overwrites the latest-snapshot file.
pub struct SnapshotWriter {
    tx: UnboundedSender<BalanceSnapshot>,
}

impl SnapshotWriter {
    /// Spawns the writer task. The task ends once every `SnapshotWriter` is
    /// dropped and the queued snapshots are written.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = unbounded_channel::<BalanceSnapshot>();

        let handle = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                // Only the newest queued snapshot matters, older ones would be overwritten
                while let Ok(newer) = rx.try_recv() {
                    latest = newer;
                }

                let file = LatestBalance::from(&latest);
                let target = path.clone();
                match tokio::task::spawn_blocking(move || file.save_to(&target)).await {
                    Ok(Ok(())) => debug!(path = %path.display(), "latest snapshot written"),
                    Ok(Err(e)) => error!("failed writing latest snapshot: {e}"),
                    Err(e) => error!("snapshot write task failed: {e}"),
                }
            }
        });

        (Self { tx }, handle)
    }
}

impl SnapshotSink for SnapshotWriter {
    fn persist(&self, snapshot: &BalanceSnapshot) {
        if self.tx.send(snapshot.clone()).is_err() {
            warn!("snapshot writer is gone, latest snapshot not persisted");
        }
    }
}
