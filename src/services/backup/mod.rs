//! Cloud backup of the local SQLite tables.
//!
//! Every mutating operation calls [`BackupHandle::request`]. Requests are
//! drained by a single writer task ([`outbox`]) which snapshots the tables at
//! the moment it runs and pushes them through a [`BackupTransport`]. Restore
//! is the mirror operation and always replaces local rows wholesale.

pub mod outbox;
pub mod snapshot;
pub mod transport;

pub use outbox::{BackupHandle, BackupOutbox, RetryPolicy};
pub use snapshot::{BackupPayload, RestoreSummary};
pub use transport::{BackupTransport, HttpTransport};

use sea_orm::DatabaseConnection;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("backup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backup endpoint returned status {0}")]
    Status(u16),
    #[error("unsupported snapshot schema version {found} (this build understands up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("malformed snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetch the remote snapshot and replace every local backup table with it.
///
/// Returns `Ok(None)` when the remote store has nothing to restore. Rows
/// written locally since the last successful push are discarded.
pub async fn restore_from_cloud(
    db: &DatabaseConnection,
    transport: &dyn BackupTransport,
) -> Result<Option<RestoreSummary>, BackupError> {
    let Some(payload) = transport.fetch().await? else {
        warn!("No cloud backup available to restore");
        return Ok(None);
    };

    payload.ensure_supported()?;

    let summary = snapshot::restore(db, &payload.discord_data).await?;
    info!("Database restored from cloud backup: {}", summary);
    Ok(Some(summary))
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory backup endpoint. Fails the first `failures` pushes.
    #[derive(Default)]
    pub struct MemoryTransport {
        pub stored: Mutex<Option<String>>,
        pub pushes: AtomicUsize,
        pub failures: AtomicUsize,
    }

    impl MemoryTransport {
        pub fn failing(times: usize) -> Self {
            Self {
                failures: AtomicUsize::new(times),
                ..Default::default()
            }
        }

        pub fn with_raw(raw: &str) -> Self {
            Self {
                stored: Mutex::new(Some(raw.to_string())),
                ..Default::default()
            }
        }

        pub fn push_count(&self) -> usize {
            self.pushes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackupTransport for MemoryTransport {
        async fn push(&self, payload: &BackupPayload) -> Result<(), BackupError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(BackupError::Status(503));
            }
            // Store the encoded form so restores go through the same decoding as HTTP.
            let raw = serde_json::to_string(payload)?;
            *self.stored.lock().unwrap() = Some(raw);
            Ok(())
        }

        async fn fetch(&self) -> Result<Option<BackupPayload>, BackupError> {
            let raw = self.stored.lock().unwrap().clone();
            match raw {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            }
        }
    }
}
