use super::{snapshot, BackupError, BackupPayload, BackupTransport};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Cheap, cloneable sender side of the backup outbox.
///
/// The queue holds at most one pending request. A request arriving while one
/// is already queued is folded into it, since the queued snapshot is only
/// read when the writer gets to it.
#[derive(Clone)]
pub struct BackupHandle {
    tx: Option<mpsc::Sender<&'static str>>,
}

impl BackupHandle {
    /// A handle that drops every request (no backup endpoint configured).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Ask for a backup after a local write. Never waits.
    pub fn request(&self, reason: &'static str) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(reason) {
            Ok(()) => debug!("Queued cloud backup ({})", reason),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Cloud backup already queued, folding in {}", reason)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Backup writer is gone, dropping backup request ({})", reason)
            }
        }
    }
}

/// Single writer that turns backup requests into pushes, in order.
pub struct BackupOutbox;

impl BackupOutbox {
    pub fn spawn(
        db: DatabaseConnection,
        transport: Arc<dyn BackupTransport>,
        policy: RetryPolicy,
    ) -> (BackupHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<&'static str>(1);

        let writer = tokio::spawn(async move {
            info!("Cloud backup writer started.");
            while let Some(reason) = rx.recv().await {
                if let Err(e) = push_with_retry(&db, transport.as_ref(), policy).await {
                    // Local SQLite still has the data; the next successful push carries it.
                    error!("Cloud backup ({}) dropped: {}", reason, e);
                }
            }
            info!("Cloud backup writer stopped.");
        });

        (BackupHandle { tx: Some(tx) }, writer)
    }

    /// Requests a backup on a fixed interval in addition to write-triggered ones.
    pub fn start_periodic_runner(handle: BackupHandle, every: Duration) {
        if !handle.is_enabled() {
            return;
        }
        tokio::spawn(async move {
            info!("Periodic cloud backup runner started.");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                handle.request("periodic");
            }
        });
    }
}

/// Snapshot the tables and push them, retrying with a fixed backoff.
pub async fn push_with_retry(
    db: &DatabaseConnection,
    transport: &dyn BackupTransport,
    policy: RetryPolicy,
) -> Result<(), BackupError> {
    let payload = BackupPayload::new(snapshot::collect(db).await?);
    let attempts = policy.attempts.max(1);

    let mut attempt = 1;
    loop {
        match transport.push(&payload).await {
            Ok(()) => {
                info!(
                    "Database backed up to cloud storage ({} attributions, {} staff invites)",
                    payload.discord_data.invite_tracking.len(),
                    payload.discord_data.staff_invites.len()
                );
                return Ok(());
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Cloud backup attempt {}/{} failed: {}",
                    attempt, attempts, e
                );
                sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::services::backup::testing::MemoryTransport;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let db = test_connection().await;
        let transport = MemoryTransport::failing(2);

        push_with_retry(&db, &transport, fast()).await.unwrap();

        assert_eq!(transport.push_count(), 3);
        assert!(transport.stored.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let db = test_connection().await;
        let transport = MemoryTransport::failing(10);

        let err = push_with_retry(&db, &transport, fast()).await.unwrap_err();

        assert!(matches!(err, BackupError::Status(503)));
        assert_eq!(transport.push_count(), 3);
        assert!(transport.stored.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_drains_requests_then_stops() {
        let db = test_connection().await;
        let transport = Arc::new(MemoryTransport::default());

        let (handle, writer) = BackupOutbox::spawn(db, transport.clone(), fast());
        handle.request("join");
        handle.request("leave");
        drop(handle);
        writer.await.unwrap();

        let pushes = transport.push_count();
        assert!((1..=2).contains(&pushes), "unexpected push count {pushes}");
    }

    #[test]
    fn test_disabled_handle_ignores_requests() {
        let handle = BackupHandle::disabled();
        assert!(!handle.is_enabled());
        handle.request("join");
    }
}
