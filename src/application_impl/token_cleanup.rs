use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("token cleanup batch size must be at least 1, got {0}")]
    InvalidBatchSize(i64),
    #[error("token cleanup batch limit must be at least 1, got {0}")]
    InvalidBatchLimit(i64),
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenCleanupOptions {
    pub batch_size: i64,
    /// Upper bound on batches per sweep, in case expired rows keep appearing.
    pub max_batches_per_sweep: i64,
}

impl Default for TokenCleanupOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_batches_per_sweep: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Grants,
    DeviceCodes,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Grants => "grants",
            RecordKind::DeviceCodes => "device_codes",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// No expired records were left when the sweep ended.
    Exhausted,
    BatchLimitReached,
    Failed(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SweepReport {
    pub kind: RecordKind,
    pub removed: u64,
    pub batches: u32,
    pub outcome: SweepOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub grants: SweepReport,
    pub device_codes: SweepReport,
}

#[async_trait::async_trait]
trait ExpiringRecords: Send + Sync {
    type Record: Send + Sync;

    fn kind(&self) -> RecordKind;
    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Self::Record>, RepoError>;
    async fn delete(&self, batch: &[Self::Record]) -> Result<u64, RepoError>;
    async fn notify(&self, batch: &[Self::Record]) -> anyhow::Result<()>;
}

struct ExpiredGrants<'a> {
    repo: &'a dyn GrantRepo,
    notification: &'a dyn OperationalStoreNotification,
}

#[async_trait::async_trait]
impl<'a> ExpiringRecords for ExpiredGrants<'a> {
    type Record = Grant;

    fn kind(&self) -> RecordKind {
        RecordKind::Grants
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Grant>, RepoError> {
        self.repo.find_expired(now, limit).await
    }

    async fn delete(&self, batch: &[Grant]) -> Result<u64, RepoError> {
        let keys: Vec<GrantKey> = batch.iter().map(|g| g.key.clone()).collect();
        self.repo.delete_batch(&keys).await
    }

    async fn notify(&self, batch: &[Grant]) -> anyhow::Result<()> {
        self.notification.grants_removed(batch).await
    }
}

struct ExpiredDeviceCodes<'a> {
    repo: &'a dyn DeviceCodeRepo,
    notification: &'a dyn OperationalStoreNotification,
}

#[async_trait::async_trait]
impl<'a> ExpiringRecords for ExpiredDeviceCodes<'a> {
    type Record = DeviceFlowCode;

    fn kind(&self) -> RecordKind {
        RecordKind::DeviceCodes
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeviceFlowCode>, RepoError> {
        self.repo.find_expired(now, limit).await
    }

    async fn delete(&self, batch: &[DeviceFlowCode]) -> Result<u64, RepoError> {
        let user_codes: Vec<String> = batch.iter().map(|c| c.user_code.clone()).collect();
        self.repo.delete_batch(&user_codes).await
    }

    async fn notify(&self, batch: &[DeviceFlowCode]) -> anyhow::Result<()> {
        self.notification.device_codes_removed(batch).await
    }
}

/// Removes expired grants and device codes in bounded batches.
///
/// One call to [`TokenCleanup::remove_expired_grants`] (or the device code
/// variant) is a sweep: it repeatedly selects up to `batch_size` expired
/// records in primary key order, deletes exactly that batch, tells the
/// notification sink, and stops once a batch comes back short. Callers must not
/// run two sweeps of the same kind at once.
pub struct TokenCleanup {
    grant_repo: Arc<dyn GrantRepo>,
    device_code_repo: Arc<dyn DeviceCodeRepo>,
    notification: Arc<dyn OperationalStoreNotification>,
    batch_size: u32,
    max_batches: u32,
}

impl TokenCleanup {
    pub fn new(
        grant_repo: Arc<dyn GrantRepo>,
        device_code_repo: Arc<dyn DeviceCodeRepo>,
        notification: Arc<dyn OperationalStoreNotification>,
        options: TokenCleanupOptions,
    ) -> Result<Self, CleanupError> {
        let batch_size = u32::try_from(options.batch_size)
            .ok()
            .filter(|b| *b >= 1)
            .ok_or(CleanupError::InvalidBatchSize(options.batch_size))?;
        let max_batches = u32::try_from(options.max_batches_per_sweep)
            .ok()
            .filter(|b| *b >= 1)
            .ok_or(CleanupError::InvalidBatchLimit(options.max_batches_per_sweep))?;

        Ok(Self {
            grant_repo,
            device_code_repo,
            notification,
            batch_size,
            max_batches,
        })
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Sweeps both record kinds concurrently. A failure in one kind does not
    /// stop the other.
    pub async fn remove_expired(&self) -> CleanupReport {
        trace!("querying for expired grants and device codes");
        let (grants, device_codes) = tokio::join!(
            self.remove_expired_grants(),
            self.remove_expired_device_codes()
        );
        CleanupReport {
            grants,
            device_codes,
        }
    }

    pub async fn remove_expired_grants(&self) -> SweepReport {
        let source = ExpiredGrants {
            repo: self.grant_repo.as_ref(),
            notification: self.notification.as_ref(),
        };
        self.sweep(&source).await
    }

    pub async fn remove_expired_device_codes(&self) -> SweepReport {
        let source = ExpiredDeviceCodes {
            repo: self.device_code_repo.as_ref(),
            notification: self.notification.as_ref(),
        };
        self.sweep(&source).await
    }

    async fn sweep<S: ExpiringRecords>(&self, source: &S) -> SweepReport {
        let kind = source.kind();
        let run_id = nanoid!(8);
        let span = info_span!("token_cleanup", %kind, run = %run_id);
        self.sweep_batches(source).instrument(span).await
    }

    /// A full last batch may have taken the final expired records, so the
    /// limit only counts as reached when something expired is still left.
    async fn limit_outcome<S: ExpiringRecords>(&self, source: &S) -> SweepOutcome {
        match source.find_expired(Utc::now(), 1).await {
            Ok(rest) if rest.is_empty() => SweepOutcome::Exhausted,
            Ok(_) => {
                warn!(batches = self.max_batches, "batch limit reached, ending sweep early");
                SweepOutcome::BatchLimitReached
            }
            Err(e) => {
                error!(error = %e, "failed to query expired records");
                SweepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn sweep_batches<S: ExpiringRecords>(&self, source: &S) -> SweepReport {
        let mut report = SweepReport {
            kind: source.kind(),
            removed: 0,
            batches: 0,
            outcome: SweepOutcome::Exhausted,
        };

        loop {
            if report.batches >= self.max_batches {
                report.outcome = self.limit_outcome(source).await;
                break;
            }

            let batch = match source.find_expired(Utc::now(), self.batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "failed to query expired records");
                    report.outcome = SweepOutcome::Failed(e.to_string());
                    break;
                }
            };

            let found = batch.len();
            info!(found, "removing expired records");
            if found == 0 {
                break;
            }

            match source.delete(&batch).await {
                Ok(removed) => report.removed += removed,
                Err(e) => {
                    error!(error = %e, found, "failed to delete expired records");
                    report.outcome = SweepOutcome::Failed(e.to_string());
                    break;
                }
            }
            report.batches += 1;

            // the batch is committed; a sink failure must not undo or repeat it
            if let Err(e) = source.notify(&batch).await {
                warn!(error = %e, found, "removal notification failed");
            }

            if found < self.batch_size as usize {
                break;
            }
        }

        debug!(
            removed = report.removed,
            batches = report.batches,
            outcome = ?report.outcome,
            "sweep finished"
        );
        report
    }
}
