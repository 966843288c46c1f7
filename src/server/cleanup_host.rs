use crate::application_impl::{CleanupReport, SweepOutcome, TokenCleanup};
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drives [`TokenCleanup`] on a fixed interval. Sweeps run one after another
/// on a single task; ticks missed while a sweep is still running are skipped.
pub struct CleanupHost {
    cleanup: Arc<TokenCleanup>,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl CleanupHost {
    pub fn new(
        cleanup: Arc<TokenCleanup>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            cleanup,
            interval,
            cancellation_token,
        }
    }

    fn log_report(report: &CleanupReport) {
        for sweep in [&report.grants, &report.device_codes] {
            match &sweep.outcome {
                SweepOutcome::Failed(e) => warn!(
                    kind = %sweep.kind,
                    removed = sweep.removed,
                    error = %e,
                    "sweep failed, retrying next tick"
                ),
                SweepOutcome::BatchLimitReached => warn!(
                    kind = %sweep.kind,
                    removed = sweep.removed,
                    "sweep stopped at batch limit"
                ),
                SweepOutcome::Exhausted if sweep.removed > 0 => info!(
                    kind = %sweep.kind,
                    removed = sweep.removed,
                    batches = sweep.batches,
                    "sweep finished"
                ),
                SweepOutcome::Exhausted => {}
            }
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.cleanup.batch_size(),
            "token cleanup started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("Token cleanup shutting down...");
                    break;
                }
                _ = ticker.tick() => {}
            }

            // not raced against cancellation: a deleted batch always reaches the sink
            let report = self.cleanup.remove_expired().await;
            Self::log_report(&report);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::TokenCleanupOptions;
    use crate::domain_model::*;
    use crate::domain_port::*;
    use crate::infra_memory::{MemoryDeviceCodeRepo, MemoryGrantRepo};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Takes a while to accept each batch.
    #[derive(Default)]
    struct SlowNotification {
        started: AtomicU32,
        finished: AtomicU32,
    }

    #[async_trait::async_trait]
    impl OperationalStoreNotification for SlowNotification {
        async fn grants_removed(&self, _grants: &[Grant]) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn device_codes_removed(&self, _codes: &[DeviceFlowCode]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn expired_grant(key: &str) -> Grant {
        let now = Utc::now();
        Grant {
            key: key.into(),
            grant_type: grant_types::REFRESH_TOKEN.to_owned(),
            subject_id: None,
            session_id: None,
            client_id: "c1".to_owned(),
            description: None,
            creation_time: now - ChronoDuration::hours(2),
            expiration: Some(now - ChronoDuration::hours(1)),
            consumed_time: None,
            data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn sweeps_on_first_tick_and_stops_on_cancel() {
        let grants = Arc::new(MemoryGrantRepo::new());
        for i in 0..5 {
            grants.insert(&expired_grant(&format!("g{i}"))).await.unwrap();
        }
        let cleanup = TokenCleanup::new(
            grants.clone(),
            Arc::new(MemoryDeviceCodeRepo::new()),
            Arc::new(NoopNotification),
            TokenCleanupOptions {
                batch_size: 2,
                max_batches_per_sweep: 10,
            },
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let host = CleanupHost::new(
            Arc::new(cleanup),
            Duration::from_secs(3600),
            cancel.clone(),
        );
        let handle = tokio::spawn(async move { host.run().await });

        // the first tick fires immediately
        for _ in 0..200 {
            if grants.len().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(grants.len().await, 0);

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("host did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn cancel_during_sweep_still_notifies_deleted_batch() {
        let grants = Arc::new(MemoryGrantRepo::new());
        for i in 0..3 {
            grants.insert(&expired_grant(&format!("g{i}"))).await.unwrap();
        }
        let notification = Arc::new(SlowNotification::default());
        let cleanup = TokenCleanup::new(
            grants.clone(),
            Arc::new(MemoryDeviceCodeRepo::new()),
            notification.clone(),
            TokenCleanupOptions {
                batch_size: 10,
                max_batches_per_sweep: 10,
            },
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let host = CleanupHost::new(
            Arc::new(cleanup),
            Duration::from_secs(3600),
            cancel.clone(),
        );
        let handle = tokio::spawn(async move { host.run().await });

        // wait until the batch is deleted and the sink is busy with it
        for _ in 0..200 {
            if notification.started.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(notification.started.load(Ordering::SeqCst), 1);
        assert_eq!(grants.len().await, 0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("host did not stop")
            .unwrap()
            .unwrap();

        assert_eq!(notification.finished.load(Ordering::SeqCst), 1);
    }
}
