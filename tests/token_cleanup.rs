use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::domain_model::*;
use cadence::domain_port::*;
use cadence::infra_memory::*;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

/// Records every batch it is told about.
#[derive(Default)]
struct RecordingNotification {
    grant_batches: Mutex<Vec<Vec<GrantKey>>>,
    device_batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait::async_trait]
impl OperationalStoreNotification for RecordingNotification {
    async fn grants_removed(&self, grants: &[Grant]) -> anyhow::Result<()> {
        let keys = grants.iter().map(|g| g.key.clone()).collect();
        self.grant_batches.lock().unwrap().push(keys);
        Ok(())
    }

    async fn device_codes_removed(&self, codes: &[DeviceFlowCode]) -> anyhow::Result<()> {
        let user_codes = codes.iter().map(|c| c.user_code.clone()).collect();
        self.device_batches.lock().unwrap().push(user_codes);
        Ok(())
    }
}

fn grant(key: &str, expires_in: Option<Duration>) -> Grant {
    let now = Utc::now();
    Grant {
        key: key.into(),
        grant_type: grant_types::REFERENCE_TOKEN.to_owned(),
        subject_id: Some("sub1".to_owned()),
        session_id: None,
        client_id: "c1".to_owned(),
        description: None,
        creation_time: now - Duration::days(1),
        expiration: expires_in.map(|d| now + d),
        consumed_time: None,
        data: Vec::new(),
    }
}

fn authorization(lifetime: Duration) -> DeviceAuthorization {
    DeviceAuthorization {
        client_id: "device_flow".to_owned(),
        subject_id: None,
        session_id: None,
        description: None,
        creation_time: Utc::now() - Duration::hours(1),
        lifetime,
        data: Vec::new(),
    }
}

#[tokio::test]
async fn sweeps_expired_records_written_through_the_stores() {
    let grant_repo = Arc::new(MemoryGrantRepo::new());
    let device_repo = Arc::new(MemoryDeviceCodeRepo::new());
    let grants = RealGrantStore::new(grant_repo.clone(), StoreFailurePolicy::Propagate);
    let devices = RealDeviceFlowStore::new(device_repo.clone());

    for i in 0..25 {
        grants
            .store(&grant(&format!("expired{i:02}"), Some(-Duration::minutes(5))))
            .await
            .unwrap();
    }
    for i in 0..5 {
        grants
            .store(&grant(&format!("live{i}"), Some(Duration::minutes(5))))
            .await
            .unwrap();
    }
    grants.store(&grant("forever", None)).await.unwrap();

    // one expired code, one still valid
    devices
        .store_device_authorization("dev-old", "user-old", authorization(Duration::minutes(10)))
        .await
        .unwrap();
    devices
        .store_device_authorization("dev-new", "user-new", authorization(Duration::hours(2)))
        .await
        .unwrap();

    let notification = Arc::new(RecordingNotification::default());
    let cleanup = TokenCleanup::new(
        grant_repo.clone(),
        device_repo.clone(),
        notification.clone(),
        TokenCleanupOptions {
            batch_size: 10,
            max_batches_per_sweep: 100,
        },
    )
    .unwrap();

    let report = cleanup.remove_expired().await;

    assert_eq!(report.grants.removed, 25);
    assert_eq!(report.grants.batches, 3);
    assert_eq!(report.grants.outcome, SweepOutcome::Exhausted);
    assert_eq!(report.device_codes.removed, 1);
    assert_eq!(report.device_codes.outcome, SweepOutcome::Exhausted);

    let sizes: Vec<usize> = notification
        .grant_batches
        .lock()
        .unwrap()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(
        *notification.device_batches.lock().unwrap(),
        vec![vec!["user-old".to_owned()]]
    );

    assert_eq!(grant_repo.len().await, 6);
    assert!(grants.get(&"forever".into()).await.unwrap().is_some());
    assert!(devices.find_by_device_code("dev-old").await.unwrap().is_none());
    assert!(devices.find_by_device_code("dev-new").await.unwrap().is_some());

    // a second sweep finds nothing and does not notify
    let report = cleanup.remove_expired().await;
    assert_eq!(report.grants.removed, 0);
    assert_eq!(report.grants.batches, 0);
    assert_eq!(notification.grant_batches.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn report_serializes_for_the_once_mode() {
    let cleanup = TokenCleanup::new(
        Arc::new(MemoryGrantRepo::new()),
        Arc::new(MemoryDeviceCodeRepo::new()),
        Arc::new(NoopNotification),
        TokenCleanupOptions::default(),
    )
    .unwrap();

    let report = cleanup.remove_expired().await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["grants"]["kind"], "grants");
    assert_eq!(json["grants"]["outcome"]["status"], "exhausted");
    assert_eq!(json["device_codes"]["removed"], 0);
}
