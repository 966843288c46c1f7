use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::CleanupHost;
use crate::settings::{Cleanup, NotificationKind, Settings, Storage};
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Repos {
    grant_repo: Arc<dyn GrantRepo>,
    device_code_repo: Arc<dyn DeviceCodeRepo>,
    pool: Option<MySqlPool>,
}

async fn open_repos(storage: &Storage) -> anyhow::Result<Repos> {
    match storage.backend.as_str() {
        "memory" => Ok(Repos {
            grant_repo: Arc::new(MemoryGrantRepo::new()),
            device_code_repo: Arc::new(MemoryDeviceCodeRepo::new()),
            pool: None,
        }),
        "mysql" => {
            let dsn = storage
                .dsn
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("storage.dsn is required for the mysql backend"))?;
            let pool = MySqlPool::connect(dsn).await?;
            if storage.sync_schema {
                MySqlSchema::sync(&pool).await?;
            }
            Ok(Repos {
                grant_repo: Arc::new(MySqlGrantRepo::new(pool.clone())),
                device_code_repo: Arc::new(MySqlDeviceCodeRepo::new(pool.clone())),
                pool: Some(pool),
            })
        }
        other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
    }
}

fn notification_sink(kind: NotificationKind) -> Arc<dyn OperationalStoreNotification> {
    match kind {
        NotificationKind::None => Arc::new(NoopNotification),
        NotificationKind::Log => Arc::new(LoggingNotification),
    }
}

/// Owns the stores handed to request handlers and the background cleanup task.
pub struct Server {
    pub grant_store: Arc<dyn GrantStore>,
    pub device_flow_store: Arc<dyn DeviceFlowStore>,
    pub token_cleanup: Arc<TokenCleanup>,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let repos = open_repos(&settings.storage).await?;

        let grant_store: Arc<dyn GrantStore> = Arc::new(RealGrantStore::new(
            repos.grant_repo.clone(),
            settings.storage.failure_policy,
        ));
        let device_flow_store: Arc<dyn DeviceFlowStore> =
            Arc::new(RealDeviceFlowStore::new(repos.device_code_repo.clone()));

        let token_cleanup = Arc::new(TokenCleanup::new(
            repos.grant_repo,
            repos.device_code_repo,
            notification_sink(settings.cleanup.notification),
            settings.cleanup.options(),
        )?);

        info!(
            backend = %settings.storage.backend,
            failure_policy = %settings.storage.failure_policy,
            "stores ready"
        );

        Ok(Self {
            grant_store,
            device_flow_store,
            token_cleanup,
            cleanup_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
            pool: repos.pool,
        })
    }

    /// Spawns the recurring cleanup unless it is disabled in settings.
    pub fn start_cleanup(&self, cleanup: &Cleanup) {
        if !cleanup.enabled {
            info!("token cleanup disabled");
            return;
        }

        let host = CleanupHost::new(
            self.token_cleanup.clone(),
            cleanup.interval(),
            self.cancel.clone(),
        );
        let handle = tokio::spawn(async move {
            if let Err(e) = host.run().await {
                error!("token cleanup host error: {:#}", e);
            }
        });

        if let Ok(mut lock) = self.cleanup_handle.lock() {
            *lock = Some(handle);
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self
            .cleanup_handle
            .lock()
            .ok()
            .and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("cleanup handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
