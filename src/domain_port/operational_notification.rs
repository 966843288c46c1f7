use crate::domain_model::*;

/// Observer told about every batch the token cleanup has deleted.
/// Errors are logged by the caller and never undo the deletion.
///
/// The batch is every record the sweep selected and then deleted. When several
/// instances sweep one database, some of those rows may already have been
/// deleted by another instance, which may report them too.
#[async_trait::async_trait]
pub trait OperationalStoreNotification: Send + Sync {
    async fn grants_removed(&self, grants: &[Grant]) -> anyhow::Result<()>;
    async fn device_codes_removed(&self, codes: &[DeviceFlowCode]) -> anyhow::Result<()>;
}

pub struct NoopNotification;

#[async_trait::async_trait]
impl OperationalStoreNotification for NoopNotification {
    async fn grants_removed(&self, _grants: &[Grant]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn device_codes_removed(&self, _codes: &[DeviceFlowCode]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs each removed batch at info level.
pub struct LoggingNotification;

#[async_trait::async_trait]
impl OperationalStoreNotification for LoggingNotification {
    async fn grants_removed(&self, grants: &[Grant]) -> anyhow::Result<()> {
        for grant in grants {
            tracing::info!(
                key = %grant.key,
                grant_type = %grant.grant_type,
                client_id = %grant.client_id,
                "expired grant removed"
            );
        }
        Ok(())
    }

    async fn device_codes_removed(&self, codes: &[DeviceFlowCode]) -> anyhow::Result<()> {
        for code in codes {
            tracing::info!(
                user_code = %code.user_code,
                client_id = %code.client_id,
                "expired device code removed"
            );
        }
        Ok(())
    }
}
