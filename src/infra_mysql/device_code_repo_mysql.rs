use super::util::is_dup_key;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const CODE_COLUMNS: &str = "user_code, device_code, client_id, subject_id, session_id, \
     description, creation_time, expiration, data";

pub struct MySqlDeviceCodeRepo {
    pool: MySqlPool,
}

impl MySqlDeviceCodeRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlDeviceCodeRepo { pool }
    }

    fn row_to_code(row: MySqlRow) -> Result<DeviceFlowCode, RepoError> {
        Ok(DeviceFlowCode {
            user_code: row.try_get("user_code")?,
            device_code: row.try_get("device_code")?,
            client_id: row.try_get("client_id")?,
            subject_id: row.try_get("subject_id")?,
            session_id: row.try_get("session_id")?,
            description: row.try_get("description")?,
            creation_time: row.try_get("creation_time")?,
            expiration: row.try_get("expiration")?,
            data: row.try_get("data")?,
        })
    }

    async fn find_by(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError> {
        let row_opt = sqlx::query(&format!(
            "SELECT {CODE_COLUMNS} FROM device_flow_codes WHERE {column} = ?"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row_opt.map(Self::row_to_code).transpose()
    }
}

#[async_trait::async_trait]
impl DeviceCodeRepo for MySqlDeviceCodeRepo {
    async fn insert(&self, code: &DeviceFlowCode) -> Result<(), RepoError> {
        let res = sqlx::query(&format!(
            "INSERT INTO device_flow_codes ({CODE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&code.user_code)
        .bind(&code.device_code)
        .bind(&code.client_id)
        .bind(&code.subject_id)
        .bind(&code.session_id)
        .bind(&code.description)
        .bind(code.creation_time)
        .bind(code.expiration)
        .bind(&code.data)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            // primary key on user_code, unique index on device_code
            Err(e) if is_dup_key(&e) => Err(RepoError::Duplicate(format!(
                "device_code {} / user_code {}",
                code.device_code, code.user_code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_user_code(
        &self,
        user_code: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError> {
        self.find_by("user_code", user_code).await
    }

    async fn find_by_device_code(
        &self,
        device_code: &str,
    ) -> Result<Option<DeviceFlowCode>, RepoError> {
        self.find_by("device_code", device_code).await
    }

    async fn update(&self, code: &DeviceFlowCode) -> Result<u64, RepoError> {
        let res = sqlx::query(
            r#"
UPDATE device_flow_codes
SET device_code = ?, client_id = ?, subject_id = ?, session_id = ?, description = ?,
    creation_time = ?, expiration = ?, data = ?
WHERE user_code = ?
"#,
        )
        .bind(&code.device_code)
        .bind(&code.client_id)
        .bind(&code.subject_id)
        .bind(&code.session_id)
        .bind(&code.description)
        .bind(code.creation_time)
        .bind(code.expiration)
        .bind(&code.data)
        .bind(&code.user_code)
        .execute(&self.pool)
        .await;

        match res {
            Ok(res) => Ok(res.rows_affected()),
            Err(e) if is_dup_key(&e) => {
                Err(RepoError::Duplicate(format!("device_code {}", code.device_code)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_by_device_code(&self, device_code: &str) -> Result<u64, RepoError> {
        let res = sqlx::query("DELETE FROM device_flow_codes WHERE device_code = ?")
            .bind(device_code)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeviceFlowCode>, RepoError> {
        let rows = sqlx::query(&format!(
            r#"
SELECT {CODE_COLUMNS}
FROM device_flow_codes
WHERE expiration < ?
ORDER BY user_code ASC
LIMIT ?
"#
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_code).collect()
    }

    async fn delete_batch(&self, user_codes: &[String]) -> Result<u64, RepoError> {
        if user_codes.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new("DELETE FROM device_flow_codes WHERE user_code IN (");
        let mut separated = qb.separated(", ");
        for user_code in user_codes {
            separated.push_bind(user_code);
        }
        separated.push_unseparated(")");

        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }
}
