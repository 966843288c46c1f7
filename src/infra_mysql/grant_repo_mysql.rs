use super::util::{is_dup_key, push_predicates};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const GRANT_COLUMNS: &str = "`key`, `type`, subject_id, session_id, client_id, description, \
     creation_time, expiration, consumed_time, data";

pub struct MySqlGrantRepo {
    pool: MySqlPool,
}

impl MySqlGrantRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlGrantRepo { pool }
    }

    fn row_to_grant(row: MySqlRow) -> Result<Grant, RepoError> {
        Ok(Grant {
            key: GrantKey(row.try_get("key")?),
            grant_type: row.try_get("type")?,
            subject_id: row.try_get("subject_id")?,
            session_id: row.try_get("session_id")?,
            client_id: row.try_get("client_id")?,
            description: row.try_get("description")?,
            creation_time: row.try_get("creation_time")?,
            expiration: row.try_get("expiration")?,
            consumed_time: row.try_get("consumed_time")?,
            data: row.try_get("data")?,
        })
    }

    fn filtered<'a>(head: &str, filter: &'a GrantFilter) -> QueryBuilder<'a, MySql> {
        let mut qb = QueryBuilder::new(head);
        push_predicates(&mut qb, &filter.predicates());
        qb
    }
}

#[async_trait::async_trait]
impl GrantRepo for MySqlGrantRepo {
    async fn find(&self, key: &GrantKey) -> Result<Option<Grant>, RepoError> {
        let row_opt = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM persisted_grants WHERE `key` = ?"
        ))
        .bind(&key.0)
        .fetch_optional(&self.pool)
        .await?;

        row_opt.map(Self::row_to_grant).transpose()
    }

    async fn insert(&self, grant: &Grant) -> Result<(), RepoError> {
        let res = sqlx::query(&format!(
            "INSERT INTO persisted_grants ({GRANT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&grant.key.0)
        .bind(&grant.grant_type)
        .bind(&grant.subject_id)
        .bind(&grant.session_id)
        .bind(&grant.client_id)
        .bind(&grant.description)
        .bind(grant.creation_time)
        .bind(grant.expiration)
        .bind(grant.consumed_time)
        .bind(&grant.data)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_dup_key(&e) => Err(RepoError::Duplicate(grant.key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, grant: &Grant) -> Result<u64, RepoError> {
        let res = sqlx::query(
            r#"
UPDATE persisted_grants
SET `type` = ?, subject_id = ?, session_id = ?, client_id = ?, description = ?,
    creation_time = ?, expiration = ?, consumed_time = ?, data = ?
WHERE `key` = ?
"#,
        )
        .bind(&grant.grant_type)
        .bind(&grant.subject_id)
        .bind(&grant.session_id)
        .bind(&grant.client_id)
        .bind(&grant.description)
        .bind(grant.creation_time)
        .bind(grant.expiration)
        .bind(grant.consumed_time)
        .bind(&grant.data)
        .bind(&grant.key.0)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }

    async fn find_all(&self, filter: &GrantFilter) -> Result<Vec<Grant>, RepoError> {
        let head = format!("SELECT {GRANT_COLUMNS} FROM persisted_grants");
        let rows = Self::filtered(&head, filter)
            .build()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_grant).collect()
    }

    async fn delete(&self, key: &GrantKey) -> Result<u64, RepoError> {
        let res = sqlx::query("DELETE FROM persisted_grants WHERE `key` = ?")
            .bind(&key.0)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }

    async fn delete_all(&self, filter: &GrantFilter) -> Result<u64, RepoError> {
        let res = Self::filtered("DELETE FROM persisted_grants", filter)
            .build()
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Grant>, RepoError> {
        let rows = sqlx::query(&format!(
            r#"
SELECT {GRANT_COLUMNS}
FROM persisted_grants
WHERE expiration < ?
ORDER BY `key` ASC
LIMIT ?
"#
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_grant).collect()
    }

    async fn delete_batch(&self, keys: &[GrantKey]) -> Result<u64, RepoError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<MySql> =
            QueryBuilder::new("DELETE FROM persisted_grants WHERE `key` IN (");
        let mut separated = qb.separated(", ");
        for key in keys {
            separated.push_bind(&key.0);
        }
        separated.push_unseparated(")");

        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }
}
