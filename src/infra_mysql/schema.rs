use sqlx::MySqlPool;

const SCHEMA: &str = include_str!("schema.sql");

pub struct MySqlSchema;

impl MySqlSchema {
    /// Creates the grant and device code tables if they are missing.
    pub async fn sync(pool: &MySqlPool) -> anyhow::Result<()> {
        for statement in Self::statements() {
            sqlx::query(statement).execute(pool).await?;
        }
        tracing::info!("operational schema in sync");
        Ok(())
    }

    fn statements() -> impl Iterator<Item = &'static str> {
        SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty())
    }
}
