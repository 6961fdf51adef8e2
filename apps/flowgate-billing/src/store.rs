use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row};

/// The five durable fields this connector keeps per provisioned service.
/// Everything else lives on the panel and is re-fetched on demand.
pub const FIELD_USER_ID: &str = "fg_user_id";
pub const FIELD_USERNAME: &str = "fg_username";
pub const FIELD_PASSWORD: &str = "fg_password";
pub const FIELD_TUNNEL_ID: &str = "fg_tunnel_id";
pub const FIELD_BINDING_ID: &str = "fg_binding_id";

/// Key/value persistence in the billing host's generic per-service
/// custom-field tables.
#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn get(&self, service_id: i64, name: &str) -> Result<Option<String>>;
    async fn set(&self, service_id: i64, name: &str, value: &str) -> Result<()>;
}

/// Field store over the host CRM's `tblcustomfields` /
/// `tblcustomfieldsvalues` pair. Field definitions are matched by name
/// prefix, as the host appends display suffixes to the field name.
#[derive(Clone)]
pub struct MySqlFieldStore {
    pool: MySqlPool,
}

impl MySqlFieldStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn field_id(&self, name: &str) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT id FROM tblcustomfields \
             WHERE type = 'product' AND fieldname LIKE CONCAT(?, '%') LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up custom field definition")?;

        Ok(row.map(|r| r.get::<i64, _>("id")))
    }
}

#[async_trait]
impl FieldStore for MySqlFieldStore {
    async fn get(&self, service_id: i64, name: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT v.value FROM tblcustomfieldsvalues v \
             JOIN tblcustomfields f ON f.id = v.fieldid \
             WHERE f.type = 'product' AND f.fieldname LIKE CONCAT(?, '%') AND v.relid = ? \
             LIMIT 1",
        )
        .bind(name)
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read service custom field")?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, service_id: i64, name: &str, value: &str) -> Result<()> {
        let Some(field_id) = self.field_id(name).await? else {
            // The field definition was never created in the host; nothing to
            // write into.
            return Ok(());
        };

        let exists = sqlx::query(
            "SELECT 1 AS present FROM tblcustomfieldsvalues WHERE fieldid = ? AND relid = ? LIMIT 1",
        )
        .bind(field_id)
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check for existing field value")?;

        if exists.is_some() {
            sqlx::query("UPDATE tblcustomfieldsvalues SET value = ? WHERE fieldid = ? AND relid = ?")
                .bind(value)
                .bind(field_id)
                .bind(service_id)
                .execute(&self.pool)
                .await
                .context("Failed to update service custom field")?;
        } else {
            sqlx::query("INSERT INTO tblcustomfieldsvalues (fieldid, relid, value) VALUES (?, ?, ?)")
                .bind(field_id)
                .bind(service_id)
                .bind(value)
                .execute(&self.pool)
                .await
                .context("Failed to insert service custom field")?;
        }

        Ok(())
    }
}
