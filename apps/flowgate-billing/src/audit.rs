use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{info, warn};

/// Audit trail for operator diagnosis: every panel request/response pair a
/// provisioning operation makes is recorded, failures included. Recording is
/// best-effort — a broken audit table must not fail the provisioning itself.
#[async_trait]
pub trait ModuleLog: Send + Sync {
    async fn record(&self, action: &str, request: &serde_json::Value, response: &str, status: &str);
}

/// Writes into the host CRM's module-call log table.
pub struct MySqlModuleLog {
    pool: MySqlPool,
}

impl MySqlModuleLog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModuleLog for MySqlModuleLog {
    async fn record(&self, action: &str, request: &serde_json::Value, response: &str, status: &str) {
        info!(action, status, "panel module call");

        let result = sqlx::query(
            "INSERT INTO tblmodulelog (date, module, action, request, response, arrdata) \
             VALUES (NOW(), 'flowgate', ?, ?, ?, '')",
        )
        .bind(action)
        .bind(request.to_string())
        .bind(response)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(action, error = %e, "failed to write module log entry");
        }
    }
}
