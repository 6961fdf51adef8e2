use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{Method, PanelClient};
use crate::error::PanelError;
use crate::units::{days_to_ms, now_ms};

/// A panel account as returned by the user endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUser {
    pub id: i64,
    #[serde(rename = "user")]
    pub username: String,
    #[serde(default)]
    pub status: Option<i64>,
    /// Traffic quota. The user endpoints express this in GB, unlike the
    /// tunnel-binding endpoints which use bytes.
    #[serde(default)]
    pub flow: Option<i64>,
    /// Maximum number of forwards.
    #[serde(default)]
    pub num: Option<i64>,
    /// Expiry instant, epoch milliseconds.
    #[serde(default)]
    pub exp_time: Option<i64>,
    #[serde(default)]
    pub in_flow: Option<i64>,
    #[serde(default)]
    pub out_flow: Option<i64>,
}

/// Payload for `/api/v1/user/create`.
///
/// `status` is always 1 on creation; callers adjust it afterwards through
/// [`UpdateUserRequest`] if they need to. Only the documented tunable fields
/// are exposed here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(rename = "user")]
    pub username: String,
    #[serde(rename = "pwd")]
    pub password: String,
    pub status: i64,
    /// Quota in GB.
    pub flow: i64,
    pub num: i64,
    /// Epoch milliseconds.
    pub exp_time: i64,
    pub flow_reset_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<i64>>,
}

impl CreateUserRequest {
    /// Panel defaults: 100 GB, 10 forwards, one year of validity.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            status: 1,
            flow: 100,
            num: 10,
            exp_time: now_ms() + days_to_ms(365),
            flow_reset_time: 1,
            group_ids: None,
        }
    }
}

/// Partial update for `/api/v1/user/update`; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: i64,
    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "pwd", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Quota in GB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_time: Option<i64>,
}

impl PanelClient {
    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/user/create", req, Method::Post).await
    }

    pub async fn update_user(&self, req: &UpdateUserRequest) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/user/update", req, Method::Post).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/user/delete", &json!({ "id": user_id }), Method::Post)
            .await
    }

    pub async fn list_users(&self, keyword: &str) -> Result<Vec<PanelUser>, PanelError> {
        self.request("/api/v1/user/list", &json!({ "keyword": keyword }), Method::Post)
            .await
    }

    /// The panel's list endpoint is a keyword search, so an exact lookup has
    /// to scan the hits for an exact username match.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PanelUser>, PanelError> {
        let users = self.list_users(username).await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    /// `type` 1 resets the user's own counters, 2 the per-tunnel counters.
    pub async fn reset_user_flow(
        &self,
        user_id: i64,
        reset_type: i64,
    ) -> Result<serde_json::Value, PanelError> {
        self.request(
            "/api/v1/user/reset",
            &json!({ "id": user_id, "type": reset_type }),
            Method::Post,
        )
        .await
    }

    /// Package overview for the authenticated account. Only meaningful with a
    /// user-issued token, not the admin credential.
    pub async fn user_package(&self) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/user/package", &json!({}), Method::Post)
            .await
    }
}
