use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{Method, PanelClient};
use crate::error::PanelError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forward {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tunnel_id: Option<i64>,
    #[serde(default)]
    pub remote_addr: Option<String>,
    #[serde(default)]
    pub in_port: Option<i64>,
    #[serde(default)]
    pub status: Option<i64>,
}

/// Payload for `/api/v1/forward/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateForwardRequest {
    pub tunnel_id: i64,
    pub name: String,
    /// Target in `host:port` form.
    pub remote_addr: String,
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_port: Option<i64>,
}

impl CreateForwardRequest {
    pub fn new(tunnel_id: i64, name: impl Into<String>, remote_addr: impl Into<String>) -> Self {
        Self {
            tunnel_id,
            name: name.into(),
            remote_addr: remote_addr.into(),
            strategy: "fifo".into(),
            in_port: None,
        }
    }
}

impl PanelClient {
    pub async fn create_forward(
        &self,
        req: &CreateForwardRequest,
    ) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/forward/create", req, Method::Post)
            .await
    }

    pub async fn list_forwards(&self) -> Result<Vec<Forward>, PanelError> {
        self.request("/api/v1/forward/list", &json!({}), Method::Post)
            .await
    }

    pub async fn delete_forward(&self, forward_id: i64) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/forward/delete", &json!({ "id": forward_id }), Method::Post)
            .await
    }

    pub async fn pause_forward(&self, forward_id: i64) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/forward/pause", &json!({ "id": forward_id }), Method::Post)
            .await
    }

    pub async fn resume_forward(&self, forward_id: i64) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/forward/resume", &json!({ "id": forward_id }), Method::Post)
            .await
    }
}
