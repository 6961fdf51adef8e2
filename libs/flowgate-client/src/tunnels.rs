use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{Method, PanelClient};
use crate::error::PanelError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tunnel {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<i64>,
}

/// A user↔tunnel binding record.
///
/// Its `id` is distinct from both the user id and the tunnel id; the update
/// and remove endpoints address the binding, not either party.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTunnel {
    pub id: i64,
    pub user_id: i64,
    pub tunnel_id: i64,
    /// Quota in bytes (the user endpoints use GB; this one does not).
    #[serde(default)]
    pub flow: Option<i64>,
    #[serde(default)]
    pub in_flow: Option<i64>,
    #[serde(default)]
    pub out_flow: Option<i64>,
    #[serde(default)]
    pub num: Option<i64>,
    #[serde(default)]
    pub exp_time: Option<i64>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub speed_id: Option<i64>,
}

/// Payload for `/api/v1/tunnel/user/assign`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTunnelRequest {
    pub user_id: i64,
    pub tunnel_id: i64,
    /// Quota in bytes; 0 means unlimited.
    pub flow: i64,
    /// Max forwards; 0 means unlimited.
    pub num: i64,
    /// Epoch milliseconds.
    pub exp_time: i64,
    pub flow_reset_time: i64,
    pub status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_id: Option<i64>,
}

/// One entry of a batch assignment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelAssignment {
    pub tunnel_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_id: Option<i64>,
}

/// Partial update for `/api/v1/tunnel/user/update`, addressed by binding id.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserTunnelRequest {
    /// The binding id, not the user or tunnel id.
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Quota in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_id: Option<i64>,
}

/// Locates the binding for a given tunnel in a user's binding list.
///
/// The panel has no direct "binding by user+tunnel" lookup, so consumers scan
/// the per-user list and take the first record whose tunnel id matches.
pub fn find_binding(bindings: &[UserTunnel], tunnel_id: i64) -> Option<&UserTunnel> {
    bindings.iter().find(|b| b.tunnel_id == tunnel_id)
}

impl PanelClient {
    pub async fn list_tunnels(&self) -> Result<Vec<Tunnel>, PanelError> {
        self.request("/api/v1/tunnel/list", &json!({}), Method::Post)
            .await
    }

    pub async fn get_tunnel(&self, tunnel_id: i64) -> Result<Tunnel, PanelError> {
        self.request("/api/v1/tunnel/get", &json!({ "id": tunnel_id }), Method::Post)
            .await
    }

    pub async fn assign_tunnel(
        &self,
        req: &AssignTunnelRequest,
    ) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/tunnel/user/assign", req, Method::Post)
            .await
    }

    pub async fn batch_assign_tunnels(
        &self,
        user_id: i64,
        tunnels: &[TunnelAssignment],
    ) -> Result<serde_json::Value, PanelError> {
        self.request(
            "/api/v1/tunnel/user/batch-assign",
            &json!({ "userId": user_id, "tunnels": tunnels }),
            Method::Post,
        )
        .await
    }

    pub async fn update_user_tunnel(
        &self,
        req: &UpdateUserTunnelRequest,
    ) -> Result<serde_json::Value, PanelError> {
        self.request("/api/v1/tunnel/user/update", req, Method::Post)
            .await
    }

    pub async fn remove_user_tunnel(&self, binding_id: i64) -> Result<serde_json::Value, PanelError> {
        self.request(
            "/api/v1/tunnel/user/remove",
            &json!({ "id": binding_id }),
            Method::Post,
        )
        .await
    }

    pub async fn list_user_tunnels(&self, user_id: i64) -> Result<Vec<UserTunnel>, PanelError> {
        self.request(
            "/api/v1/tunnel/user/list",
            &json!({ "userId": user_id }),
            Method::Post,
        )
        .await
    }
}
