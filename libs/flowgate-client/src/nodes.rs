use serde::Deserialize;
use serde_json::json;

use crate::client::{Method, PanelClient};
use crate::error::PanelError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLimit {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub speed: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<i64>,
}

impl PanelClient {
    pub async fn list_speed_limits(&self) -> Result<Vec<SpeedLimit>, PanelError> {
        self.request("/api/v1/speed-limit/list", &json!({}), Method::Post)
            .await
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>, PanelError> {
        self.request("/api/v1/node/list", &json!({}), Method::Post)
            .await
    }

    /// There is no get-by-id endpoint; scan the list.
    pub async fn get_node(&self, node_id: i64) -> Result<Option<Node>, PanelError> {
        let nodes = self.list_nodes().await?;
        Ok(nodes.into_iter().find(|n| n.id == node_id))
    }
}
