use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use flowgate_client::{
    days_to_ms, find_binding, format_bytes, gb_to_bytes, generate_password, now_ms,
    AssignTunnelRequest, CreateUserRequest, PanelClient, PanelError, UpdateUserRequest,
    UpdateUserTunnelRequest,
};

use crate::audit::ModuleLog;
use crate::config::ProductConfig;
use crate::store::{
    FieldStore, FIELD_BINDING_ID, FIELD_PASSWORD, FIELD_TUNNEL_ID, FIELD_USERNAME, FIELD_USER_ID,
};

/// Derives the panel username for a service: the domain's first label when a
/// domain exists, else the email local part plus the last four digits of the
/// service id, else the bare service id. Always lowercase alphanumeric with a
/// `u` prefix.
pub fn derive_username(service_id: i64, domain: Option<&str>, email: Option<&str>) -> String {
    fn clean(s: &str) -> String {
        s.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }

    if let Some(domain) = domain.filter(|d| !d.trim().is_empty()) {
        let label = domain.split('.').next().unwrap_or(domain);
        return format!("u{}", clean(label));
    }
    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        let local = email.split('@').next().unwrap_or(email);
        let sid = service_id.to_string();
        let suffix = &sid[sid.len().saturating_sub(4)..];
        return format!("u{}{}", clean(local), suffix);
    }
    format!("u{service_id}")
}

/// Client-area view of a provisioned service.
#[derive(Debug, Serialize)]
pub struct ServiceOverview {
    pub status: String,
    pub username: Option<String>,
    pub tunnel_id: Option<i64>,
    pub tunnel_name: Option<String>,
    pub max_forwards: i64,
    pub used_traffic: String,
    pub total_traffic: String,
    pub used_traffic_bytes: i64,
    pub total_traffic_bytes: i64,
    pub traffic_percentage: f64,
    pub expiry_date: Option<String>,
    pub panel_url: String,
}

/// Per-service usage snapshot for the host's own suspension policy.
#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub service_id: i64,
    pub used_bytes: i64,
    pub total_bytes: i64,
    pub over_quota: bool,
}

/// Drives account lifecycle on the panel for the billing host. Each
/// operation is one fixed sequence of panel calls; every request/response
/// pair is recorded in the module log.
pub struct Provisioner {
    client: PanelClient,
    store: Arc<dyn FieldStore>,
    log: Arc<dyn ModuleLog>,
    default_tunnel_id: Option<i64>,
}

fn outcome<T: std::fmt::Debug>(result: &Result<T, PanelError>) -> (String, &'static str) {
    match result {
        Ok(v) => (format!("{v:?}"), "success"),
        Err(e) => (e.to_string(), "error"),
    }
}

impl Provisioner {
    pub fn new(
        client: PanelClient,
        store: Arc<dyn FieldStore>,
        log: Arc<dyn ModuleLog>,
        default_tunnel_id: Option<i64>,
    ) -> Self {
        Self {
            client,
            store,
            log,
            default_tunnel_id,
        }
    }

    async fn stored_id(&self, service_id: i64, field: &str) -> Result<Option<i64>> {
        Ok(self
            .store
            .get(service_id, field)
            .await?
            .and_then(|v| v.trim().parse().ok()))
    }

    /// Provision a fresh service: create (or adopt) the panel user, assign
    /// the tunnel, locate the binding record and persist the ids the later
    /// lifecycle operations will need.
    pub async fn create_account(
        &self,
        service_id: i64,
        domain: Option<&str>,
        email: Option<&str>,
        product: &ProductConfig,
    ) -> Result<()> {
        let username = derive_username(service_id, domain, email);
        let password = generate_password(12);

        let tunnel_id = product
            .tunnel_id
            .or(self.default_tunnel_id)
            .context("no tunnel id configured; set it on the product or the server")?;

        let exp_time = now_ms() + days_to_ms(product.expiry_days);

        let existing = self.client.get_user_by_username(&username).await?;
        let user_id = match existing {
            Some(user) => {
                info!(username, user_id = user.id, "panel user already exists; adopting");
                self.log
                    .record(
                        "CreateAccount",
                        &json!({ "username": username }),
                        &format!("user already exists: {}", user.id),
                        "success",
                    )
                    .await;
                user.id
            }
            None => {
                let mut req = CreateUserRequest::new(username.clone(), password.clone());
                req.flow = product.traffic_gb;
                req.num = product.max_forwards;
                req.exp_time = exp_time;

                let result = self.client.create_user(&req).await;
                let (response, status) = outcome(&result);
                self.log
                    .record(
                        "CreateAccount.CreateUser",
                        &json!({
                            "username": username,
                            "flow": product.traffic_gb,
                            "num": product.max_forwards,
                            "expTime": exp_time,
                        }),
                        &response,
                        status,
                    )
                    .await;
                result.context("Failed to create panel user")?;

                // The create endpoint does not echo the new id back.
                self.client
                    .get_user_by_username(&username)
                    .await?
                    .context("Failed to retrieve created user")?
                    .id
            }
        };

        let assign = AssignTunnelRequest {
            user_id,
            tunnel_id,
            flow: gb_to_bytes(product.traffic_gb),
            num: product.max_forwards,
            exp_time,
            flow_reset_time: 1,
            status: 1,
            speed_id: product.speed_id,
        };
        let result = self.client.assign_tunnel(&assign).await;
        let (response, status) = outcome(&result);
        self.log
            .record(
                "CreateAccount.AssignTunnel",
                &json!({ "userId": user_id, "tunnelId": tunnel_id }),
                &response,
                status,
            )
            .await;
        result.context("Failed to assign tunnel")?;

        let bindings = self.client.list_user_tunnels(user_id).await?;
        let binding = find_binding(&bindings, tunnel_id);

        self.store
            .set(service_id, FIELD_USER_ID, &user_id.to_string())
            .await?;
        self.store.set(service_id, FIELD_USERNAME, &username).await?;
        self.store.set(service_id, FIELD_PASSWORD, &password).await?;
        self.store
            .set(service_id, FIELD_TUNNEL_ID, &tunnel_id.to_string())
            .await?;
        if let Some(binding) = binding {
            self.store
                .set(service_id, FIELD_BINDING_ID, &binding.id.to_string())
                .await?;
        } else {
            warn!(user_id, tunnel_id, "assigned binding not found in user's tunnel list");
        }

        Ok(())
    }

    pub async fn suspend_account(&self, service_id: i64) -> Result<()> {
        self.set_binding_status(service_id, 0, "SuspendAccount")
            .await
    }

    pub async fn unsuspend_account(&self, service_id: i64) -> Result<()> {
        self.set_binding_status(service_id, 1, "UnsuspendAccount")
            .await
    }

    async fn set_binding_status(
        &self,
        service_id: i64,
        new_status: i64,
        action: &str,
    ) -> Result<()> {
        let binding_id = self
            .stored_id(service_id, FIELD_BINDING_ID)
            .await?
            .context("binding id not found; service may not be provisioned correctly")?;

        let req = UpdateUserTunnelRequest {
            id: binding_id,
            status: Some(new_status),
            ..Default::default()
        };
        let result = self.client.update_user_tunnel(&req).await;
        let (response, status) = outcome(&result);
        self.log
            .record(action, &json!({ "bindingId": binding_id }), &response, status)
            .await;
        result.with_context(|| format!("Failed to update binding {binding_id}"))?;

        Ok(())
    }

    /// Remove the tunnel binding (if one was recorded) and clear all stored
    /// fields. Clearing happens regardless, so a half-provisioned service can
    /// always be terminated.
    pub async fn terminate_account(&self, service_id: i64) -> Result<()> {
        if let Some(binding_id) = self.stored_id(service_id, FIELD_BINDING_ID).await? {
            let result = self.client.remove_user_tunnel(binding_id).await;
            let (response, status) = outcome(&result);
            self.log
                .record(
                    "TerminateAccount.RemoveBinding",
                    &json!({ "bindingId": binding_id }),
                    &response,
                    status,
                )
                .await;
            if let Err(e) = result {
                warn!(binding_id, error = %e, "binding removal failed; clearing fields anyway");
            }
        }

        for field in [
            FIELD_USER_ID,
            FIELD_USERNAME,
            FIELD_PASSWORD,
            FIELD_TUNNEL_ID,
            FIELD_BINDING_ID,
        ] {
            self.store.set(service_id, field, "").await?;
        }

        Ok(())
    }

    pub async fn change_password(&self, service_id: i64, new_password: &str) -> Result<()> {
        let user_id = self
            .stored_id(service_id, FIELD_USER_ID)
            .await?
            .context("user not provisioned")?;
        let username = self
            .store
            .get(service_id, FIELD_USERNAME)
            .await?
            .filter(|u| !u.is_empty())
            .context("user not provisioned")?;

        let req = UpdateUserRequest {
            id: user_id,
            username: Some(username),
            password: Some(new_password.to_string()),
            ..Default::default()
        };
        let result = self.client.update_user(&req).await;
        let (response, status) = outcome(&result);
        self.log
            .record("ChangePassword", &json!({ "userId": user_id }), &response, status)
            .await;
        result.context("Failed to change password")?;

        self.store
            .set(service_id, FIELD_PASSWORD, new_password)
            .await?;

        Ok(())
    }

    /// Apply new product limits to both the binding (bytes) and the user
    /// record (GB). The binding update is the one that matters for
    /// enforcement; the user update is best-effort and only logged.
    pub async fn change_package(&self, service_id: i64, product: &ProductConfig) -> Result<()> {
        let binding_id = self
            .stored_id(service_id, FIELD_BINDING_ID)
            .await?
            .context("service not provisioned")?;
        let user_id = self
            .stored_id(service_id, FIELD_USER_ID)
            .await?
            .context("service not provisioned")?;

        let exp_time = now_ms() + days_to_ms(product.expiry_days);

        let binding_req = UpdateUserTunnelRequest {
            id: binding_id,
            flow: Some(gb_to_bytes(product.traffic_gb)),
            num: Some(product.max_forwards),
            exp_time: Some(exp_time),
            speed_id: product.speed_id,
            ..Default::default()
        };
        let binding_result = self.client.update_user_tunnel(&binding_req).await;
        let (response, status) = outcome(&binding_result);
        self.log
            .record(
                "ChangePackage.UpdateBinding",
                &json!({ "bindingId": binding_id, "flow": gb_to_bytes(product.traffic_gb) }),
                &response,
                status,
            )
            .await;

        let user_req = UpdateUserRequest {
            id: user_id,
            flow: Some(product.traffic_gb),
            num: Some(product.max_forwards),
            exp_time: Some(exp_time),
            ..Default::default()
        };
        let user_result = self.client.update_user(&user_req).await;
        let (response, status) = outcome(&user_result);
        self.log
            .record(
                "ChangePackage.UpdateUser",
                &json!({ "userId": user_id }),
                &response,
                status,
            )
            .await;
        if let Err(e) = user_result {
            warn!(user_id, error = %e, "user-level limit update failed");
        }

        binding_result.context("Failed to update package")?;
        Ok(())
    }

    /// Snapshot for the client area: stored identity plus live traffic
    /// figures from the panel.
    pub async fn service_overview(
        &self,
        service_id: i64,
        product: &ProductConfig,
        panel_url: &str,
    ) -> Result<ServiceOverview> {
        let user_id = self.stored_id(service_id, FIELD_USER_ID).await?;
        let username = self
            .store
            .get(service_id, FIELD_USERNAME)
            .await?
            .filter(|u| !u.is_empty());
        let tunnel_id = self.stored_id(service_id, FIELD_TUNNEL_ID).await?;

        let Some(user_id) = user_id else {
            return Ok(ServiceOverview {
                status: "not_provisioned".into(),
                username: None,
                tunnel_id: None,
                tunnel_name: None,
                max_forwards: product.max_forwards,
                used_traffic: format_bytes(0),
                total_traffic: format_bytes(0),
                used_traffic_bytes: 0,
                total_traffic_bytes: 0,
                traffic_percentage: 0.0,
                expiry_date: None,
                panel_url: panel_url.to_string(),
            });
        };

        let binding = match tunnel_id {
            Some(tid) => {
                let bindings = self.client.list_user_tunnels(user_id).await?;
                find_binding(&bindings, tid).cloned()
            }
            None => None,
        };

        let tunnel_name = match tunnel_id {
            Some(tid) => match self.client.get_tunnel(tid).await {
                Ok(tunnel) => Some(tunnel.name),
                Err(e) => {
                    warn!(tunnel_id = tid, error = %e, "failed to fetch tunnel details");
                    None
                }
            },
            None => None,
        };

        let mut used = 0;
        let mut total = gb_to_bytes(product.traffic_gb);
        let mut expiry_date = None;
        if let Some(binding) = &binding {
            used = binding.in_flow.unwrap_or(0) + binding.out_flow.unwrap_or(0);
            total = binding.flow.unwrap_or(total);
            expiry_date = binding.exp_time.and_then(|ms| {
                chrono::DateTime::from_timestamp_millis(ms)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            });
        }

        let percentage = if total > 0 {
            ((used as f64 / total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Ok(ServiceOverview {
            status: "active".into(),
            username,
            tunnel_id,
            tunnel_name,
            max_forwards: product.max_forwards,
            used_traffic: format_bytes(used),
            total_traffic: format_bytes(total),
            used_traffic_bytes: used,
            total_traffic_bytes: total,
            traffic_percentage: percentage,
            expiry_date,
            panel_url: panel_url.to_string(),
        })
    }

    /// Compare each service's live usage against its binding quota. Services
    /// missing stored ids or failing the panel fetch are skipped; the host
    /// acts on the returned reports.
    pub async fn usage_sync(&self, service_ids: &[i64]) -> Result<Vec<UsageReport>> {
        let mut reports = Vec::new();

        for &service_id in service_ids {
            let (Some(user_id), Some(binding_id)) = (
                self.stored_id(service_id, FIELD_USER_ID).await?,
                self.stored_id(service_id, FIELD_BINDING_ID).await?,
            ) else {
                continue;
            };

            let bindings = match self.client.list_user_tunnels(user_id).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(service_id, user_id, error = %e, "usage fetch failed; skipping");
                    continue;
                }
            };

            if let Some(binding) = bindings.iter().find(|b| b.id == binding_id) {
                let used = binding.in_flow.unwrap_or(0) + binding.out_flow.unwrap_or(0);
                let total = binding.flow.unwrap_or(0);
                reports.push(UsageReport {
                    service_id,
                    used_bytes: used,
                    total_bytes: total,
                    over_quota: total > 0 && used >= total,
                });
            }
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::MemoryModuleLog;
    use crate::store::testing::MemoryFieldStore;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product(tunnel_id: Option<i64>) -> ProductConfig {
        ProductConfig {
            traffic_gb: 100,
            max_forwards: 10,
            tunnel_id,
            speed_id: None,
            expiry_days: 30,
        }
    }

    fn success(data: serde_json::Value) -> serde_json::Value {
        json!({ "code": 0, "msg": "success", "data": data })
    }

    async fn provisioner(server: &MockServer) -> (Provisioner, Arc<MemoryFieldStore>) {
        let client = PanelClient::builder()
            .base_url(server.uri())
            .token("tok")
            .build()
            .unwrap();
        let store = Arc::new(MemoryFieldStore::default());
        let provisioner = Provisioner::new(
            client,
            store.clone(),
            Arc::new(MemoryModuleLog::default()),
            None,
        );
        (provisioner, store)
    }

    #[test]
    fn username_prefers_domain_label() {
        assert_eq!(
            derive_username(3412, Some("Example-Site.com"), Some("joe@mail.com")),
            "uexamplesite"
        );
    }

    #[test]
    fn username_falls_back_to_email_with_service_suffix() {
        assert_eq!(
            derive_username(123412, None, Some("Joe.Doe@mail.com")),
            "ujoedoe3412"
        );
    }

    #[test]
    fn username_falls_back_to_service_id() {
        assert_eq!(derive_username(77, None, None), "u77");
        assert_eq!(derive_username(77, Some("  "), None), "u77");
    }

    #[tokio::test]
    async fn create_adopts_existing_user_and_persists_binding() {
        let server = MockServer::start().await;
        let username = derive_username(3412, Some("example.com"), None);

        Mock::given(method("POST"))
            .and(path("/api/v1/user/list"))
            .and(body_json(json!({ "keyword": username })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                { "id": 42, "user": username }
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/assign"))
            .and(body_partial_json(json!({ "userId": 42, "tunnelId": 7, "status": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                { "id": 900, "userId": 42, "tunnelId": 5 },
                { "id": 901, "userId": 42, "tunnelId": 7 }
            ]))))
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        provisioner
            .create_account(3412, Some("example.com"), None, &product(Some(7)))
            .await
            .unwrap();

        assert_eq!(store.get(3412, FIELD_USER_ID).await.unwrap().unwrap(), "42");
        assert_eq!(
            store.get(3412, FIELD_TUNNEL_ID).await.unwrap().unwrap(),
            "7"
        );
        assert_eq!(
            store.get(3412, FIELD_BINDING_ID).await.unwrap().unwrap(),
            "901"
        );
        assert_eq!(
            store.get(3412, FIELD_USERNAME).await.unwrap().unwrap(),
            username
        );
        assert_eq!(
            store
                .get(3412, FIELD_PASSWORD)
                .await
                .unwrap()
                .unwrap()
                .len(),
            12
        );
    }

    #[tokio::test]
    async fn create_makes_a_user_when_none_exists() {
        let server = MockServer::start().await;
        let username = derive_username(9, None, None);

        // First lookup finds nothing; the one after creation finds the user.
        Mock::given(method("POST"))
            .and(path("/api/v1/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([]))))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/create"))
            .and(body_partial_json(json!({ "user": username, "status": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                { "id": 55, "user": username }
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/assign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                { "id": 700, "userId": 55, "tunnelId": 3 }
            ]))))
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        provisioner
            .create_account(9, None, None, &product(Some(3)))
            .await
            .unwrap();

        assert_eq!(store.get(9, FIELD_USER_ID).await.unwrap().unwrap(), "55");
        assert_eq!(
            store.get(9, FIELD_BINDING_ID).await.unwrap().unwrap(),
            "700"
        );
    }

    #[tokio::test]
    async fn create_without_tunnel_id_fails_cleanly() {
        let server = MockServer::start().await;
        let (provisioner, _) = provisioner(&server).await;

        let err = provisioner
            .create_account(1, None, None, &product(None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no tunnel id configured"));
    }

    #[tokio::test]
    async fn suspend_updates_the_stored_binding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/update"))
            .and(body_json(json!({ "id": 901, "status": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        store.set(3412, FIELD_BINDING_ID, "901").await.unwrap();

        provisioner.suspend_account(3412).await.unwrap();
    }

    #[tokio::test]
    async fn suspend_without_binding_reports_not_provisioned() {
        let server = MockServer::start().await;
        let (provisioner, _) = provisioner(&server).await;

        let err = provisioner.suspend_account(3412).await.unwrap_err();
        assert!(err.to_string().contains("not provisioned"));
    }

    #[tokio::test]
    async fn terminate_removes_binding_and_clears_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/remove"))
            .and(body_json(json!({ "id": 901 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        store.set(3412, FIELD_USER_ID, "42").await.unwrap();
        store.set(3412, FIELD_USERNAME, "uex").await.unwrap();
        store.set(3412, FIELD_PASSWORD, "pw").await.unwrap();
        store.set(3412, FIELD_TUNNEL_ID, "7").await.unwrap();
        store.set(3412, FIELD_BINDING_ID, "901").await.unwrap();

        provisioner.terminate_account(3412).await.unwrap();

        for field in [
            FIELD_USER_ID,
            FIELD_USERNAME,
            FIELD_PASSWORD,
            FIELD_TUNNEL_ID,
            FIELD_BINDING_ID,
        ] {
            assert_eq!(store.get(3412, field).await.unwrap().unwrap(), "");
        }
    }

    #[tokio::test]
    async fn change_package_updates_binding_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/update"))
            .and(body_partial_json(json!({ "id": 901, "flow": gb_to_bytes(50), "num": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/user/update"))
            .and(body_partial_json(json!({ "id": 42, "flow": 50, "num": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
            .expect(1)
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        store.set(3412, FIELD_USER_ID, "42").await.unwrap();
        store.set(3412, FIELD_BINDING_ID, "901").await.unwrap();

        let pkg = ProductConfig {
            traffic_gb: 50,
            max_forwards: 5,
            tunnel_id: Some(7),
            speed_id: None,
            expiry_days: 30,
        };
        provisioner.change_package(3412, &pkg).await.unwrap();
    }

    #[tokio::test]
    async fn usage_sync_flags_over_quota_services() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                {
                    "id": 901, "userId": 42, "tunnelId": 7,
                    "flow": 1000, "inFlow": 600, "outFlow": 500
                }
            ]))))
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        store.set(3412, FIELD_USER_ID, "42").await.unwrap();
        store.set(3412, FIELD_BINDING_ID, "901").await.unwrap();

        let reports = provisioner.usage_sync(&[3412, 9999]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].service_id, 3412);
        assert_eq!(reports[0].used_bytes, 1100);
        assert!(reports[0].over_quota);
    }

    #[tokio::test]
    async fn overview_reports_unprovisioned_service() {
        let server = MockServer::start().await;
        let (provisioner, _) = provisioner(&server).await;

        let overview = provisioner
            .service_overview(3412, &product(Some(7)), "http://panel")
            .await
            .unwrap();
        assert_eq!(overview.status, "not_provisioned");
        assert!(overview.username.is_none());
    }

    #[tokio::test]
    async fn overview_computes_usage_from_the_binding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/user/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!([
                {
                    "id": 901, "userId": 42, "tunnelId": 7,
                    "flow": gb_to_bytes(100), "inFlow": gb_to_bytes(20), "outFlow": gb_to_bytes(5),
                    "expTime": 1764547200000i64
                }
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tunnel/get"))
            .and(body_json(json!({ "id": 7 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(
                { "id": 7, "name": "hk-1" }
            ))))
            .mount(&server)
            .await;

        let (provisioner, store) = provisioner(&server).await;
        store.set(3412, FIELD_USER_ID, "42").await.unwrap();
        store.set(3412, FIELD_USERNAME, "uexample").await.unwrap();
        store.set(3412, FIELD_TUNNEL_ID, "7").await.unwrap();

        let overview = provisioner
            .service_overview(3412, &product(Some(7)), "http://panel")
            .await
            .unwrap();
        assert_eq!(overview.status, "active");
        assert_eq!(overview.tunnel_name.as_deref(), Some("hk-1"));
        assert_eq!(overview.used_traffic, "25 GB");
        assert_eq!(overview.total_traffic, "100 GB");
        assert_eq!(overview.traffic_percentage, 25.0);
        assert_eq!(overview.expiry_date.as_deref(), Some("2025-12-01 00:00:00"));
    }
}
