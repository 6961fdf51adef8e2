use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::{is_session_expired, PanelError};
use crate::session::{CachedToken, Session, SessionConfig};

const LOGIN_ENDPOINT: &str = "/api/v1/user/login";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry of a host-injected panel address list (embedded deployment
/// mode). The entry flagged `inx` is the one currently selected.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelAddress {
    pub name: String,
    pub address: String,
    pub inx: bool,
}

/// Picks the API base URL: an explicit configured value wins, otherwise the
/// selected entry of the injected address list. `None` means the panel
/// address was never set; calls will short-circuit with a failure envelope.
pub fn resolve_base_url(explicit: Option<&str>, addresses: &[PanelAddress]) -> Option<String> {
    if let Some(base) = explicit {
        if !base.trim().is_empty() {
            return Some(base.trim_end_matches('/').to_string());
        }
    }
    addresses
        .iter()
        .find(|a| a.inx)
        .map(|a| a.address.trim_end_matches('/').to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

type ExpiredHook = Box<dyn Fn() + Send + Sync + 'static>;

/// Authenticated wrapper around the panel's admin REST API.
///
/// All state is per-instance; there are no process-wide globals. The client
/// is cheap to share behind an `Arc`.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Option<String>,
    session: Session,
    /// Set once the current credential has been reported as expired; re-armed
    /// when a fresh token is installed. Keeps the expiry hook to one firing
    /// per expiry event no matter how many calls observe it.
    expired_fired: AtomicBool,
    on_session_expired: Option<ExpiredHook>,
}

pub struct PanelClientBuilder {
    base_url: Option<String>,
    login: Option<SessionConfig>,
    token: Option<String>,
    timeout: Duration,
    on_session_expired: Option<ExpiredHook>,
}

impl PanelClientBuilder {
    /// API base, scheme included, no trailing slash required
    /// (e.g. `https://panel.example.com`).
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.base_url = Some(base.trim_end_matches('/').to_string());
        self
    }

    /// Authenticate with admin credentials; the client logs in on first use
    /// and re-authenticates when the cached token ages out.
    pub fn login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(SessionConfig {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Use a pre-issued token instead of logging in. The token is never
    /// refreshed; an expiry signal clears it and fires the expiry hook.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Called exactly once per detected session expiry. The embedding
    /// application uses this to drop its stored credential and route the
    /// operator back to the login entry point.
    pub fn on_session_expired(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<PanelClient, PanelError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PanelError::Transport(e.to_string()))?;

        let session = match (self.login, self.token) {
            (Some(config), _) => Session::Login {
                config,
                cached: Mutex::new(None),
            },
            (None, token) => Session::Static {
                token: Mutex::new(token),
            },
        };

        Ok(PanelClient {
            http,
            base_url: self.base_url,
            session,
            expired_fired: AtomicBool::new(false),
            on_session_expired: self.on_session_expired,
        })
    }
}

impl PanelClient {
    pub fn builder() -> PanelClientBuilder {
        PanelClientBuilder {
            base_url: None,
            login: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            on_session_expired: None,
        }
    }

    /// Uniform entry point: always yields an envelope, never an `Err`.
    /// Transport failures, HTTP errors and missing configuration become
    /// failure envelopes carrying the diagnostic text; business failures come
    /// back exactly as the panel emitted them.
    pub async fn call(&self, endpoint: &str, payload: Value, method: Method) -> Envelope<Value> {
        match self.execute(endpoint, &payload, method, true).await {
            Ok(env) => env,
            Err(PanelError::AuthExpired) => {
                Envelope::failure(401, crate::error::SESSION_EXPIRED_PHRASES[0])
            }
            Err(e) => Envelope::failure(-1, e.to_string()),
        }
    }

    /// Typed calls for the resource methods: non-zero envelope codes become
    /// [`PanelError::Api`], success payloads are deserialized into `T`.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &impl Serialize,
        method: Method,
    ) -> Result<T, PanelError> {
        let payload =
            serde_json::to_value(payload).map_err(|e| PanelError::Transport(e.to_string()))?;
        let env = self.execute(endpoint, &payload, method, true).await?;
        if !env.is_success() {
            return Err(PanelError::Api {
                code: env.code,
                msg: env.msg,
            });
        }
        serde_json::from_value(env.data.unwrap_or(Value::Null))
            .map_err(|e| PanelError::Transport(format!("unexpected response shape: {e}")))
    }

    async fn execute(
        &self,
        endpoint: &str,
        payload: &Value,
        method: Method,
        auth_required: bool,
    ) -> Result<Envelope<Value>, PanelError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(PanelError::MissingConfig("panel address not set"))?;
        let url = format!("{base}{endpoint}");

        let mut req = match method {
            Method::Get => self.http.get(&url).query(payload),
            Method::Post => self.http.post(&url).json(payload),
        };

        if auth_required {
            let token = self.current_token().await?;
            req = req.header("Authorization", token);
        }

        debug!(endpoint, ?method, "panel request");

        let resp = req.send().await.map_err(|e| {
            warn!(endpoint, error = %e, "panel transport failure");
            PanelError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if status.as_u16() == 401 {
            // Login itself is unauthenticated; only an authenticated call can
            // expire the session (and re-entering the session lock from the
            // in-flight refresh would deadlock).
            if auth_required {
                self.invalidate_session().await;
            }
            return Err(PanelError::AuthExpired);
        }
        if !status.is_success() {
            return Err(PanelError::Http(status.as_u16()));
        }

        let env: Envelope<Value> = resp
            .json()
            .await
            .map_err(|e| PanelError::Transport(format!("invalid response body: {e}")))?;

        if is_session_expired(env.code, &env.msg) {
            if auth_required {
                self.invalidate_session().await;
            }
            return Err(PanelError::AuthExpired);
        }

        Ok(env)
    }

    async fn current_token(&self) -> Result<String, PanelError> {
        match &self.session {
            Session::Static { token } => token
                .lock()
                .await
                .clone()
                .ok_or(PanelError::MissingConfig("panel token not set")),
            Session::Login { config, cached } => {
                // Refresh happens under the cache lock: concurrent callers
                // that all observe a stale token share one login round-trip.
                let mut guard = cached.lock().await;
                if let Some(tok) = guard.as_ref() {
                    if tok.is_fresh_at(Utc::now()) {
                        return Ok(tok.token.clone());
                    }
                }
                let token = self
                    .login_raw(&config.username, &config.password)
                    .await?;
                *guard = Some(CachedToken::new(token.clone()));
                self.expired_fired.store(false, Ordering::SeqCst);
                Ok(token)
            }
        }
    }

    async fn login_raw(&self, username: &str, password: &str) -> Result<String, PanelError> {
        #[derive(Deserialize)]
        struct LoginData {
            token: String,
        }

        let payload = json!({ "username": username, "password": password });
        let env = Box::pin(self.execute(LOGIN_ENDPOINT, &payload, Method::Post, false)).await?;
        if !env.is_success() {
            return Err(PanelError::Api {
                code: env.code,
                msg: env.msg,
            });
        }
        let data: LoginData = serde_json::from_value(env.data.unwrap_or(Value::Null))
            .map_err(|_| PanelError::Transport("login response carried no token".into()))?;
        Ok(data.token)
    }

    /// Force authentication now instead of lazily on the first call. A no-op
    /// for static-token clients.
    pub async fn authenticate(&self) -> Result<(), PanelError> {
        if matches!(self.session, Session::Login { .. }) {
            self.current_token().await?;
        }
        Ok(())
    }

    /// Install a fresh pre-issued token (static-token clients), re-arming the
    /// expiry hook for the next expiry event.
    pub async fn set_token(&self, new_token: impl Into<String>) {
        if let Session::Static { token } = &self.session {
            *token.lock().await = Some(new_token.into());
            self.expired_fired.store(false, Ordering::SeqCst);
        }
    }

    async fn invalidate_session(&self) {
        self.session.clear().await;
        if !self.expired_fired.swap(true, Ordering::SeqCst) {
            warn!("panel session expired; credential cleared");
            if let Some(hook) = &self.on_session_expired {
                hook();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_base_url, PanelAddress};

    #[test]
    fn explicit_base_url_wins_and_is_trimmed() {
        let addrs = vec![PanelAddress {
            name: "main".into(),
            address: "http://injected".into(),
            inx: true,
        }];
        assert_eq!(
            resolve_base_url(Some("https://panel.example.com/"), &addrs).as_deref(),
            Some("https://panel.example.com")
        );
    }

    #[test]
    fn selected_injected_address_is_used_when_nothing_configured() {
        let addrs = vec![
            PanelAddress {
                name: "backup".into(),
                address: "http://backup.example.com".into(),
                inx: false,
            },
            PanelAddress {
                name: "main".into(),
                address: "http://main.example.com/".into(),
                inx: true,
            },
        ];
        assert_eq!(
            resolve_base_url(None, &addrs).as_deref(),
            Some("http://main.example.com")
        );
    }

    #[test]
    fn no_configuration_yields_none() {
        assert_eq!(resolve_base_url(Some("  "), &[]), None);
    }
}
