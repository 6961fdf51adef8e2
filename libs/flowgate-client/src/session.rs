use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Admin credentials for a login-backed session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub username: String,
    pub password: String,
}

/// The panel issues tokens valid for 90 days; we treat them as stale one day
/// early so a token is never presented right at the issuer's deadline.
pub(crate) const TOKEN_VALIDITY_DAYS: i64 = 89;

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(token: String) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.obtained_at + Duration::days(TOKEN_VALIDITY_DAYS)
    }
}

/// Credential state behind a [`crate::PanelClient`].
///
/// `Login` re-authenticates on demand; the mutex both protects the cache and
/// serializes refresh, so concurrent callers that observe a stale token share
/// a single login round-trip. `Static` holds a pre-issued token that is only
/// ever cleared, never refreshed (the embedded-frontend deployment mode).
pub(crate) enum Session {
    Login {
        config: SessionConfig,
        cached: Mutex<Option<CachedToken>>,
    },
    Static {
        token: Mutex<Option<String>>,
    },
}

impl Session {
    pub async fn clear(&self) {
        match self {
            Session::Login { cached, .. } => *cached.lock().await = None,
            Session::Static { token } => *token.lock().await = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_fresh_within_the_validity_window() {
        let tok = CachedToken::new("t".into());
        assert!(tok.is_fresh_at(tok.obtained_at + Duration::days(1)));
        assert!(tok.is_fresh_at(tok.obtained_at + Duration::days(89)));
    }

    #[test]
    fn token_is_stale_past_89_days() {
        let tok = CachedToken::new("t".into());
        assert!(!tok.is_fresh_at(tok.obtained_at + Duration::days(89) + Duration::seconds(1)));
        assert!(!tok.is_fresh_at(tok.obtained_at + Duration::days(90)));
    }
}
