use thiserror::Error;

/// Failure taxonomy for panel calls.
///
/// Each variant maps to a distinct handling policy: transport and HTTP
/// failures are opaque and left for the caller to retry at its own level,
/// business failures carry the panel's message through unchanged, and
/// [`PanelError::AuthExpired`] is the one class that mutates client state
/// (the cached credential is cleared and the expiry hook fires).
#[derive(Debug, Error)]
pub enum PanelError {
    /// DNS, connect or timeout failure before an HTTP response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The panel answered with a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// In-envelope business failure (non-zero code). The message is the
    /// panel's own wording, passed through verbatim.
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// The session token was rejected as expired or invalid.
    #[error("session expired")]
    AuthExpired,

    /// A required piece of configuration (base URL, credentials, token) is
    /// absent.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// The exact "session expired" message strings the panel is known to emit
/// alongside envelope code 401.
///
/// Matching is deliberately exact: a new phrasing added server-side falls
/// through to a plain business failure instead of clearing the credential.
/// Keep this list in sync with the panel's auth middleware.
pub const SESSION_EXPIRED_PHRASES: [&str; 3] = [
    "未登录或token已过期",
    "无效的token或token已过期",
    "无法获取用户权限信息",
];

/// Classifies an envelope as an authorization-expiry signal.
///
/// This is the single place the whitelist is consulted; swap the strategy
/// here (e.g. for a structured error code) without touching callers.
pub fn is_session_expired(code: i64, msg: &str) -> bool {
    code == 401 && SESSION_EXPIRED_PHRASES.contains(&msg)
}

#[cfg(test)]
mod tests {
    use super::{is_session_expired, SESSION_EXPIRED_PHRASES};

    #[test]
    fn known_phrases_classify_as_expired() {
        for phrase in SESSION_EXPIRED_PHRASES {
            assert!(is_session_expired(401, phrase));
        }
    }

    #[test]
    fn unknown_phrase_is_not_expired() {
        assert!(!is_session_expired(401, "token has expired"));
        assert!(!is_session_expired(401, ""));
    }

    #[test]
    fn non_401_code_is_not_expired_even_with_known_phrase() {
        assert!(!is_session_expired(403, SESSION_EXPIRED_PHRASES[0]));
        assert!(!is_session_expired(0, SESSION_EXPIRED_PHRASES[1]));
    }
}
