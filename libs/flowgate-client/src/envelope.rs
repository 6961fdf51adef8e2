use serde::{Deserialize, Serialize};

/// The uniform response wrapper every panel endpoint returns.
///
/// Code 0 is success. Failures produced locally (transport errors, missing
/// configuration) use code -1; authorization failures use code 401, matching
/// what the panel itself emits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// A locally-constructed failure envelope. `data` is always absent.
    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Envelope;
    use serde_json::Value;

    #[test]
    fn decodes_success_envelope() {
        let env: Envelope<Value> =
            serde_json::from_str(r#"{"code":0,"msg":"success","data":{"id":7}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.data.unwrap()["id"], 7);
    }

    #[test]
    fn tolerates_missing_msg_and_data() {
        let env: Envelope<Value> = serde_json::from_str(r#"{"code":0}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.msg, "");
        assert!(env.data.is_none());
    }

    #[test]
    fn failure_envelope_carries_message() {
        let env: Envelope<Value> = Envelope::failure(-1, "connection refused");
        assert!(!env.is_success());
        assert_eq!(env.msg, "connection refused");
        assert!(env.data.is_none());
    }
}
