use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod naming;
pub use naming::{BACKUP_MARKER, TIMESTAMP_FORMAT};

/// Value returned in place of a stored API key.
pub const API_KEY_MASK: &str = "*****";

/// Access level of an account.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// Account as seen by callers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Stored half of a [`User`]; the email is the table key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub password: String,
    pub role: Role,
}

/// Persisted users, keyed by email.
pub type UserTable = BTreeMap<String, UserRecord>;

/// The single settings record.
///
/// `api_key` and `model` are the fields the agent reads; anything else posted
/// by a client is kept verbatim in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Non-blank API key, if one is stored.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// Non-blank model name, if one is stored.
    pub fn model(&self) -> Option<&str> {
        non_blank(self.model.as_deref())
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_keep_unknown_keys() {
        let raw = r#"{"api_key":"sk-1","model":"m","theme":"dark","limit":3}"#;
        let s: Settings = serde_json::from_str(raw).unwrap();
        assert_eq!(s.api_key(), Some("sk-1"));
        assert_eq!(s.extra.get("theme"), Some(&Value::from("dark")));

        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["limit"], Value::from(3));
        assert_eq!(back["model"], Value::from("m"));
    }

    #[test]
    fn blank_fields_count_as_unset() {
        let s = Settings {
            api_key: Some("  ".into()),
            model: Some(String::new()),
            extra: Map::new(),
        };
        assert_eq!(s.api_key(), None);
        assert_eq!(s.model(), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        let rec = UserRecord { password: "pw".into(), role: Role::Admin };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["role"], "admin");
    }
}
