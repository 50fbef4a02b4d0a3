use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::repo_types::PublicUser;

/// Keeps an explicit `null` as `Some(Value::Null)` so it is told apart from a
/// missing field.
fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

/// Request body for registration and login. Fields stay raw JSON so that a
/// missing or mistyped field surfaces as a validation error on that field.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<Value>,
}

/// Request body for a password change.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, deserialize_with = "present")]
    pub current_password: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub new_password: Option<Value>,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_fields_differ() {
        let body: CredentialsRequest =
            serde_json::from_str(r#"{"email": null}"#).expect("parse");
        assert_eq!(body.email, Some(Value::Null));
        assert!(body.password.is_none());
    }

    #[test]
    fn mistyped_field_still_parses() {
        let body: CredentialsRequest =
            serde_json::from_str(r#"{"email": 12345678, "password": "secret123"}"#)
                .expect("parse");
        assert_eq!(body.email, Some(serde_json::json!(12345678)));
    }
}
