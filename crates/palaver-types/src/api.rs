//! Wire types for the remote chat API. Field names follow the service's
//! JSON contract verbatim, hence the camelCase renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT claims --

/// Claims carried in the bearer token. The service has shipped several
/// claim layouts for the subject id over time, so all known spellings are
/// kept and resolved through [`Claims::resolved_user_id`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

impl Claims {
    /// Subject id under whichever name the token used: `userId`, `sub`, `id`.
    pub fn resolved_user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.sub.as_deref())
            .or(self.id.as_deref())
            .filter(|s| !s.is_empty())
    }
}

// -- CSRF --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

// -- Auth --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub avatar: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub register_user: Option<RegisteredUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

// -- Users --

/// User record; the avatar has appeared both at the top level and nested
/// under `user` depending on the endpoint revision.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserRecord {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub user: Option<NestedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedUser {
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserRecord {
    pub fn avatar(&self) -> Option<&str> {
        self.avatar
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.avatar.as_deref()))
    }
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// `GET /messages` has returned both a bare array and an object wrapping
/// one; both shapes deserialize here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessagesResponse {
    List(Vec<MessageRecord>),
    Wrapped { messages: Vec<MessageRecord> },
}

impl MessagesResponse {
    pub fn into_records(self) -> Vec<MessageRecord> {
        match self {
            Self::List(records) => records,
            Self::Wrapped { messages } => messages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMessage {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    #[serde(default)]
    pub latest_message: Option<LatestMessage>,
}

/// Error body the service attaches to non-2xx responses when it has
/// something to say.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_prefer_user_id_over_sub() {
        let claims: Claims =
            serde_json::from_str(r#"{"userId":"u7","sub":"s1","username":"alice"}"#).unwrap();
        assert_eq!(claims.resolved_user_id(), Some("u7"));
    }

    #[test]
    fn claims_fall_back_to_sub_then_id() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"s1","id":"i1"}"#).unwrap();
        assert_eq!(claims.resolved_user_id(), Some("s1"));
        let claims: Claims = serde_json::from_str(r#"{"id":"i1"}"#).unwrap();
        assert_eq!(claims.resolved_user_id(), Some("i1"));
    }

    #[test]
    fn claims_ignore_empty_subject() {
        let claims: Claims = serde_json::from_str(r#"{"sub":""}"#).unwrap();
        assert_eq!(claims.resolved_user_id(), None);
    }

    #[test]
    fn messages_accept_both_shapes() {
        let bare = r#"[{"id":"1","text":"hi","userId":"u1","createdAt":"2025-05-01T10:00:00Z"}]"#;
        let wrapped = format!(r#"{{"messages":{bare}}}"#);
        let a: MessagesResponse = serde_json::from_str(bare).unwrap();
        let b: MessagesResponse = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(a.into_records().len(), 1);
        assert_eq!(b.into_records()[0].user_id, "u1");
    }

    #[test]
    fn user_record_avatar_fallback() {
        let top: UserRecord = serde_json::from_str(r#"{"avatar":"a.png"}"#).unwrap();
        assert_eq!(top.avatar(), Some("a.png"));
        let nested: UserRecord = serde_json::from_str(r#"{"user":{"avatar":"b.png"}}"#).unwrap();
        assert_eq!(nested.avatar(), Some("b.png"));
        let none: UserRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(none.avatar(), None);
    }
}
