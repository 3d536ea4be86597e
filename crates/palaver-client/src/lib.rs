//! Async client for the remote chat API. One method per route; every
//! authenticated call carries the session's bearer token. No retries and no
//! client-side timeouts: the transport's own error surface is the failure
//! model.

pub mod error;
pub mod jwt;

pub use error::ApiError;

use reqwest::{Response, header};
use tracing::{debug, error};

use palaver_types::api::{
    CsrfResponse, ErrorBody, MessageRecord, MessagesResponse, RegisterRequest, RegisterResponse,
    RegisteredUser, SendMessageRequest, SendMessageResponse, TokenRequest, TokenResponse,
    UserRecord,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// `PATCH /csrf` — fetch the anti-forgery marker echoed back on
    /// state-changing requests.
    pub async fn fetch_csrf(&self) -> Result<String, ApiError> {
        const ACTION: &str = "csrf fetch";
        let resp = self
            .http
            .patch(self.url("/csrf"))
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        let body: CsrfResponse = parse(ACTION, resp).await?;
        body.csrf_token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Incomplete { action: ACTION })
    }

    /// `POST /auth/register` — create an account. Returns the registered
    /// user record when the server echoes one (it carries the avatar the
    /// server settled on).
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
        avatar: &str,
        csrf_token: &str,
    ) -> Result<Option<RegisteredUser>, ApiError> {
        const ACTION: &str = "registration";
        let req = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            avatar: avatar.to_string(),
            csrf_token: csrf_token.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .json(&req)
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        let body: RegisterResponse = parse(ACTION, resp).await?;
        Ok(body.register_user)
    }

    /// `POST /auth/token` — exchange credentials for a bearer token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        csrf_token: &str,
    ) -> Result<String, ApiError> {
        const ACTION: &str = "login";
        let req = TokenRequest {
            username: username.to_string(),
            password: password.to_string(),
            csrf_token: csrf_token.to_string(),
        };
        let resp = self
            .http
            .post(self.url("/auth/token"))
            .json(&req)
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        let body: TokenResponse = parse(ACTION, resp).await?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Incomplete { action: ACTION })
    }

    /// `GET /users/{id}` — user record, possibly carrying an avatar.
    pub async fn get_user(&self, token: &str, user_id: &str) -> Result<UserRecord, ApiError> {
        const ACTION: &str = "user fetch";
        let resp = self
            .http
            .get(self.url(&format!("/users/{user_id}")))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        parse(ACTION, resp).await
    }

    /// `GET /messages` — the full message list for this user.
    pub async fn get_messages(&self, token: &str) -> Result<Vec<MessageRecord>, ApiError> {
        const ACTION: &str = "message fetch";
        let resp = self
            .http
            .get(self.url("/messages"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        let body: MessagesResponse = parse(ACTION, resp).await?;
        Ok(body.into_records())
    }

    /// `POST /messages` — store a message; returns the id the server
    /// assigned when it reports one.
    pub async fn post_message(&self, token: &str, text: &str) -> Result<Option<String>, ApiError> {
        const ACTION: &str = "message send";
        let req = SendMessageRequest { text: text.to_string() };
        let resp = self
            .http
            .post(self.url("/messages"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .json(&req)
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        let resp = check(ACTION, resp).await?;
        let body: SendMessageResponse = parse(ACTION, resp).await?;
        Ok(body.latest_message.and_then(|m| m.id))
    }

    /// `DELETE /messages/{id}` — remove an owned message. The server is
    /// the authority on ownership and rejects anyone else's id.
    pub async fn delete_message(&self, token: &str, message_id: &str) -> Result<(), ApiError> {
        const ACTION: &str = "message delete";
        let resp = self
            .http
            .delete(self.url(&format!("/messages/{message_id}")))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|source| ApiError::Network { action: ACTION, source })?;
        check(ACTION, resp).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pass 2xx through, turn anything else into a status error carrying the
/// server's message when the error body parses.
async fn check(action: &'static str, resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        debug!(action, status = status.as_u16(), "remote API call succeeded");
        return Ok(resp);
    }
    let message = resp.json::<ErrorBody>().await.ok().and_then(|b| b.message);
    error!(
        action,
        status = status.as_u16(),
        message = message.as_deref().unwrap_or(""),
        "remote API call failed"
    );
    Err(ApiError::Status {
        action,
        status: status.as_u16(),
        message,
    })
}

async fn parse<T: serde::de::DeserializeOwned>(
    action: &'static str,
    resp: Response,
) -> Result<T, ApiError> {
    resp.json()
        .await
        .map_err(|source| ApiError::Network { action, source })
}
