//! Login and registration flows. A session is written to the store only
//! after every step of the flow has succeeded; any failure leaves the
//! store untouched.

use tracing::{info, warn};

use palaver_client::{ApiClient, ApiError, jwt};
use palaver_session::SessionStore;
use palaver_session::avatar::{avatar_for_username, random_bot_avatar};
use palaver_types::api::Claims;
use palaver_types::models::Session;

/// Exchange credentials for a populated session. The subject id and
/// username come from the token's claims; the avatar from the user record,
/// with a deterministic fallback when the record has none.
pub async fn login(
    client: &ApiClient,
    store: &SessionStore,
    username: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let csrf_token = client.fetch_csrf().await?;
    let token = client.login(username, password, &csrf_token).await?;
    let claims = jwt::decode_claims(&token)?;

    let user_id = claims.resolved_user_id().unwrap_or_default().to_string();
    let username = claims
        .username
        .clone()
        .unwrap_or_else(|| username.to_string());
    let avatar_url = resolve_avatar(client, &token, &user_id, &claims, &username).await;

    let session = Session {
        user_id,
        username,
        token,
        csrf_token,
        avatar_url,
    };
    info!(user_id = %session.user_id, username = %session.username, "login succeeded");
    store.set_session(session.clone());
    Ok(session)
}

/// Create an account. Returns the avatar the server settled on (or the
/// generated one it was offered).
pub async fn register(
    client: &ApiClient,
    username: &str,
    password: &str,
    email: &str,
) -> Result<String, ApiError> {
    let csrf_token = client.fetch_csrf().await?;
    let avatar = avatar_for_username(username);
    let registered = client
        .register(username, password, email, &avatar, &csrf_token)
        .await?;
    info!(username, "registration succeeded");
    Ok(registered.and_then(|r| r.avatar).unwrap_or(avatar))
}

/// The bot's face: persisted once, reused across sessions.
pub fn ensure_bot_avatar(store: &SessionStore) -> String {
    if let Some(url) = store.bot_avatar_url() {
        return url;
    }
    let url = random_bot_avatar(&mut rand::rng());
    if let Err(err) = store.set_bot_avatar_url(url.clone()) {
        warn!("could not persist bot avatar: {err:#}");
    }
    url
}

async fn resolve_avatar(
    client: &ApiClient,
    token: &str,
    user_id: &str,
    claims: &Claims,
    username: &str,
) -> String {
    if !user_id.is_empty() {
        match client.get_user(token, user_id).await {
            Ok(record) => {
                if let Some(avatar) = record.avatar() {
                    return avatar.to_string();
                }
                if let Some(avatar) = claims.avatar.as_deref() {
                    return avatar.to_string();
                }
            }
            Err(err) => {
                warn!("user lookup failed, generating an avatar instead: {err}");
            }
        }
    }
    avatar_for_username(username)
}
