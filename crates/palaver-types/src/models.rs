use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author id the client stamps on locally synthesized bot replies.
pub const BOT_AUTHOR_ID: &str = "support-bot";

/// The single active login. Created on successful login, dropped on logout.
/// All ids and tokens are opaque strings issued by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub token: String,
    pub csrf_token: String,
    pub avatar_url: String,
}

impl Session {
    /// A session counts as live only when both credentials are non-empty.
    pub fn has_credentials(&self) -> bool {
        !self.token.is_empty() && !self.csrf_token.is_empty()
    }
}

/// A message as held for rendering. `html` is the sanitized form of
/// `raw_text` and is the only thing ever displayed; once set it is not
/// recomputed.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub raw_text: String,
    pub html: String,
    pub created_at: DateTime<Utc>,
    /// Locally manufactured bot reply — never persisted server-side.
    pub synthetic: bool,
}

impl Message {
    /// Deletion is offered only to the author, and never for synthetic
    /// replies (the remote API has no record of those).
    pub fn deletable_by(&self, user_id: &str) -> bool {
        !self.synthetic && self.author_id == user_id
    }
}
