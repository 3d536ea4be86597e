//! Chat view state. The controller owns the in-memory message list and the
//! sequenced send pipeline (sanitize, post, reload, synthetic reply); the
//! surrounding view only renders and forwards commands. Leaving the view
//! drops the controller, so a result arriving for a dropped view has
//! nothing left to write to.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use palaver_client::{ApiClient, ApiError};
use palaver_sanitize::{SanitizeError, sanitize, sanitize_submission};
use palaver_types::models::{BOT_AUTHOR_ID, Message, Session};

/// Delay before the canned bot reply appears under a sent message.
pub const BOT_REPLY_DELAY: Duration = Duration::from_millis(900);

const BOT_REPLY_TEXT: &str = "Auto-reply: thanks for your message!";

#[derive(Debug, Error)]
pub enum ChatError {
    /// The message sanitized to nothing; nothing was sent.
    #[error(transparent)]
    Rejected(#[from] SanitizeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no message at that position")]
    NoSuchMessage,

    /// Deletion of someone else's message (or a synthetic one) is not
    /// offered; reaching this means the caller bypassed `deletable`.
    #[error("only your own messages can be deleted")]
    NotDeletable,
}

pub struct ChatController {
    client: ApiClient,
    session: Session,
    bot_avatar_url: String,
    bot_reply_delay: Duration,
    messages: Vec<Message>,
}

impl ChatController {
    pub fn new(client: ApiClient, session: Session, bot_avatar_url: String) -> Self {
        Self {
            client,
            session,
            bot_avatar_url,
            bot_reply_delay: BOT_REPLY_DELAY,
            messages: Vec::new(),
        }
    }

    /// Tests shorten the reply delay to keep the pipeline sequenced but
    /// instant.
    pub fn with_bot_reply_delay(mut self, delay: Duration) -> Self {
        self.bot_reply_delay = delay;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn bot_avatar_url(&self) -> &str {
        &self.bot_avatar_url
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Fetch the message list. Every message is sanitized here, on render,
    /// regardless of what the server stored.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        let records = self.client.get_messages(&self.session.token).await?;
        debug!(count = records.len(), "messages loaded");
        self.messages = records
            .into_iter()
            .map(|r| {
                let html = sanitize(&r.text);
                Message {
                    id: r.id,
                    author_id: r.user_id,
                    raw_text: r.text,
                    html,
                    created_at: r.created_at,
                    synthetic: false,
                }
            })
            .collect();
        Ok(())
    }

    /// The send pipeline, in order: sanitize (a rejection stops everything
    /// before the network), post, reload, then the synthetic bot reply
    /// after the fixed delay.
    pub async fn send(&mut self, input: &str) -> Result<(), ChatError> {
        let clean = sanitize_submission(input)?;
        self.client
            .post_message(&self.session.token, &clean)
            .await?;
        self.load().await?;
        tokio::time::sleep(self.bot_reply_delay).await;
        self.messages.push(self.bot_reply());
        Ok(())
    }

    /// Whether deletion may be offered for the message at `index`.
    pub fn deletable(&self, index: usize) -> bool {
        self.messages
            .get(index)
            .map(|m| m.deletable_by(&self.session.user_id))
            .unwrap_or(false)
    }

    pub async fn delete(&mut self, index: usize) -> Result<(), ChatError> {
        let message = self.messages.get(index).ok_or(ChatError::NoSuchMessage)?;
        if !message.deletable_by(&self.session.user_id) {
            return Err(ChatError::NotDeletable);
        }
        self.client
            .delete_message(&self.session.token, &message.id)
            .await?;
        self.load().await?;
        Ok(())
    }

    fn bot_reply(&self) -> Message {
        let now = Utc::now();
        Message {
            id: format!("bot-{}", now.timestamp_millis()),
            author_id: BOT_AUTHOR_ID.to_string(),
            raw_text: BOT_REPLY_TEXT.to_string(),
            html: BOT_REPLY_TEXT.to_string(),
            created_at: now,
            synthetic: true,
        }
    }
}
