use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use palaver_types::models::Session;

/// State that outlives a login. Everything session-scoped lives only in
/// memory and dies with the session; this file keeps nothing but the
/// cosmetic bot avatar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistentState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bot_avatar_url: Option<String>,
}

/// Result of a best-effort logout. Failures clearing state are reported
/// here instead of propagated.
#[derive(Debug, Clone)]
pub struct LogoutOutcome {
    pub success: bool,
    pub message: String,
    pub code: u8,
}

/// Holds the single active session plus the small persistent state file.
/// At most one session is live at a time; setting a new one replaces the
/// old one.
pub struct SessionStore {
    session: Mutex<Option<Session>>,
    persistent: Mutex<PersistentState>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Open the store backed by a state file. Unknown keys found in the
    /// file (older layouts kept session fields there) are pruned on load
    /// and the file is rewritten with only what belongs in it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (persistent, needs_rewrite) = load_persistent(&path)?;
        info!("session store opened at {}", path.display());

        let store = Self {
            session: Mutex::new(None),
            persistent: Mutex::new(persistent),
            path: Some(path),
        };
        if needs_rewrite {
            store.save_persistent()?;
        }
        Ok(store)
    }

    /// Store without a backing file; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            session: Mutex::new(None),
            persistent: Mutex::new(PersistentState::default()),
            path: None,
        }
    }

    /// Install the active session, replacing any previous one.
    pub fn set_session(&self, session: Session) {
        debug!(user_id = %session.user_id, username = %session.username, "session installed");
        let mut guard = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session);
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_session(&self) {
        let mut guard = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn bot_avatar_url(&self) -> Option<String> {
        self.persistent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .bot_avatar_url
            .clone()
    }

    /// Remember the bot avatar across sessions.
    pub fn set_bot_avatar_url(&self, url: String) -> Result<()> {
        {
            let mut guard = self.persistent.lock().unwrap_or_else(|e| e.into_inner());
            guard.bot_avatar_url = Some(url);
        }
        self.save_persistent()
    }

    /// Best-effort teardown: clears the session, keeps the bot avatar.
    /// Never fails; problems are folded into the returned outcome.
    pub fn logout(&self) -> LogoutOutcome {
        self.clear_session();
        match self.save_persistent() {
            Ok(()) => {
                info!("logout successful, session state cleared");
                LogoutOutcome {
                    success: true,
                    message: "Logout successful".to_string(),
                    code: 0,
                }
            }
            Err(err) => {
                warn!("logout could not persist state: {err:#}");
                LogoutOutcome {
                    success: false,
                    message: "Logout failed. Please try again.".to_string(),
                    code: 1,
                }
            }
        }
    }

    fn save_persistent(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let state = self
            .persistent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write state file {}", path.display()))?;
        Ok(())
    }
}

fn load_persistent(path: &Path) -> Result<(PersistentState, bool)> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((PersistentState::default(), false));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read state file {}", path.display()));
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("state file {} is corrupt ({err}), starting fresh", path.display());
            return Ok((PersistentState::default(), true));
        }
    };

    let stale_keys = value
        .as_object()
        .map(|map| map.keys().any(|k| k != "bot_avatar_url"))
        .unwrap_or(true);
    if stale_keys {
        warn!("pruning stale keys from state file {}", path.display());
    }

    let bot_avatar_url = value
        .get("bot_avatar_url")
        .and_then(|v| v.as_str())
        .map(str::to_owned);
    Ok((PersistentState { bot_avatar_url }, stale_keys))
}
