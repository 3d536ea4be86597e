use palaver_types::models::Session;

use crate::store::SessionStore;

/// Navigable views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Chat,
}

/// Outcome of a navigation check. Resolution is synchronous: the store is
/// inspected at check time and the answer is final for this navigation; no
/// asynchronous validation happens.
#[derive(Debug, Clone)]
pub enum Access {
    /// Protected view may render with this session.
    Granted(Session),
    /// Entry view may render.
    Continue,
    /// Caller must navigate to the given route instead.
    Redirect(Route),
}

/// Decides, per navigation, whether the caller holds a valid-looking
/// credential pair. No expiry check happens here: an expired token is only
/// discovered when a later network call fails.
pub struct SessionGuard<'a> {
    store: &'a SessionStore,
}

impl<'a> SessionGuard<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// True iff both the bearer token and the csrf marker are present and
    /// non-empty.
    pub fn is_authenticated(&self) -> bool {
        self.store
            .session()
            .map(|s| s.has_credentials())
            .unwrap_or(false)
    }

    /// For protected views: the active session, or a redirect to login.
    pub fn require_authenticated(&self) -> Access {
        match self.store.session() {
            Some(session) if session.has_credentials() => Access::Granted(session),
            _ => Access::Redirect(Route::Login),
        }
    }

    /// For entry views: sends already-authenticated callers to the chat.
    pub fn require_unauthenticated(&self) -> Access {
        if self.is_authenticated() {
            Access::Redirect(Route::Chat)
        } else {
            Access::Continue
        }
    }

    /// Apply the right check for a route.
    pub fn check(&self, route: Route) -> Access {
        match route {
            Route::Chat => self.require_authenticated(),
            Route::Login | Route::Register => self.require_unauthenticated(),
        }
    }
}
