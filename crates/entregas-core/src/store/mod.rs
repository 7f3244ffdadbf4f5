//! Token Store: persisted session tokens, cached user, lifecycle markers.
//!
//! Storage failures never escape. They are logged at `warn` and read as
//! "nothing stored". Every mutation bumps a revision published on a
//! `watch` channel so holders of in-memory session state can reconcile.

mod backend;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use entregas_types::User;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

pub const TOKEN_KEY: &str = "@Entregas:token";
pub const REFRESH_KEY: &str = "@Entregas:refresh";
pub const USER_KEY: &str = "@Entregas:user";
pub const APP_STATE_KEY: &str = "@Entregas:app_state";
pub const LEFT_FOREGROUND_KEY: &str = "@Entregas:left_foreground_at";
pub const DEVICE_ID_KEY: &str = "@Entregas:device_id";

/// Persisted token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access: String,
    pub refresh: Option<String>,
}

/// Partial token write: only `Some` fields are stored.
#[derive(Debug, Clone, Default)]
pub struct TokenUpdate {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Why the session was wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    SignOut,
    /// Backend answered 401.
    Unauthorized,
    /// Startup found a session the lifecycle rule does not trust.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    Updated,
    Cleared(ClearReason),
}

/// Last mutation. `revision` starts at 0 and only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub revision: u64,
    pub kind: StoreEventKind,
    /// Revision and reason of the most recent clear, kept across later
    /// writes so a clear is never hidden by an update.
    pub last_clear: Option<(u64, ClearReason)>,
}

/// Last recorded application lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Background,
    Terminated,
}

impl AppState {
    pub fn as_str(self) -> &'static str {
        match self {
            AppState::Active => "active",
            AppState::Background => "background",
            AppState::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AppState::Active),
            "background" | "inactive" => Some(AppState::Background),
            "terminated" => Some(AppState::Terminated),
            _ => None,
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Masks a token for display; never log a token in full.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

struct Inner {
    backend: Arc<dyn StorageBackend>,
    events: watch::Sender<StoreEvent>,
}

/// Cheaply cloneable handle; clones share backend and event channel.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (events, _) = watch::channel(StoreEvent {
            revision: 0,
            kind: StoreEventKind::Updated,
            last_clear: None,
        });
        Self {
            inner: Arc::new(Inner { backend, events }),
        }
    }

    /// Store backed by `<ENTREGAS_HOME>/storage.json`.
    pub fn open_default() -> Self {
        Self::new(Arc::new(FileBackend::default_location()))
    }

    /// Ephemeral store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.inner.events.borrow().revision
    }

    pub fn last_event(&self) -> StoreEvent {
        *self.inner.events.borrow()
    }

    /// Stored tokens, if an access token is present.
    pub fn get(&self) -> Option<StoredTokens> {
        let access = self.read(TOKEN_KEY).filter(|t| !t.is_empty())?;
        Some(StoredTokens {
            access,
            refresh: self.read(REFRESH_KEY).filter(|t| !t.is_empty()),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set(&self, update: TokenUpdate) {
        if let Some(access) = update.access.as_deref() {
            debug!(token = %mask_token(access), "storing access token");
            self.write(TOKEN_KEY, access);
        }
        if let Some(refresh) = update.refresh.as_deref() {
            self.write(REFRESH_KEY, refresh);
        }
        self.publish(StoreEventKind::Updated);
    }

    /// Cached user. A corrupt entry reads as absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("ignoring unparseable cached user: {e}");
                None
            }
        }
    }

    pub fn set_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.write(USER_KEY, &raw),
            Err(e) => warn!("failed to serialize user for storage: {e}"),
        }
        self.publish(StoreEventKind::Updated);
    }

    /// Removes token, refresh token and user. Safe to call repeatedly.
    pub fn clear(&self, reason: ClearReason) {
        for key in [TOKEN_KEY, REFRESH_KEY, USER_KEY] {
            self.remove(key);
        }
        debug!(?reason, "session storage cleared");
        self.publish(StoreEventKind::Cleared(reason));
    }

    pub fn app_state(&self) -> Option<AppState> {
        self.read(APP_STATE_KEY).as_deref().and_then(AppState::parse)
    }

    pub fn set_app_state(&self, state: AppState) {
        self.write(APP_STATE_KEY, state.as_str());
    }

    pub fn left_foreground_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.read(LEFT_FOREGROUND_KEY)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }

    pub fn set_left_foreground_at(&self, at: DateTime<Utc>) {
        self.write(LEFT_FOREGROUND_KEY, &at.to_rfc3339());
    }

    /// Stable per-install identifier; generated and persisted on first use.
    pub fn device_id(&self) -> String {
        if let Some(id) = self.read(DEVICE_ID_KEY).filter(|id| !id.trim().is_empty()) {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.write(DEVICE_ID_KEY, &id);
        id
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.inner.backend.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("storage read of {key} failed: {e:#}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.backend.set_item(key, value) {
            warn!("storage write of {key} failed: {e:#}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.inner.backend.remove_item(key) {
            warn!("storage removal of {key} failed: {e:#}");
        }
    }

    fn publish(&self, kind: StoreEventKind) {
        self.inner.events.send_modify(|event| {
            event.revision += 1;
            event.kind = kind;
            if let StoreEventKind::Cleared(reason) = kind {
                event.last_clear = Some((event.revision, reason));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, bail};

    use super::*;

    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            bail!("disk on fire")
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("disk on fire")
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            bail!("disk on fire")
        }
    }

    #[test]
    fn test_set_then_get() {
        let store = TokenStore::in_memory();
        assert!(store.get().is_none());

        store.set(TokenUpdate {
            access: Some("access-1".to_string()),
            refresh: Some("refresh-1".to_string()),
        });

        assert_eq!(
            store.get(),
            Some(StoredTokens {
                access: "access-1".to_string(),
                refresh: Some("refresh-1".to_string())
            })
        );
    }

    #[test]
    fn test_partial_update_keeps_refresh() {
        let store = TokenStore::in_memory();
        store.set(TokenUpdate {
            access: Some("a1".to_string()),
            refresh: Some("r1".to_string()),
        });
        store.set(TokenUpdate {
            access: Some("a2".to_string()),
            refresh: None,
        });
        let tokens = store.get().unwrap();
        assert_eq!(tokens.access, "a2");
        assert_eq!(tokens.refresh.as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_is_idempotent_and_keeps_device_id() {
        let store = TokenStore::in_memory();
        let device = store.device_id();
        store.set(TokenUpdate {
            access: Some("a".to_string()),
            refresh: None,
        });
        store.set_user(&User {
            email: "user@example.com".to_string(),
            ..Default::default()
        });

        store.clear(ClearReason::SignOut);
        store.clear(ClearReason::SignOut);

        assert!(store.get().is_none());
        assert!(store.user().is_none());
        assert_eq!(store.device_id(), device);
    }

    #[test]
    fn test_mutations_publish_revisions() {
        let store = TokenStore::in_memory();
        let rx = store.subscribe();
        assert_eq!(store.revision(), 0);

        store.set(TokenUpdate {
            access: Some("a".to_string()),
            refresh: None,
        });
        store.clear(ClearReason::Unauthorized);

        let event = *rx.borrow();
        assert_eq!(event.revision, 2);
        assert_eq!(
            event.kind,
            StoreEventKind::Cleared(ClearReason::Unauthorized)
        );
    }

    #[test]
    fn test_last_clear_survives_later_writes() {
        let store = TokenStore::in_memory();
        assert_eq!(store.last_event().last_clear, None);

        store.clear(ClearReason::Unauthorized);
        store.set_user(&User::default());

        let event = store.last_event();
        assert_eq!(event.kind, StoreEventKind::Updated);
        assert_eq!(event.last_clear, Some((1, ClearReason::Unauthorized)));
    }

    #[test]
    fn test_backend_failures_read_as_empty() {
        let store = TokenStore::new(Arc::new(BrokenBackend));
        store.set(TokenUpdate {
            access: Some("a".to_string()),
            refresh: None,
        });
        assert!(store.get().is_none());
        assert!(store.user().is_none());
        store.clear(ClearReason::SignOut);
        assert!(!store.device_id().is_empty());
    }

    #[test]
    fn test_corrupt_user_reads_as_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_item(USER_KEY, "{oops").unwrap();
        let store = TokenStore::new(backend);
        assert!(store.user().is_none());
    }

    #[test]
    fn test_lifecycle_markers_round_trip() {
        let store = TokenStore::in_memory();
        let at = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.set_app_state(AppState::Background);
        store.set_left_foreground_at(at);
        assert_eq!(store.app_state(), Some(AppState::Background));
        assert_eq!(store.left_foreground_at(), Some(at));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("abcdefghijklmnopqrstuvwxyz"), "abcdefghijkl...");
    }
}
