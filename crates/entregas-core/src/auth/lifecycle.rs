//! Startup trust decision for a persisted session.
//!
//! The last run records whether it ended in the foreground, in the
//! background or terminated, and when it left the foreground. A session is
//! kept only if that run went to the background within the grace window.
//! This is a client-side heuristic; server-side token expiry still applies.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::RestorePolicy;
use crate::store::{AppState, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDecision {
    Keep,
    /// Stored session is discarded.
    Expire,
}

/// Pure decision over the recorded markers.
pub fn restore_decision(
    policy: RestorePolicy,
    last_state: Option<AppState>,
    left_foreground_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> RestoreDecision {
    if policy == RestorePolicy::Always {
        return RestoreDecision::Keep;
    }

    match (last_state, left_foreground_at) {
        (Some(AppState::Background), Some(left_at)) => {
            let Ok(elapsed) = (now - left_at).to_std() else {
                // Timestamp in the future: clock moved, do not trust it.
                return RestoreDecision::Expire;
            };
            if elapsed < grace {
                RestoreDecision::Keep
            } else {
                RestoreDecision::Expire
            }
        }
        _ => RestoreDecision::Expire,
    }
}

/// Writes lifecycle markers to the store.
#[derive(Debug, Clone)]
pub struct LifecycleRecorder {
    store: TokenStore,
}

impl LifecycleRecorder {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    pub fn record_foreground(&self) {
        self.store.set_app_state(AppState::Active);
    }

    pub fn record_background(&self, now: DateTime<Utc>) {
        self.store.set_app_state(AppState::Background);
        self.store.set_left_foreground_at(now);
    }

    pub fn record_terminated(&self) {
        self.store.set_app_state(AppState::Terminated);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as Delta;

    use super::*;

    const GRACE: Duration = Duration::from_secs(300);

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_recent_background_keeps_session() {
        let decision = restore_decision(
            RestorePolicy::Lifecycle,
            Some(AppState::Background),
            Some(t0()),
            t0() + Delta::seconds(299),
            GRACE,
        );
        assert_eq!(decision, RestoreDecision::Keep);
    }

    #[test]
    fn test_background_past_grace_expires() {
        let decision = restore_decision(
            RestorePolicy::Lifecycle,
            Some(AppState::Background),
            Some(t0()),
            t0() + Delta::seconds(300),
            GRACE,
        );
        assert_eq!(decision, RestoreDecision::Expire);
    }

    #[test]
    fn test_terminated_or_unknown_expires() {
        for state in [Some(AppState::Terminated), Some(AppState::Active), None] {
            let decision =
                restore_decision(RestorePolicy::Lifecycle, state, Some(t0()), t0(), GRACE);
            assert_eq!(decision, RestoreDecision::Expire, "state {state:?}");
        }
        let no_timestamp = restore_decision(
            RestorePolicy::Lifecycle,
            Some(AppState::Background),
            None,
            t0(),
            GRACE,
        );
        assert_eq!(no_timestamp, RestoreDecision::Expire);
    }

    #[test]
    fn test_future_timestamp_expires() {
        let decision = restore_decision(
            RestorePolicy::Lifecycle,
            Some(AppState::Background),
            Some(t0() + Delta::seconds(60)),
            t0(),
            GRACE,
        );
        assert_eq!(decision, RestoreDecision::Expire);
    }

    #[test]
    fn test_always_policy_keeps() {
        let decision = restore_decision(
            RestorePolicy::Always,
            Some(AppState::Terminated),
            None,
            t0(),
            GRACE,
        );
        assert_eq!(decision, RestoreDecision::Keep);
    }

    #[test]
    fn test_recorder_writes_markers() {
        let store = TokenStore::in_memory();
        let recorder = LifecycleRecorder::new(store.clone());

        recorder.record_foreground();
        assert_eq!(store.app_state(), Some(AppState::Active));

        recorder.record_background(t0());
        assert_eq!(store.app_state(), Some(AppState::Background));
        assert_eq!(store.left_foreground_at(), Some(t0()));

        recorder.record_terminated();
        assert_eq!(store.app_state(), Some(AppState::Terminated));
    }
}
