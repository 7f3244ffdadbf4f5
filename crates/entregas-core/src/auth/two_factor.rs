//! Email-code verification flow shared by login 2FA and registration.
//!
//! Time is always passed in, so the countdown and block window are
//! deterministic under test.

use chrono::{DateTime, Duration, Utc};
use entregas_types::CodeDelivery;

use crate::validation::validate_code;

/// Lifetime of a sent code.
pub const CODE_TTL_SECS: i64 = 600;
/// Resend block after too many attempts.
pub const BLOCK_SECS: i64 = 300;
pub const BLOCKED_MESSAGE: &str = "You exceeded the attempt limit. Try again in 5 minutes.";
const MAX_ATTEMPTS_REASON: &str = "max_attempts_exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPurpose {
    Login,
    Registration,
}

/// What the backend needs to accept a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorChallenge {
    pub email: String,
    pub device_id: String,
    pub device_name: String,
    pub device_type: String,
    /// Server expiry, informational only; the local countdown governs.
    pub expires_at: Option<String>,
    pub attempts_remaining: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    CodeSent,
    Verifying,
    Verified,
    Expired,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct TwoFactorFlow {
    purpose: FlowPurpose,
    challenge: TwoFactorChallenge,
    phase: FlowPhase,
    sent_at: Option<DateTime<Utc>>,
    blocked_until: Option<DateTime<Utc>>,
}

impl TwoFactorFlow {
    pub fn new(purpose: FlowPurpose, challenge: TwoFactorChallenge) -> Self {
        Self {
            purpose,
            challenge,
            phase: FlowPhase::Idle,
            sent_at: None,
            blocked_until: None,
        }
    }

    /// Flow whose first code was already sent at `now`.
    pub fn started(purpose: FlowPurpose, challenge: TwoFactorChallenge, now: DateTime<Utc>) -> Self {
        let mut flow = Self::new(purpose, challenge);
        flow.code_sent(now);
        flow
    }

    pub fn purpose(&self) -> FlowPurpose {
        self.purpose
    }

    pub fn challenge(&self) -> &TwoFactorChallenge {
        &self.challenge
    }

    pub fn email(&self) -> &str {
        &self.challenge.email
    }

    /// Phase after applying elapsed time.
    pub fn phase(&self, now: DateTime<Utc>) -> FlowPhase {
        match self.phase {
            FlowPhase::CodeSent if self.remaining_secs(now) == 0 => FlowPhase::Expired,
            FlowPhase::Blocked if !self.is_blocked(now) => FlowPhase::Expired,
            phase => phase,
        }
    }

    /// A new code went out: restart the countdown.
    pub fn code_sent(&mut self, now: DateTime<Utc>) {
        self.phase = FlowPhase::CodeSent;
        self.sent_at = Some(now);
        self.blocked_until = None;
    }

    /// Applies a (re)send reply. Returns `false` if it blocked the flow.
    pub fn apply_delivery(&mut self, delivery: &CodeDelivery, now: DateTime<Utc>) -> bool {
        if delivery.attempts_remaining.is_some() {
            self.challenge.attempts_remaining = delivery.attempts_remaining;
        }
        if delivery.expires_at.is_some() {
            self.challenge.expires_at.clone_from(&delivery.expires_at);
        }
        if delivery.reason.as_deref() == Some(MAX_ATTEMPTS_REASON)
            || delivery.attempts_remaining == Some(0)
        {
            self.block(now);
            return false;
        }
        if delivery.success != Some(false) {
            self.code_sent(now);
        }
        true
    }

    /// Seconds left on the current code, 0 when none is live.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let Some(sent_at) = self.sent_at else {
            return 0;
        };
        let deadline = sent_at + Duration::seconds(CODE_TTL_SECS);
        let left = (deadline - now).num_seconds();
        u64::try_from(left).unwrap_or(0)
    }

    fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        self.blocked_until
    }

    /// Verify is enabled only while a code is live.
    pub fn can_verify(&self, now: DateTime<Utc>) -> bool {
        self.phase(now) == FlowPhase::CodeSent
    }

    /// Resend is enabled once the countdown is over, outside a block,
    /// and while attempts remain.
    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        let phase = self.phase(now);
        matches!(phase, FlowPhase::Idle | FlowPhase::Expired)
            && !self.is_blocked(now)
            && self.challenge.attempts_remaining != Some(0)
    }

    /// Moves to `Verifying` with a well-formed code.
    ///
    /// # Errors
    /// Returns a user-facing message if the code is malformed or verification
    /// is not available right now.
    pub fn begin_verify(&mut self, code: &str, now: DateTime<Utc>) -> Result<(), &'static str> {
        validate_code(code)?;
        if !self.can_verify(now) {
            return Err(match self.phase(now) {
                FlowPhase::Blocked => BLOCKED_MESSAGE,
                FlowPhase::Verified => "This code was already verified.",
                FlowPhase::Verifying => "Verification already in progress.",
                _ => "The code expired. Request a new one.",
            });
        }
        self.phase = FlowPhase::Verifying;
        Ok(())
    }

    pub fn verified(&mut self) {
        self.phase = FlowPhase::Verified;
    }

    /// Backend rejected the code: back to waiting, or expired if time ran out.
    pub fn verify_rejected(&mut self, now: DateTime<Utc>) {
        self.phase = if self.remaining_secs(now) > 0 {
            FlowPhase::CodeSent
        } else {
            FlowPhase::Expired
        };
    }

    /// Blocks resends for [`BLOCK_SECS`]; the live code is abandoned.
    pub fn block(&mut self, now: DateTime<Utc>) {
        self.phase = FlowPhase::Blocked;
        self.blocked_until = Some(now + Duration::seconds(BLOCK_SECS));
        self.sent_at = None;
        // Server-side attempts reset once the block window passes.
        self.challenge.attempts_remaining = None;
    }

    /// Message explaining the current phase, if any.
    pub fn status_message(&self, now: DateTime<Utc>) -> Option<String> {
        match self.phase(now) {
            FlowPhase::Blocked => Some(BLOCKED_MESSAGE.to_string()),
            FlowPhase::Expired => Some("The code expired. Request a new one.".to_string()),
            FlowPhase::CodeSent => {
                let left = self.remaining_secs(now);
                Some(format!(
                    "Code sent to {}. Expires in {}:{:02}.",
                    self.challenge.email,
                    left / 60,
                    left % 60
                ))
            }
            FlowPhase::Idle | FlowPhase::Verifying | FlowPhase::Verified => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn challenge() -> TwoFactorChallenge {
        TwoFactorChallenge {
            email: "user@example.com".to_string(),
            device_id: "abc".to_string(),
            device_name: "laptop".to_string(),
            device_type: "desktop".to_string(),
            expires_at: None,
            attempts_remaining: Some(5),
        }
    }

    #[test]
    fn test_countdown_gates_verify_and_resend() {
        let flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());

        assert_eq!(flow.remaining_secs(t0()), 600);
        assert!(flow.can_verify(t0()));
        assert!(!flow.can_resend(t0()));

        let almost = t0() + Duration::seconds(599);
        assert_eq!(flow.remaining_secs(almost), 1);
        assert!(flow.can_verify(almost));
        assert!(!flow.can_resend(almost));

        let zero = t0() + Duration::seconds(600);
        assert_eq!(flow.remaining_secs(zero), 0);
        assert_eq!(flow.phase(zero), FlowPhase::Expired);
        assert!(!flow.can_verify(zero));
        assert!(flow.can_resend(zero));
    }

    #[test]
    fn test_new_code_reenables_verify() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Registration, challenge(), t0());
        let later = t0() + Duration::seconds(700);
        assert!(flow.can_resend(later));

        assert!(flow.apply_delivery(
            &CodeDelivery {
                success: Some(true),
                attempts_remaining: Some(4),
                ..Default::default()
            },
            later,
        ));

        assert!(flow.can_verify(later));
        assert!(!flow.can_resend(later));
        assert_eq!(flow.challenge().attempts_remaining, Some(4));
    }

    #[test]
    fn test_begin_verify_requires_six_digits() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());
        assert!(flow.begin_verify("12345", t0()).is_err());
        assert!(flow.begin_verify("abcdef", t0()).is_err());
        assert_eq!(flow.phase(t0()), FlowPhase::CodeSent);

        flow.begin_verify("123456", t0()).unwrap();
        assert_eq!(flow.phase(t0()), FlowPhase::Verifying);
        assert!(flow.begin_verify("123456", t0()).is_err());
    }

    #[test]
    fn test_begin_verify_after_expiry_fails() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());
        let late = t0() + Duration::seconds(601);
        assert!(flow.begin_verify("123456", late).is_err());
    }

    #[test]
    fn test_rejection_returns_to_code_sent_or_expired() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());
        flow.begin_verify("123456", t0()).unwrap();
        flow.verify_rejected(t0() + Duration::seconds(10));
        assert_eq!(flow.phase(t0() + Duration::seconds(10)), FlowPhase::CodeSent);

        flow.begin_verify("654321", t0() + Duration::seconds(20)).unwrap();
        flow.verify_rejected(t0() + Duration::seconds(650));
        assert_eq!(flow.phase(t0() + Duration::seconds(650)), FlowPhase::Expired);
    }

    #[test]
    fn test_max_attempts_blocks_for_five_minutes() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Registration, challenge(), t0());
        let resend_at = t0() + Duration::seconds(600);

        let accepted = flow.apply_delivery(
            &CodeDelivery {
                success: Some(false),
                reason: Some("max_attempts_exceeded".to_string()),
                ..Default::default()
            },
            resend_at,
        );

        assert!(!accepted);
        assert_eq!(flow.phase(resend_at), FlowPhase::Blocked);
        assert!(!flow.can_resend(resend_at));
        assert!(!flow.can_verify(resend_at));
        assert_eq!(flow.status_message(resend_at).as_deref(), Some(BLOCKED_MESSAGE));

        let still = resend_at + Duration::seconds(299);
        assert!(!flow.can_resend(still));

        let after = resend_at + Duration::seconds(300);
        assert!(flow.can_resend(after));
    }

    #[test]
    fn test_zero_attempts_blocks() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Registration, challenge(), t0());
        flow.apply_delivery(
            &CodeDelivery {
                success: Some(true),
                attempts_remaining: Some(0),
                ..Default::default()
            },
            t0(),
        );
        assert_eq!(flow.phase(t0()), FlowPhase::Blocked);
    }

    #[test]
    fn test_verified_is_terminal() {
        let mut flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());
        flow.begin_verify("123456", t0()).unwrap();
        flow.verified();
        assert_eq!(flow.phase(t0() + Duration::seconds(9999)), FlowPhase::Verified);
        assert!(!flow.can_resend(t0()));
        assert!(flow.begin_verify("123456", t0()).is_err());
    }

    #[test]
    fn test_status_message_countdown() {
        let flow = TwoFactorFlow::started(FlowPurpose::Login, challenge(), t0());
        let msg = flow.status_message(t0() + Duration::seconds(75)).unwrap();
        assert!(msg.ends_with("Expires in 8:45."), "{msg}");
    }
}
