//! Authentication: session controller, two-factor flow, startup restore.

mod lifecycle;
mod session;
mod two_factor;

pub use lifecycle::{LifecycleRecorder, RestoreDecision, restore_decision};
pub use session::{
    AuthFailure, AuthSession, RestoreOutcome, SessionPhase, SessionSettings, SessionState,
    SignInOutcome, SignUpOutcome, VerifyOutcome,
};
pub use two_factor::{
    BLOCK_SECS, BLOCKED_MESSAGE, CODE_TTL_SECS, FlowPhase, FlowPurpose, TwoFactorChallenge,
    TwoFactorFlow,
};
