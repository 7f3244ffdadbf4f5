//! Auth Session Controller.
//!
//! Owns the in-memory session (`phase`, `user`, `token`, `loading`) and
//! publishes it on a `watch` channel. The persisted copy lives in the
//! [`TokenStore`]; a `Cleared` store event seen on the next access (for
//! example a 401 from another request) resets the in-memory session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use entregas_types::{CodeDelivery, LoginResponse, RegisterResponse, TwoFactorStatus, User};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::lifecycle::{LifecycleRecorder, RestoreDecision, restore_decision};
use super::two_factor::{FlowPurpose, TwoFactorChallenge, TwoFactorFlow, BLOCKED_MESSAGE};
use crate::config::{Config, RestorePolicy};
use crate::errors::{ApiError, ApiResult, GENERIC_MESSAGE, normalize_error};
use crate::http::ApiClient;
use crate::store::{ClearReason, TokenStore, TokenUpdate};
use crate::validation::{
    FieldErrors, LoginForm, PasswordChangeForm, ProfileForm, RegistrationForm, validate_code,
    validate_email,
};

const LOGIN_PATH: &str = "/api/auth/login/";
const LOGIN_2FA_PATH: &str = "/api/auth/login/2fa/";
const REGISTER_PATH: &str = "/api/auth/register/";
const REGISTER_VERIFY_PATH: &str = "/api/auth/register/verify/";
const REGISTER_RESEND_PATH: &str = "/api/auth/register/resend/";
const PROFILE_PATH: &str = "/api/auth/profile/";
const CHANGE_PASSWORD_PATH: &str = "/api/usuarios/change-password/";
const PASSWORD_RESET_PATH: &str = "/api/auth/password/reset/";
const TWO_FACTOR_STATUS_PATH: &str = "/api/auth/2fa/status/";
const TWO_FACTOR_SETUP_PATH: &str = "/api/auth/2fa/setup/";
const TWO_FACTOR_ENABLE_PATH: &str = "/api/auth/2fa/verify/";
const TWO_FACTOR_DISABLE_PATH: &str = "/api/auth/2fa/disable/";
const TWO_FACTOR_RESEND_PATH: &str = "/api/auth/2fa/resend/";
const VERIFICATION_METHOD: &str = "email";
const MAX_ATTEMPTS_REASON: &str = "max_attempts_exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    LoggedOut,
    Authenticating,
    /// Password accepted, email code pending. No token yet.
    Awaiting2FA,
    LoggedIn,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
}

impl SessionState {
    pub fn signed(&self) -> bool {
        self.token.is_some()
    }
}

/// Structured failure: a display message plus per-field messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthFailure {
    pub message: String,
    pub fields: FieldErrors,
    /// The backend answered 401.
    pub unauthorized: bool,
}

impl AuthFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    fn invalid(fields: FieldErrors) -> Self {
        Self {
            message: fields
                .first_message()
                .unwrap_or("Check the highlighted fields")
                .to_string(),
            fields,
            unauthorized: false,
        }
    }

    fn from_api(err: &ApiError) -> Self {
        Self {
            message: err.user_message(),
            fields: err.field_errors(),
            unauthorized: err.is_unauthorized(),
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    SignedIn(User),
    /// Caller must collect the emailed code; the session is not signed yet.
    TwoFactorRequired(TwoFactorChallenge),
    Failed(AuthFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created; an email code must be confirmed.
    VerificationRequired(TwoFactorChallenge),
    SignedIn(User),
    /// Account created and usable; sign in separately.
    Registered { message: String },
    Failed(AuthFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    SignedIn(User),
    /// Code accepted but no session issued.
    Verified { message: String },
    Rejected(AuthFailure),
    Blocked { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Stored session kept; user may be absent if the cache was lost.
    Restored(Option<User>),
    NoSession,
    /// Stored session discarded by the lifecycle rule.
    Expired,
}

/// Controller settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub restore_policy: RestorePolicy,
    pub background_grace: Duration,
    pub device_name: String,
    pub device_type: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            restore_policy: config.session.restore_policy,
            background_grace: config.session.background_grace(),
            device_name: config.device.effective_name(),
            device_type: config.device.kind.clone(),
        }
    }
}

#[derive(Debug)]
pub struct AuthSession {
    api: ApiClient,
    store: TokenStore,
    settings: SessionSettings,
    state: watch::Sender<SessionState>,
    seen_revision: AtomicU64,
}

impl AuthSession {
    pub fn new(api: ApiClient, settings: SessionSettings) -> Self {
        let store = api.store().clone();
        let seen = store.revision();
        let (state, _) = watch::channel(SessionState {
            loading: true,
            ..SessionState::default()
        });
        Self {
            api,
            store,
            settings,
            state,
            seen_revision: AtomicU64::new(seen),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn lifecycle(&self) -> LifecycleRecorder {
        LifecycleRecorder::new(self.store.clone())
    }

    /// Current session after applying pending store events.
    pub fn state(&self) -> SessionState {
        self.reconcile();
        self.state.borrow().clone()
    }

    pub fn signed(&self) -> bool {
        self.reconcile();
        self.state.borrow().signed()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    /// Receives every state change made through this controller.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Applies a store clear made elsewhere, such as the 401 handler, even
    /// when later writes followed it.
    fn reconcile(&self) {
        let event = self.store.last_event();
        let seen = self.seen_revision.swap(event.revision, Ordering::SeqCst);
        if event.revision == seen {
            return;
        }
        let Some((cleared_at, reason)) = event.last_clear else {
            return;
        };
        if cleared_at > seen && self.state.borrow().token.is_some() {
            info!(?reason, "session cleared by storage");
            self.state.send_replace(SessionState::default());
        }
    }

    /// Marks our own store writes as seen.
    fn mark_seen(&self) {
        self.seen_revision
            .store(self.store.revision(), Ordering::SeqCst);
    }

    fn set_phase(&self, phase: SessionPhase, loading: bool) {
        self.state.send_modify(|s| {
            s.phase = phase;
            s.loading = loading;
        });
    }

    fn reset(&self) {
        self.mark_seen();
        self.state.send_replace(SessionState::default());
    }

    /// Challenge for `email` carrying this device's identity. A missing or
    /// blank `device_id` falls back to the persisted one.
    pub fn new_challenge(&self, email: String, device_id: Option<String>) -> TwoFactorChallenge {
        TwoFactorChallenge {
            email,
            device_id: device_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| self.store.device_id()),
            device_name: self.settings.device_name.clone(),
            device_type: self.settings.device_type.clone(),
            expires_at: None,
            attempts_remaining: None,
        }
    }

    fn complete_login(&self, access: String, refresh: Option<String>, user: User) -> User {
        self.store.set(TokenUpdate {
            access: Some(access.clone()),
            refresh,
        });
        self.store.set_user(&user);
        self.mark_seen();
        self.state.send_replace(SessionState {
            phase: SessionPhase::LoggedIn,
            user: Some(user.clone()),
            token: Some(access),
            loading: false,
        });
        info!(email = %user.email, "signed in");
        user
    }

    /// Password login.
    ///
    /// Invalid input fails without a network call. A `requires_2fa` reply
    /// leaves the session unsigned in [`SessionPhase::Awaiting2FA`].
    pub async fn sign_in(&self, email: &str, password: &str) -> SignInOutcome {
        self.reconcile();
        let form = LoginForm {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let errors = form.validate();
        if !errors.is_empty() {
            return SignInOutcome::Failed(AuthFailure::invalid(errors));
        }

        self.set_phase(SessionPhase::Authenticating, true);
        let body = json!({
            "email": form.email,
            "password": form.password,
            "device_id": self.store.device_id(),
            "device_name": self.settings.device_name,
            "device_type": self.settings.device_type,
            "is_mobile_app": true,
        });

        let raw = match self.api.post::<Value, _>(LOGIN_PATH, &body).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!("login failed: {err}");
                self.reset();
                return SignInOutcome::Failed(AuthFailure::from_api(&err));
            }
        };

        let resp: LoginResponse = match serde_json::from_value(raw.clone()) {
            Ok(resp) => resp,
            Err(e) => {
                warn!("unexpected login reply: {e}");
                self.reset();
                return SignInOutcome::Failed(AuthFailure::message(GENERIC_MESSAGE));
            }
        };

        if resp.requires_2fa {
            let email = resp.user_email.clone().unwrap_or(form.email);
            let mut challenge = self.new_challenge(email, resp.device_id.clone());
            challenge.expires_at = resp.expires_at.clone();
            challenge.attempts_remaining = resp.attempts_remaining;
            self.mark_seen();
            self.state.send_replace(SessionState {
                phase: SessionPhase::Awaiting2FA,
                user: None,
                token: None,
                loading: false,
            });
            info!(email = %challenge.email, "login requires email code");
            return SignInOutcome::TwoFactorRequired(challenge);
        }

        match resp.token_pair() {
            Some(tokens) => {
                let user = resp.user.unwrap_or_else(|| User {
                    email: form.email,
                    ..User::default()
                });
                SignInOutcome::SignedIn(self.complete_login(tokens.access, tokens.refresh, user))
            }
            None => {
                self.reset();
                SignInOutcome::Failed(AuthFailure::message(normalize_error(&raw)))
            }
        }
    }

    /// Registration. Invalid input fails without a network call.
    pub async fn sign_up(&self, form: &RegistrationForm) -> SignUpOutcome {
        self.reconcile();
        let errors = form.validate();
        if !errors.is_empty() {
            return SignUpOutcome::Failed(AuthFailure::invalid(errors));
        }

        self.set_phase(SessionPhase::Authenticating, true);
        let raw = match self
            .api
            .post::<Value, _>(REGISTER_PATH, &form.to_payload())
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                self.reset();
                return SignUpOutcome::Failed(AuthFailure::from_api(&err));
            }
        };
        let resp: RegisterResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

        if resp.requires_verification {
            self.reset();
            let email = resp
                .user_email
                .clone()
                .unwrap_or_else(|| form.email.trim().to_string());
            let mut challenge = self.new_challenge(email, None);
            challenge.expires_at = resp.login.expires_at.clone();
            challenge.attempts_remaining = resp.login.attempts_remaining;
            return SignUpOutcome::VerificationRequired(challenge);
        }

        if let Some(tokens) = resp.login.token_pair() {
            let user = resp
                .login
                .user
                .or(resp.user_data)
                .unwrap_or_else(|| User {
                    email: form.email.trim().to_string(),
                    ..User::default()
                });
            return SignUpOutcome::SignedIn(self.complete_login(
                tokens.access,
                tokens.refresh,
                user,
            ));
        }

        self.reset();
        if resp.login.success == Some(false) {
            return SignUpOutcome::Failed(AuthFailure::message(normalize_error(&raw)));
        }
        SignUpOutcome::Registered {
            message: resp
                .login
                .message
                .unwrap_or_else(|| "Account created. Sign in to continue.".to_string()),
        }
    }

    /// Confirms a registration code; success usually signs the user in.
    pub async fn verify_registration(
        &self,
        flow: &mut TwoFactorFlow,
        code: &str,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        if let Err(message) = flow.begin_verify(code, now) {
            return VerifyOutcome::Rejected(AuthFailure::message(message));
        }
        let body = json!({
            "email": flow.email(),
            "code": code.trim(),
            "verification_method": VERIFICATION_METHOD,
        });
        self.finish_verify(flow, REGISTER_VERIFY_PATH, &body, now)
            .await
    }

    /// Confirms a login code. Success completes the login.
    pub async fn verify_two_factor(
        &self,
        flow: &mut TwoFactorFlow,
        code: &str,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        if let Err(message) = flow.begin_verify(code, now) {
            return VerifyOutcome::Rejected(AuthFailure::message(message));
        }
        let challenge = flow.challenge();
        let body = json!({
            "email": challenge.email,
            "code": code.trim(),
            "device_id": challenge.device_id,
            "device_name": challenge.device_name,
            "device_type": challenge.device_type,
        });
        self.finish_verify(flow, LOGIN_2FA_PATH, &body, now).await
    }

    async fn finish_verify(
        &self,
        flow: &mut TwoFactorFlow,
        path: &str,
        body: &Value,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        let raw = match self.api.post::<Value, _>(path, body).await {
            Ok(raw) => raw,
            Err(err) => {
                if is_max_attempts(&err) {
                    flow.block(now);
                    return VerifyOutcome::Blocked {
                        message: BLOCKED_MESSAGE.to_string(),
                    };
                }
                flow.verify_rejected(now);
                return VerifyOutcome::Rejected(AuthFailure::from_api(&err));
            }
        };

        let resp: LoginResponse = serde_json::from_value(raw.clone()).unwrap_or_default();
        if resp.success == Some(false) {
            flow.verify_rejected(now);
            return VerifyOutcome::Rejected(AuthFailure::message(normalize_error(&raw)));
        }

        flow.verified();
        match resp.token_pair() {
            Some(tokens) => {
                let user = resp.user.unwrap_or_else(|| User {
                    email: flow.email().to_string(),
                    ..User::default()
                });
                VerifyOutcome::SignedIn(self.complete_login(tokens.access, tokens.refresh, user))
            }
            None if flow.purpose() == FlowPurpose::Login => {
                self.reset();
                VerifyOutcome::Rejected(AuthFailure::message(GENERIC_MESSAGE))
            }
            None => VerifyOutcome::Verified {
                message: resp
                    .message
                    .unwrap_or_else(|| "Email verified. Sign in to continue.".to_string()),
            },
        }
    }

    pub async fn resend_registration_code(
        &self,
        flow: &mut TwoFactorFlow,
        now: DateTime<Utc>,
    ) -> Result<(), AuthFailure> {
        let body = json!({
            "email": flow.email(),
            "verification_method": VERIFICATION_METHOD,
        });
        self.resend(flow, REGISTER_RESEND_PATH, &body, now).await
    }

    pub async fn resend_two_factor(
        &self,
        flow: &mut TwoFactorFlow,
        now: DateTime<Utc>,
    ) -> Result<(), AuthFailure> {
        let body = json!({ "email": flow.email() });
        self.resend(flow, TWO_FACTOR_RESEND_PATH, &body, now).await
    }

    async fn resend(
        &self,
        flow: &mut TwoFactorFlow,
        path: &str,
        body: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), AuthFailure> {
        if !flow.can_resend(now) {
            let message = flow
                .status_message(now)
                .unwrap_or_else(|| "A new code cannot be requested now.".to_string());
            return Err(AuthFailure::message(message));
        }

        match self.api.post::<Value, _>(path, body).await {
            Ok(raw) => {
                let delivery: CodeDelivery =
                    serde_json::from_value(raw.clone()).unwrap_or_default();
                if !flow.apply_delivery(&delivery, now) {
                    return Err(AuthFailure::message(BLOCKED_MESSAGE));
                }
                if delivery.success == Some(false) {
                    return Err(AuthFailure::message(normalize_error(&raw)));
                }
                Ok(())
            }
            Err(err) => {
                if is_max_attempts(&err) {
                    flow.block(now);
                    return Err(AuthFailure::message(BLOCKED_MESSAGE));
                }
                Err(AuthFailure::from_api(&err))
            }
        }
    }

    /// Abandons a pending login code.
    pub fn cancel_two_factor(&self) {
        if self.state.borrow().phase == SessionPhase::Awaiting2FA {
            self.reset();
        }
    }

    /// Clears storage and in-memory state. Never fails; safe to repeat.
    pub fn sign_out(&self) {
        self.store.clear(ClearReason::SignOut);
        self.reset();
        info!("signed out");
    }

    /// Replaces the cached user in memory and in storage.
    pub fn update_user_data(&self, user: User) {
        self.reconcile();
        self.store.set_user(&user);
        self.mark_seen();
        self.state.send_modify(|s| s.user = Some(user));
    }

    /// Re-fetches the profile and caches it.
    ///
    /// # Errors
    /// Propagates the request failure; a 401 has already signed out.
    pub async fn refresh_profile(&self) -> ApiResult<User> {
        let raw: Value = self.api.get(PROFILE_PATH).await?;
        let user = user_from_reply(raw)?;
        self.update_user_data(user.clone());
        Ok(user)
    }

    pub async fn update_profile(&self, form: &ProfileForm) -> Result<User, AuthFailure> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(AuthFailure::invalid(errors));
        }
        if form.is_empty() {
            return Err(AuthFailure::message("Nothing to update"));
        }

        let raw: Value = self
            .api
            .put(PROFILE_PATH, &form.to_payload())
            .await
            .map_err(|e| AuthFailure::from_api(&e))?;
        let user = user_from_reply(raw).map_err(|e| AuthFailure::from_api(&e))?;
        self.update_user_data(user.clone());
        Ok(user)
    }

    /// Returns the backend's confirmation message.
    pub async fn change_password(&self, form: &PasswordChangeForm) -> Result<String, AuthFailure> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(AuthFailure::invalid(errors));
        }
        let raw: Value = self
            .api
            .post(CHANGE_PASSWORD_PATH, &form.to_payload())
            .await
            .map_err(|e| AuthFailure::from_api(&e))?;
        success_message(&raw, "Password changed")
    }

    /// Asks the backend to email reset instructions. Works while signed out
    /// and leaves the session untouched.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, AuthFailure> {
        if let Err(message) = validate_email(email) {
            let mut errors = FieldErrors::new();
            errors.insert("email", message);
            return Err(AuthFailure::invalid(errors));
        }
        let raw: Value = self
            .api
            .post(PASSWORD_RESET_PATH, &json!({ "email": email.trim() }))
            .await
            .map_err(|e| {
                if e.status == Some(404) {
                    AuthFailure::message("Email not found")
                } else {
                    AuthFailure::from_api(&e)
                }
            })?;
        info!("password reset requested");
        success_message(&raw, "Check your inbox for reset instructions.")
    }

    /// # Errors
    /// Propagates the request failure.
    pub async fn two_factor_status(&self) -> ApiResult<TwoFactorStatus> {
        self.api.get(TWO_FACTOR_STATUS_PATH).await
    }

    /// Asks the backend to email an activation code.
    ///
    /// # Errors
    /// Propagates the request failure.
    pub async fn two_factor_setup(&self) -> ApiResult<CodeDelivery> {
        self.api.post(TWO_FACTOR_SETUP_PATH, &json!({})).await
    }

    pub async fn two_factor_enable(&self, code: &str) -> Result<String, AuthFailure> {
        validate_code(code).map_err(AuthFailure::message)?;
        let raw: Value = self
            .api
            .post(TWO_FACTOR_ENABLE_PATH, &json!({ "code": code.trim() }))
            .await
            .map_err(|e| AuthFailure::from_api(&e))?;
        let message = success_message(&raw, "Two-factor authentication enabled")?;
        self.set_cached_two_factor(true);
        Ok(message)
    }

    pub async fn two_factor_disable(
        &self,
        password: &str,
        code: &str,
    ) -> Result<String, AuthFailure> {
        if password.is_empty() {
            let mut fields = FieldErrors::new();
            fields.insert("password", "Password is required");
            return Err(AuthFailure::invalid(fields));
        }
        validate_code(code).map_err(AuthFailure::message)?;
        let raw: Value = self
            .api
            .post(
                TWO_FACTOR_DISABLE_PATH,
                &json!({ "password": password, "code": code.trim() }),
            )
            .await
            .map_err(|e| AuthFailure::from_api(&e))?;
        let message = success_message(&raw, "Two-factor authentication disabled")?;
        self.set_cached_two_factor(false);
        Ok(message)
    }

    fn set_cached_two_factor(&self, enabled: bool) {
        if let Some(mut user) = self.user() {
            user.two_factor_enabled = enabled;
            self.update_user_data(user);
        }
    }

    /// Decides at startup whether the persisted session is still trusted.
    pub fn restore(&self, now: DateTime<Utc>) -> RestoreOutcome {
        let Some(tokens) = self.store.get() else {
            self.reset();
            return RestoreOutcome::NoSession;
        };

        let decision = restore_decision(
            self.settings.restore_policy,
            self.store.app_state(),
            self.store.left_foreground_at(),
            now,
            self.settings.background_grace,
        );

        match decision {
            RestoreDecision::Keep => {
                let user = self.store.user();
                self.mark_seen();
                self.state.send_replace(SessionState {
                    phase: SessionPhase::LoggedIn,
                    user: user.clone(),
                    token: Some(tokens.access),
                    loading: false,
                });
                debug!("restored stored session");
                RestoreOutcome::Restored(user)
            }
            RestoreDecision::Expire => {
                info!("stored session not trusted after restart; clearing");
                self.store.clear(ClearReason::Expired);
                self.reset();
                RestoreOutcome::Expired
            }
        }
    }
}

fn is_max_attempts(err: &ApiError) -> bool {
    err.body
        .as_ref()
        .and_then(|b| b.get("reason"))
        .and_then(Value::as_str)
        == Some(MAX_ATTEMPTS_REASON)
}

/// `{success, user}` envelope or a bare user object.
fn user_from_reply(raw: Value) -> ApiResult<User> {
    let user = match raw {
        Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
            map.remove("user").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(user).map_err(|e| ApiError::parse(format!("Unexpected profile: {e}")))
}

fn success_message(raw: &Value, fallback: &str) -> Result<String, AuthFailure> {
    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(AuthFailure::message(normalize_error(raw)));
    }
    Ok(raw
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string())
}
