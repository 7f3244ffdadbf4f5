//! Authentication payloads: user profile, tokens, login/registration replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-defined user profile. The local copy is a best-effort mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(default, rename = "cidade", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, rename = "estado", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, rename = "foto", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub two_factor_enabled: bool,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Name to greet the user with: name, then username, then email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.username.as_deref().filter(|u| !u.trim().is_empty()))
            .unwrap_or(&self.email)
    }

    /// "admin" for staff accounts, "entregador" otherwise.
    pub fn role(&self) -> &'static str {
        if self.is_staff || self.is_superuser {
            "admin"
        } else {
            "entregador"
        }
    }
}

/// Access/refresh pair issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Reply from `POST /api/auth/login/` and `POST /api/auth/login/2fa/`.
///
/// Tokens arrive either at the top level (`access`, `refresh`) or nested
/// under `tokens`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub requires_2fa: bool,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub attempts_remaining: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LoginResponse {
    /// Returns the issued token pair, whichever shape the backend used.
    pub fn token_pair(&self) -> Option<TokenPair> {
        if let Some(access) = self.access.as_deref().filter(|a| !a.is_empty()) {
            return Some(TokenPair {
                access: access.to_string(),
                refresh: self.refresh.clone(),
            });
        }
        self.tokens
            .as_ref()
            .filter(|t| !t.access.is_empty())
            .cloned()
    }
}

/// Reply from `POST /api/auth/register/`.
///
/// `success`, `message`, tokens and countdown fields live in `login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_phone: Option<String>,
    #[serde(default)]
    pub user_data: Option<User>,
    #[serde(flatten)]
    pub login: LoginResponse,
}

/// Reply from code (re)send endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeDelivery {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub attempts_remaining: Option<u32>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply from `GET /api/auth/2fa/status/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwoFactorStatus {
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default)]
    pub email: Option<String>,
}
