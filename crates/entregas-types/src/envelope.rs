//! Response envelopes used across endpoints.

use serde::{Deserialize, Serialize};

/// `{ success, data, message }` wrapper returned by most write endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            success: None,
            data: None,
            message: None,
        }
    }
}

/// List endpoints return either a raw array, `{ results: [...] }` or
/// `{ data: [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Items(Vec<T>),
    Results { results: Vec<T> },
    Data { data: Vec<T> },
}

impl<T> ListResponse<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Items(items)
            | ListResponse::Results { results: items }
            | ListResponse::Data { data: items } => items,
        }
    }
}
