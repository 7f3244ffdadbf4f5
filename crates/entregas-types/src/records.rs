//! Work and expense ledger entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::de;

/// Expense types accepted by `/registro/api/registro-despesa/`.
pub const EXPENSE_KINDS: &[&str] = &[
    "alimentacao",
    "combustivel",
    "manutencao",
    "pedagio",
    "estacionamento",
    "seguro",
    "licenciamento",
    "outros",
];

/// One working day (`/registro/api/registro-trabalho/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "hora_fim", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(rename = "quantidade_entregues", default)]
    pub delivered: u32,
    #[serde(rename = "quantidade_nao_entregues", default)]
    pub not_delivered: u32,
    #[serde(rename = "tipo_pagamento", default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(rename = "valor", default, deserialize_with = "de::decimal")]
    pub value: f64,
}

/// One expense (`/registro/api/registro-despesa/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "tipo_despesa")]
    pub kind: String,
    #[serde(rename = "descricao", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "valor", default, deserialize_with = "de::decimal")]
    pub value: f64,
    #[serde(rename = "data")]
    pub date: NaiveDate,
}

/// User-defined expense category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
