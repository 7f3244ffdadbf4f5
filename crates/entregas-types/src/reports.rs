//! Server-side report payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::de;

/// Reply from `/api/relatorios/trabalho/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkReport {
    #[serde(rename = "total_dias", default)]
    pub total_days: u32,
    #[serde(rename = "total_entregas", default)]
    pub total_deliveries: u32,
    #[serde(rename = "entregas_realizadas", default)]
    pub delivered: u32,
    #[serde(rename = "entregas_nao_realizadas", default)]
    pub not_delivered: u32,
    #[serde(rename = "ganho_total", default, deserialize_with = "de::decimal")]
    pub total_earnings: f64,
    #[serde(rename = "media_entregas_dia", default, deserialize_with = "de::decimal")]
    pub deliveries_per_day: f64,
    #[serde(rename = "melhor_dia", default)]
    pub best_day: Option<Value>,
    #[serde(rename = "pior_dia", default)]
    pub worst_day: Option<Value>,
    #[serde(rename = "dias_trabalhados", default)]
    pub days: Vec<Value>,
}

/// Reply from `/api/relatorios/despesas/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseReport {
    #[serde(rename = "total_despesas", default, deserialize_with = "de::decimal")]
    pub total: f64,
    #[serde(rename = "media_despesas_dia", default, deserialize_with = "de::decimal")]
    pub per_day: f64,
    #[serde(rename = "maior_despesa", default, deserialize_with = "de::decimal")]
    pub largest: f64,
    /// Category label, or "N/A" when there are no expenses.
    #[serde(rename = "categoria_mais_cara", default)]
    pub top_category: Option<String>,
    #[serde(rename = "despesas_por_categoria", default)]
    pub by_category: Vec<CategoryTotal>,
    #[serde(rename = "despesas_por_dia", default)]
    pub days: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(default, deserialize_with = "de::decimal")]
    pub total: f64,
}

/// Reply from `/api/relatorios/estatisticas/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    #[serde(default)]
    pub total_entregas: u32,
    #[serde(default, deserialize_with = "de::decimal")]
    pub total_ganhos: f64,
    #[serde(default)]
    pub veiculos_cadastrados: u32,
    #[serde(default)]
    pub dias_trabalhados: u32,
    #[serde(default)]
    pub dias_conectado: u32,
    #[serde(default)]
    pub foto: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
