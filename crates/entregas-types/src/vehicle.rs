use std::fmt;

use serde::{Deserialize, Serialize};

use crate::de;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    #[default]
    Carro,
    Moto,
}

impl VehicleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleKind::Carro => "carro",
            VehicleKind::Moto => "moto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carro" => Some(VehicleKind::Carro),
            "moto" => Some(VehicleKind::Moto),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered vehicle (`/api/veiculos/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "tipo", default)]
    pub kind: VehicleKind,
    #[serde(rename = "modelo", default)]
    pub model: String,
    #[serde(rename = "placa", default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "km_por_l", default, deserialize_with = "de::decimal")]
    pub km_per_liter: f64,
    #[serde(rename = "data_cadastro", default, skip_serializing)]
    pub registered_at: Option<String>,
}
