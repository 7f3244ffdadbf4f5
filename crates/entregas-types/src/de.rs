//! Deserialization helpers for backend quirks.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Accepts `12.5`, `"12.50"` or `null` (as 0.0).
///
/// Decimal fields come back as strings from some endpoints and as floats from
/// others.
pub fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(NumberOrString::Number(n)) => Ok(n),
        Some(NumberOrString::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed
                .replace(',', ".")
                .parse::<f64>()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Price {
        #[serde(deserialize_with = "super::decimal")]
        value: f64,
    }

    #[test]
    fn test_decimal_accepts_string_number_and_null() {
        let a: Price = serde_json::from_str(r#"{"value":"12.50"}"#).unwrap();
        let b: Price = serde_json::from_str(r#"{"value":7}"#).unwrap();
        let c: Price = serde_json::from_str(r#"{"value":null}"#).unwrap();
        let d: Price = serde_json::from_str(r#"{"value":"3,25"}"#).unwrap();
        assert!((a.value - 12.5).abs() < f64::EPSILON);
        assert!((b.value - 7.0).abs() < f64::EPSILON);
        assert!(c.value.abs() < f64::EPSILON);
        assert!((d.value - 3.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        let res: Result<Price, _> = serde_json::from_str(r#"{"value":"abc"}"#);
        assert!(res.is_err());
    }
}
