//! Backend domain endpoints, as methods on [`ApiClient`].
//!
//! Write operations validate their form first and fail with
//! [`ApiError::invalid`] without sending anything.

mod community;
mod records;
mod reports;
mod vehicles;

use entregas_types::ListResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use community::{AdDraft, Feed, PhotoUpload, PostDraft};
pub use records::Ledger;
pub use reports::ReportPeriod;

use crate::errors::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::validation::FieldErrors;

async fn list<T: DeserializeOwned>(api: &ApiClient, path: &str) -> ApiResult<Vec<T>> {
    let resp: ListResponse<T> = api.get(path).await?;
    Ok(resp.into_vec())
}

/// A failed source degrades to an empty list. The error is logged and the
/// source name returned so the caller can say the data is partial.
fn or_empty<T>(source: &'static str, result: ApiResult<Vec<T>>) -> (Vec<T>, Option<&'static str>) {
    match result {
        Ok(items) => (items, None),
        Err(err) => {
            warn!(source, kind = %err.kind, "fetch failed, showing no items: {err}");
            (Vec::new(), Some(source))
        }
    }
}

fn ensure_valid(errors: &FieldErrors) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::invalid(errors))
    }
}

/// Decodes a created/updated record from either `{success, data}` or the bare
/// object.
fn record<T: DeserializeOwned>(raw: Value, what: &str) -> ApiResult<T> {
    let inner = match raw {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| ApiError::parse(format!("Unexpected {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::errors::ApiErrorKind;

    #[derive(Debug, serde::Deserialize)]
    struct Thing {
        id: i64,
    }

    #[test]
    fn test_record_accepts_envelope_and_bare() {
        let wrapped: Thing = record(json!({"success": true, "data": {"id": 3}}), "thing").unwrap();
        let bare: Thing = record(json!({"id": 4}), "thing").unwrap();
        assert_eq!(wrapped.id, 3);
        assert_eq!(bare.id, 4);
    }

    #[test]
    fn test_record_shape_mismatch_is_parse_error() {
        let err = record::<Thing>(json!({"success": true}), "thing").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_or_empty_reports_source() {
        let (items, failed) = or_empty::<u8>("posts", Err(ApiError::network("down")));
        assert!(items.is_empty());
        assert_eq!(failed, Some("posts"));

        let (items, failed) = or_empty("ads", Ok(vec![1u8]));
        assert_eq!(items, vec![1]);
        assert_eq!(failed, None);
    }

    #[test]
    fn test_invalid_form_error_carries_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("modelo", "Model is required");
        let err = ensure_valid(&fields).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.user_message(), "Model is required");
        assert_eq!(err.field_errors().get("modelo"), Some("Model is required"));
    }
}
