//! Work days, expenses and expense categories.

use entregas_types::{ExpenseCategory, ExpenseRecord, WorkRecord};
use serde_json::{Value, json};

use super::{ensure_valid, list, or_empty, record};
use crate::errors::ApiResult;
use crate::http::ApiClient;
use crate::validation::{ExpenseForm, FieldErrors, WorkRecordForm};

const WORK_PATH: &str = "/registro/api/registro-trabalho/";
const EXPENSE_PATH: &str = "/registro/api/registro-despesa/";
const CATEGORY_PATH: &str = "/registro/api/categorias-despesas/";

/// Work days and expenses fetched together.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub work: Vec<WorkRecord>,
    pub expenses: Vec<ExpenseRecord>,
    /// Sources that failed and are shown empty.
    pub failed: Vec<&'static str>,
}

impl Ledger {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl ApiClient {
    pub async fn list_work_records(&self) -> ApiResult<Vec<WorkRecord>> {
        list(self, WORK_PATH).await
    }

    pub async fn create_work_record(&self, form: &WorkRecordForm) -> ApiResult<WorkRecord> {
        ensure_valid(&form.validate())?;
        let raw: Value = self.post(WORK_PATH, &form.to_payload()).await?;
        record(raw, "work record")
    }

    pub async fn update_work_record(&self, id: i64, form: &WorkRecordForm) -> ApiResult<WorkRecord> {
        ensure_valid(&form.validate())?;
        let raw: Value = self.put(&format!("{WORK_PATH}{id}/"), &form.to_payload()).await?;
        record(raw, "work record")
    }

    pub async fn delete_work_record(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("{WORK_PATH}{id}/")).await
    }

    pub async fn list_expenses(&self) -> ApiResult<Vec<ExpenseRecord>> {
        list(self, EXPENSE_PATH).await
    }

    pub async fn create_expense(&self, form: &ExpenseForm) -> ApiResult<ExpenseRecord> {
        ensure_valid(&form.validate())?;
        let raw: Value = self.post(EXPENSE_PATH, &form.to_payload()).await?;
        record(raw, "expense")
    }

    pub async fn update_expense(&self, id: i64, form: &ExpenseForm) -> ApiResult<ExpenseRecord> {
        ensure_valid(&form.validate())?;
        let raw: Value = self
            .put(&format!("{EXPENSE_PATH}{id}/"), &form.to_payload())
            .await?;
        record(raw, "expense")
    }

    pub async fn delete_expense(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("{EXPENSE_PATH}{id}/")).await
    }

    pub async fn list_categories(&self) -> ApiResult<Vec<ExpenseCategory>> {
        list(self, CATEGORY_PATH).await
    }

    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<ExpenseCategory> {
        let mut errors = FieldErrors::new();
        if name.trim().is_empty() {
            errors.insert("nome", "Name is required");
        }
        ensure_valid(&errors)?;

        let mut body = json!({ "nome": name.trim() });
        if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
            body["descricao"] = Value::String(description.to_string());
        }
        let raw: Value = self.post(CATEGORY_PATH, &body).await?;
        record(raw, "category")
    }

    pub async fn delete_category(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("{CATEGORY_PATH}{id}/")).await
    }

    /// Fetches work days and expenses concurrently.
    ///
    /// Each source falls back to an empty list on failure; a 401 from either
    /// still clears the session.
    pub async fn ledger(&self) -> Ledger {
        let (work, expenses) = tokio::join!(self.list_work_records(), self.list_expenses());
        let (work, work_failed) = or_empty("work records", work);
        let (expenses, expenses_failed) = or_empty("expenses", expenses);
        Ledger {
            work,
            expenses,
            failed: work_failed.into_iter().chain(expenses_failed).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::store::{TokenStore, TokenUpdate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), TokenStore::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_joins_both_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WORK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "data": "2024-05-02", "quantidade_entregues": 30,
                 "quantidade_nao_entregues": 2, "valor": "180.00"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(EXPENSE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 9, "tipo_despesa": "combustivel", "valor": 50.5, "data": "2024-05-02"}]
            })))
            .mount(&server)
            .await;

        let ledger = client(&server).ledger().await;
        assert!(!ledger.is_partial());
        assert_eq!(ledger.work[0].delivered, 30);
        assert_eq!(ledger.work[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(ledger.expenses[0].kind, "combustivel");
    }

    #[tokio::test]
    async fn test_ledger_failed_source_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WORK_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(EXPENSE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let ledger = client(&server).ledger().await;
        assert!(ledger.work.is_empty());
        assert_eq!(ledger.failed, vec!["work records"]);
    }

    #[tokio::test]
    async fn test_ledger_unauthorized_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = client(&server);
        api.store().set(TokenUpdate {
            access: Some("stale".into()),
            refresh: None,
        });
        let ledger = api.ledger().await;

        assert_eq!(ledger.failed.len(), 2);
        assert!(api.store().get().is_none());
    }

    #[tokio::test]
    async fn test_create_expense_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EXPENSE_PATH))
            .and(body_partial_json(json!({
                "tipo_despesa": "pedagio", "valor": "7.40", "data": "2024-05-03"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": {"id": 3, "tipo_despesa": "pedagio", "valor": "7.40", "data": "2024-05-03"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = ExpenseForm {
            kind: "pedagio".into(),
            description: None,
            value: 7.4,
            date: "2024-05-03".into(),
        };
        let expense = client(&server).create_expense(&form).await.unwrap();
        assert_eq!(expense.id, Some(3));
    }

    #[tokio::test]
    async fn test_update_work_record_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/registro/api/registro-trabalho/5/"))
            .and(body_partial_json(json!({"quantidade_entregues": 12, "valor": "95.00"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "data": "2024-05-04", "quantidade_entregues": 12, "valor": "95.00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = WorkRecordForm {
            date: "2024-05-04".into(),
            start_time: "08:00".into(),
            end_time: "17:30".into(),
            delivered: 12,
            not_delivered: 0,
            payment_type: "diaria".into(),
            value: 95.0,
        };
        let updated = client(&server).update_work_record(5, &form).await.unwrap();
        assert_eq!(updated.id, Some(5));
    }

    #[tokio::test]
    async fn test_category_requires_name() {
        let server = MockServer::start().await;
        let err = client(&server).create_category("  ", None).await.unwrap_err();
        assert_eq!(err.field_errors().get("nome"), Some("Name is required"));
    }
}
