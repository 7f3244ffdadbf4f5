use entregas_types::Vehicle;
use serde_json::Value;

use super::{ensure_valid, list, record};
use crate::errors::ApiResult;
use crate::http::ApiClient;
use crate::validation::VehicleForm;

const VEHICLES_PATH: &str = "/api/veiculos/";

fn vehicle_path(id: i64) -> String {
    format!("{VEHICLES_PATH}{id}/")
}

impl ApiClient {
    pub async fn list_vehicles(&self) -> ApiResult<Vec<Vehicle>> {
        list(self, VEHICLES_PATH).await
    }

    pub async fn create_vehicle(&self, form: &VehicleForm) -> ApiResult<Vehicle> {
        ensure_valid(&form.validate())?;
        let raw: Value = self.post(VEHICLES_PATH, &form.to_payload()).await?;
        record(raw, "vehicle")
    }

    pub async fn update_vehicle(&self, id: i64, form: &VehicleForm) -> ApiResult<Vehicle> {
        ensure_valid(&form.validate())?;
        let raw: Value = self.put(&vehicle_path(id), &form.to_payload()).await?;
        record(raw, "vehicle")
    }

    pub async fn delete_vehicle(&self, id: i64) -> ApiResult<()> {
        self.delete(&vehicle_path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use entregas_types::VehicleKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::ApiErrorKind;
    use crate::store::TokenStore;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), TokenStore::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_list_vehicles_decodes_backend_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VEHICLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "tipo": "moto", "modelo": "CG 160", "placa": "ABC1D23", "km_por_l": "38.50"}
            ])))
            .mount(&server)
            .await;

        let vehicles = client(&server).list_vehicles().await.unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].kind, VehicleKind::Moto);
        assert!((vehicles[0].km_per_liter - 38.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_create_vehicle_sends_backend_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VEHICLES_PATH))
            .and(body_partial_json(json!({"tipo": "carro", "modelo": "Onix", "placa": "XYZ9A87"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 7, "tipo": "carro", "modelo": "Onix", "placa": "XYZ9A87", "km_por_l": 12.0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = VehicleForm {
            kind: "Carro".into(),
            model: "Onix".into(),
            plate: Some("xyz9a87".into()),
            category: None,
            km_per_liter: 12.0,
        };
        let vehicle = client(&server).create_vehicle(&form).await.unwrap();
        assert_eq!(vehicle.id, Some(7));
    }

    #[tokio::test]
    async fn test_invalid_vehicle_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let form = VehicleForm {
            kind: "bike".into(),
            ..Default::default()
        };
        let err = client(&server).create_vehicle(&form).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert!(err.field_errors().get("tipo").is_some());
        assert!(err.field_errors().get("modelo").is_some());
    }

    #[tokio::test]
    async fn test_delete_vehicle_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/veiculos/7/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_vehicle(7).await.unwrap();
    }
}
