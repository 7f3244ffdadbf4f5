//! Records and report commands against a mock backend.

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entregas(home: &Path, server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("entregas");
    cmd.env("ENTREGAS_HOME", home)
        .env("ENTREGAS_API_BASE_URL", server.uri())
        .env_remove("ENTREGAS_LOG");
    cmd
}

async fn signed_in(server: &MockServer) -> TempDir {
    let home = tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-token-1234567890",
            "user": {"email": "ana@example.com"}
        })))
        .mount(server)
        .await;
    entregas(home.path(), server)
        .args(["login", "--email", "ana@example.com", "--password", "secret"])
        .assert()
        .success();
    home
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_add_posts_backend_fields() {
    let server = MockServer::start().await;
    let home = signed_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/registro/api/registro-trabalho/"))
        .and(body_partial_json(json!({
            "data": "2024-03-02",
            "quantidade_entregues": 20,
            "quantidade_nao_entregues": 2
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 11,
            "data": "2024-03-02",
            "hora_inicio": "08:00:00",
            "hora_fim": "17:00:00",
            "quantidade_entregues": 20,
            "quantidade_nao_entregues": 2,
            "tipo_pagamento": "diaria",
            "valor": "180.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    entregas(home.path(), &server)
        .args([
            "work", "add", "--date", "2024-03-02", "--start", "08:00", "--end", "17:00",
            "--delivered", "20", "--not-delivered", "2", "--payment-type", "diaria",
            "--value", "180",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded 2024-03-02"))
        .stdout(predicate::str::contains("R$ 180.00"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expense_add_rejects_zero_value_locally() {
    let server = MockServer::start().await;
    let home = signed_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/registro/api/registro-despesa/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    entregas(home.path(), &server)
        .args(["expenses", "add", "--kind", "combustivel", "--value", "0", "--date", "2024-03-02"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valor"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_all_time_totals() {
    let server = MockServer::start().await;
    let home = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/registro/api/registro-trabalho/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": "2024-03-01", "quantidade_entregues": 18, "quantidade_nao_entregues": 2, "valor": "150.00"},
            {"data": "2024-03-02", "quantidade_entregues": 20, "quantidade_nao_entregues": 0, "valor": "250.00"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/registro/api/registro-despesa/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"tipo_despesa": "combustivel", "valor": "100.00", "data": "2024-03-01"}
        ])))
        .mount(&server)
        .await;

    entregas(home.path(), &server)
        .args(["report", "--period", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Days worked:        2"))
        .stdout(predicate::str::contains("38 delivered, 2 missed (95.0%)"))
        .stdout(predicate::str::contains("Earnings:           R$ 400.00"))
        .stdout(predicate::str::contains("Net:                R$ 300.00"))
        .stdout(predicate::str::contains("Margin:             75.0%"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_with_failed_source_warns() {
    let server = MockServer::start().await;
    let home = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/registro/api/registro-trabalho/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": "2024-03-01", "quantidade_entregues": 10, "valor": "100.00"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/registro/api/registro-despesa/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    entregas(home.path(), &server)
        .args(["report", "--period", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Net:                R$ 100.00"))
        .stderr(predicate::str::contains("could not load expenses"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_report_rejects_all_period() {
    let server = MockServer::start().await;
    let home = signed_in(&server).await;

    entregas(home.path(), &server)
        .args(["report", "--period", "all", "--remote"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("week, month or year"));
}
