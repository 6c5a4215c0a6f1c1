#![cfg(feature = "server")]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use httpmock::prelude::*;
use serde_json::Value;
use statement_extract::config::{ProviderKind, ProviderSettings};
use statement_extract::domain::model::PageContent;
use statement_extract::domain::ports::DocumentReader;
use statement_extract::{
    server, ExtractionOptions, LlmProvider, LocalStorage, PipelineError, Result, StatementPipeline,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const MAX_UPLOAD: usize = 64 * 1024;

/// Serves fixed pages, or fails like an unreadable PDF when `pages` is `None`.
struct FixtureReader {
    pages: Option<Vec<PageContent>>,
}

impl DocumentReader for FixtureReader {
    fn read_pages(&self, document_name: &str, _bytes: &[u8]) -> Result<Vec<PageContent>> {
        self.pages
            .clone()
            .ok_or_else(|| PipelineError::extraction(document_name, "invalid xref table"))
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn statement_with_table() -> Vec<PageContent> {
    vec![
        PageContent {
            number: 1,
            text: Some("Dummy Bank Ltd\nAccount holder: Jane Doe\nAccount no: 0012345".to_string()),
            table: Some(vec![
                row(&["Date", "Description", "Debit", "Credit", "Balance"]),
                row(&["01-01-2024", "Opening balance", "", "", "1000.00"]),
                row(&["03-01-2024", "ATM withdrawal", "200.00", "", "800.00"]),
            ]),
        },
        PageContent {
            number: 2,
            text: Some("Copyright Dummy Bank Statement".to_string()),
            table: Some(vec![
                row(&["Date", "Description", "Debit", "Credit", "Balance"]),
                row(&["05-01-2024", "Salary", "", "2500.00", "3300.00"]),
                row(&["Copyright 2024 Dummy Bank", "", "", "", ""]),
            ]),
        },
    ]
}

fn scanned_statement() -> Vec<PageContent> {
    vec![PageContent {
        number: 1,
        text: Some("Jane Doe 0012345\n01-01-2024 Coffee 3.50 996.50".to_string()),
        table: None,
    }]
}

fn gemini_reply(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
}

fn gemini_settings(server: &MockServer) -> ProviderSettings {
    ProviderSettings {
        kind: ProviderKind::Gemini,
        model: "gemini-2.0-flash".to_string(),
        base_url: server.url("/v1beta"),
        api_key: "integration-key".to_string(),
        temperature: 0.0,
        timeout: Duration::from_secs(5),
        structured_output: true,
    }
}

fn app(pages: Option<Vec<PageContent>>, server: &MockServer, staging: &TempDir) -> Router {
    let provider = LlmProvider::from_settings(&gemini_settings(server)).unwrap();
    let pipeline = StatementPipeline::new(
        FixtureReader { pages },
        provider,
        LocalStorage::new(staging.path()),
        ExtractionOptions::default(),
    );
    server::router(Arc::new(pipeline), MAX_UPLOAD)
}

fn upload(uri: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "statement-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn staged_files(staging: &TempDir) -> usize {
    std::fs::read_dir(staging.path()).unwrap().count()
}

#[tokio::test]
async fn test_root_reports_running() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();

    let response = app(None, &server, &staging)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"message": "Bank Statement Extraction API is running"})
    );
}

#[tokio::test]
async fn test_statement_with_table() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    let details = "{\"account_holder_details\": {\"name\": \"Jane Doe\"}, \"bank_account_details\": {\"account_number\": \"0012345\"}}";
    let gemini = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.0-flash:generateContent")
                .header("x-goog-api-key", "integration-key")
                .body_contains("Jane Doe");
            then.status(200).json_body(gemini_reply(details));
        })
        .await;

    let response = app(Some(statement_with_table()), &server, &staging)
        .oneshot(upload("/extract", "file", "statement.pdf", b"%PDF-1.5 fixture"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let object = body.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        ["account_and_bank_details", "transactions", "transactions_csv"]
    );

    assert_eq!(body["account_and_bank_details"], details);
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[1]["Description"], "ATM withdrawal");
    assert_eq!(transactions[2]["Credit"], "2500.00");
    assert!(body["transactions_csv"]
        .as_str()
        .unwrap()
        .starts_with("Date,Description,Debit,Credit,Balance\n"));

    gemini.assert_async().await;
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_statement_without_table() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    server
        .mock_async(|when, then| {
            when.method(POST).body_contains("transactions");
            then.status(200).json_body(gemini_reply(
                "```json\n{\"account_holder_details\": {\"name\": \"Jane Doe\"}, \"transactions\": [{\"date\": \"01-01-2024\", \"amount\": \"3.50\"}],}\n```",
            ));
        })
        .await;

    let response = app(Some(scanned_statement()), &server, &staging)
        .oneshot(upload("/extract", "file", "scan.pdf", b"%PDF-1.5 fixture"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(body["all_details"]["account_holder_details"]["name"], "Jane Doe");
    assert_eq!(body["all_details"]["transactions"][0]["amount"], "3.50");
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_provider_failure_is_reported() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    let gemini = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500).body("internal error");
        })
        .await;

    let response = app(Some(statement_with_table()), &server, &staging)
        .oneshot(upload("/extract", "file", "statement.pdf", b"%PDF-1.5 fixture"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "classification");
    assert!(body["error"]["suggestion"].is_string());

    // A table-path failure is not retried through the no-table path.
    gemini.assert_hits_async(1).await;
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_unreadable_pdf_is_unprocessable() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    let gemini = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(gemini_reply("{}"));
        })
        .await;

    let response = app(None, &server, &staging)
        .oneshot(upload("/extract", "file", "broken.pdf", b"not a pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "extraction");
    assert!(body["error"]["message"].as_str().unwrap().contains("broken.pdf"));

    gemini.assert_hits_async(0).await;
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_missing_file_field_is_bad_request() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();

    let response = app(Some(scanned_statement()), &server, &staging)
        .oneshot(upload("/extract", "document", "statement.pdf", b"%PDF"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["kind"], "invalid_upload");
}

#[tokio::test]
async fn test_empty_upload_is_bad_request() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();

    let response = app(Some(scanned_statement()), &server, &staging)
        .oneshot(upload("/extract", "file", "empty.pdf", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["kind"], "invalid_upload");
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_non_multipart_request_is_bad_request() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/extract")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app(None, &server, &staging).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["kind"], "invalid_upload");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    let large = vec![b'x'; MAX_UPLOAD + 1];

    let response = app(Some(scanned_statement()), &server, &staging)
        .oneshot(upload("/extract", "file", "large.pdf", &large))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(staged_files(&staging), 0);
}

#[tokio::test]
async fn test_csv_download() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(gemini_reply("{}"));
        })
        .await;

    let response = app(Some(statement_with_table()), &server, &staging)
        .oneshot(upload("/extract/csv", "file", "statement.pdf", b"%PDF-1.5 fixture"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"transactions.csv\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut reader = csv::Reader::from_reader(bytes.as_ref());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        ["Date", "Description", "Debit", "Credit", "Balance"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[2][1], "Salary");
}

#[tokio::test]
async fn test_csv_download_without_table() {
    let server = MockServer::start_async().await;
    let staging = TempDir::new().unwrap();
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(gemini_reply("{\"transactions\": []}"));
        })
        .await;

    let response = app(Some(scanned_statement()), &server, &staging)
        .oneshot(upload("/extract/csv", "file", "scan.pdf", b"%PDF-1.5 fixture"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["kind"], "no_table");
}
