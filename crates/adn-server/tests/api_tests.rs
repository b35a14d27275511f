//! HTTP API tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use adn_ingest::batch::ProcessorConfig;
use adn_ingest::sink::MemorySink;
use adn_ingest::IndexPipeline;
use adn_server::{create_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "adn-test-boundary";
const MAX_UPLOAD: usize = 16 * 1024 * 1024;

fn vcf_text(records: usize) -> String {
    let mut text = String::from(
        "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
    );
    for i in 0..records {
        text.push_str(&format!("chr2\t{}\t.\tC\tT\t30\tPASS\tDP={i}\n", 500 + i));
    }
    text
}

fn app(sink: Arc<MemorySink>, upload_dir: &TempDir) -> Router {
    let config = ProcessorConfig::new("vcf_index")
        .with_batch_size(4)
        .with_num_workers(2)
        .with_poll_interval(Duration::from_millis(5));
    let pipeline = IndexPipeline::new(config, sink).unwrap();
    create_router(AppState::new(pipeline, upload_dir.path()), MAX_UPLOAD)
}

/// `(field name, optional filename, content)` parts
fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                ));
                body.push_str("Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"));
            }
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/api/index")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root() {
    let dir = TempDir::new().unwrap();
    let response = app(Arc::new(MemorySink::new()), &dir)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Hello World");
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let response = app(Arc::new(MemorySink::new()), &dir)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sink"], "memory");
    assert_eq!(body["index"], "vcf_index");
}

#[tokio::test]
async fn test_index_upload() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let vcf = vcf_text(9);

    let response = app(sink.clone(), &dir)
        .oneshot(multipart_request(&[
            ("note", None, "ignored"),
            ("file", Some("sample.vcf"), &vcf),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["original_filename"], "sample.vcf");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["records_processed"], 9);
    assert_eq!(body["headers"]["#CHROM"], 0);
    assert_eq!(body["headers"]["INFO"], 7);
    assert!(body["temp_path"].as_str().unwrap().ends_with(".vcf"));

    assert_eq!(sink.record_count(), 9);
    assert_eq!(sink.write_count(), 3);
    assert!(sink
        .records()
        .iter()
        .all(|r| r["filename"] == "sample.vcf"));

    // The spooled upload is removed once the response is built
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let dir = TempDir::new().unwrap();
    let response = app(Arc::new(MemorySink::new()), &dir)
        .oneshot(multipart_request(&[("note", None, "no file here")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_without_header_is_unprocessable() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let response = app(sink.clone(), &dir)
        .oneshot(multipart_request(&[(
            "file",
            Some("broken.vcf"),
            "chr1\t100\t.\tA\tG\n",
        )]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "INVALID_VCF");
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn test_sink_failure_reports_drain() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new().failing_on_call(1));
    let vcf = vcf_text(4);

    let response = app(sink, &dir)
        .oneshot(multipart_request(&[("file", Some("fail.vcf"), &vcf)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SINK_ERROR");
    assert_eq!(body["error"]["report"]["outcome"], "failed");
}
