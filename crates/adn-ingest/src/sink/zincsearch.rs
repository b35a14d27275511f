//! ZincSearch HTTP client
//!
//! Talks to the ZincSearch REST API with basic auth: index creation through
//! `PUT /api/index` and bulk document ingestion through `POST /api/_bulkv2`.

use adn_common::Record;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{BulkWriteSink, SinkError};
use crate::config::ZincConfig;
use crate::mapping::IndexMapping;

/// Body of a `_bulkv2` request
#[derive(Debug, Serialize)]
struct BulkPayload<'a> {
    index: &'a str,
    records: &'a [Record],
}

/// Client for a single ZincSearch instance
#[derive(Debug, Clone)]
pub struct ZincSearchClient {
    http: Client,
    config: ZincConfig,
}

impl ZincSearchClient {
    /// Create a new client
    pub fn new(config: ZincConfig) -> Result<Self, SinkError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Ok(Self::new(ZincConfig::from_env()?)?)
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// Create the index, accepting an index that already exists
    pub async fn create_or_update_mapping(&self, mapping: &IndexMapping) -> Result<Value, SinkError> {
        let response = self
            .http
            .put(self.url("/api/index"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(mapping)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::BAD_REQUEST && body.to_lowercase().contains("already exists") {
            warn!(index = %mapping.name, "Index already exists, keeping current mapping");
            return Ok(parse_body(&body));
        }

        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(index = %mapping.name, "Index mapping applied");
        Ok(parse_body(&body))
    }

    /// Insert a batch of documents into `index`
    pub async fn bulk_insert(&self, index: &str, records: &[Record]) -> Result<Value, SinkError> {
        if records.is_empty() {
            return Err(SinkError::EmptyBatch);
        }

        let response = self
            .http
            .post(self.url("/api/_bulkv2"))
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&BulkPayload { index, records })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(index = %index, records = records.len(), "Bulk insert accepted");
        Ok(parse_body(&body))
    }
}

fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[async_trait]
impl BulkWriteSink for ZincSearchClient {
    async fn write(&self, collection: &str, batch: &[Record]) -> Result<(), SinkError> {
        self.bulk_insert(collection, batch).await.map(|_| ())
    }

    async fn ensure_collection(&self, mapping: &IndexMapping) -> Result<(), SinkError> {
        self.create_or_update_mapping(mapping).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "zincsearch"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ZincSearchClient::new(ZincConfig {
            base_url: "http://zinc:4080/".to_string(),
            ..ZincConfig::default()
        })
        .unwrap();

        assert_eq!(client.url("/api/_bulkv2"), "http://zinc:4080/api/_bulkv2");
        assert_eq!(client.name(), "zincsearch");
    }

    #[test]
    fn test_parse_body_falls_back_to_text() {
        assert_eq!(parse_body(r#"{"ok":true}"#)["ok"], true);
        assert_eq!(parse_body("plain"), Value::String("plain".to_string()));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected_without_request() {
        let client = ZincSearchClient::new(ZincConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..ZincConfig::default()
        })
        .unwrap();

        assert!(matches!(
            client.bulk_insert("vcf_index", &[]).await,
            Err(SinkError::EmptyBatch)
        ));
    }
}
