//! Document database HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::auth::{MasterKeySigner, rfc1123};

const API_VERSION: &str = "2018-12-31";

/// Operations the migration needs from the document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a SQL-like query and return every matching document
    async fn query_documents(&self, query: &str) -> Result<Vec<Value>>;

    /// Overwrite the document with the given id
    async fn replace_document(&self, id: &str, document: &Value) -> Result<Value>;
}

/// Connection settings for one container
#[derive(Debug, Clone)]
pub struct ContainerRef {
    pub endpoint: String,
    pub database: String,
    pub container: String,
    /// Document field holding the partition key, if the container is partitioned
    pub partition_key: Option<String>,
}

impl ContainerRef {
    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.container)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

/// reqwest-backed implementation of [`DocumentStore`]
#[derive(Debug)]
pub struct DocumentClient {
    http: reqwest::Client,
    container: ContainerRef,
    signer: MasterKeySigner,
}

impl DocumentClient {
    pub fn new(container: ContainerRef, master_key: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            signer: MasterKeySigner::new(master_key)?,
            container,
        })
    }

    fn url(&self, resource_link: &str) -> String {
        format!(
            "{}/{}",
            self.container.endpoint.trim_end_matches('/'),
            resource_link
        )
    }

    fn signed_headers(&self, verb: &Method, resource_link: &str) -> Result<HeaderMap> {
        let date = rfc1123(Utc::now());
        let authorization = self
            .signer
            .authorization(verb.as_str(), "docs", resource_link, &date)?;

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(&authorization)?);
        headers.insert("x-ms-date", HeaderValue::from_str(&date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn partition_header(&self, document: &Value) -> Result<Option<HeaderValue>> {
        let Some(field) = &self.container.partition_key else {
            return Ok(None);
        };
        let key = document.get(field).cloned().unwrap_or(Value::Null);
        let header = HeaderValue::from_str(&json!([key]).to_string())
            .context("Partition key value is not a valid header")?;
        Ok(Some(header))
    }
}

/// Turn a non-success response into an error, calling out throttling
async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        anyhow::bail!("{} throttled by document database (429): {}", action, body);
    }
    anyhow::bail!("{} failed with {}: {}", action, status, body)
}

#[async_trait]
impl DocumentStore for DocumentClient {
    async fn query_documents(&self, query: &str) -> Result<Vec<Value>> {
        let link = self.container.collection_link();
        let url = self.url(&format!("{}/docs", link));
        let body = json!({ "query": query, "parameters": [] });

        let mut documents = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut headers = self.signed_headers(&Method::POST, &link)?;
            headers.insert("x-ms-documentdb-isquery", HeaderValue::from_static("True"));
            headers.insert(
                "x-ms-documentdb-query-enablecrosspartition",
                HeaderValue::from_static("True"),
            );
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/query+json"),
            );
            if let Some(token) = &continuation {
                headers.insert("x-ms-continuation", HeaderValue::from_str(token)?);
            }

            let response = self
                .http
                .post(&url)
                .headers(headers)
                .body(body.to_string())
                .send()
                .await
                .with_context(|| format!("Query against {} failed", link))?;
            let response = check_status(response, "Query").await?;

            continuation = response
                .headers()
                .get("x-ms-continuation")
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            let page: QueryResponse = response
                .json()
                .await
                .context("Failed to parse query response")?;
            log::debug!(
                "Fetched {} documents from {}, has_next={}",
                page.documents.len(),
                link,
                continuation.is_some()
            );
            documents.extend(page.documents);

            if continuation.is_none() {
                break;
            }
        }

        Ok(documents)
    }

    async fn replace_document(&self, id: &str, document: &Value) -> Result<Value> {
        let link = format!("{}/docs/{}", self.container.collection_link(), id);
        let url = self.url(&format!(
            "{}/docs/{}",
            self.container.collection_link(),
            urlencoding::encode(id)
        ));

        let mut headers = self.signed_headers(&Method::PUT, &link)?;
        if let Some(partition) = self.partition_header(document)? {
            headers.insert("x-ms-documentdb-partitionkey", partition);
        }

        let response = self
            .http
            .put(&url)
            .headers(headers)
            .json(document)
            .send()
            .await
            .with_context(|| format!("Replace of document {} failed", id))?;
        let response = check_status(response, "Replace").await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse replaced document {}", id))
    }
}
