//! Catalog service HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::auth::{AuthManager, CredentialSet};
use super::models::{Buyer, ListPage, Product, UserGroup};
use super::query::ListOptions;
use super::resilience::{ConcurrencyConfig, ConcurrencyLimiter, ConcurrencyStats};

/// Operations the migration needs from the catalog service.
///
/// Patches use merge semantics: fields omitted from the body are kept, and
/// the `xp` bag is merged key by key rather than replaced.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self, options: &ListOptions) -> Result<ListPage<Product>>;

    async fn list_buyers(&self, options: &ListOptions) -> Result<ListPage<Buyer>>;

    async fn list_user_groups(
        &self,
        buyer_id: &str,
        options: &ListOptions,
    ) -> Result<ListPage<UserGroup>>;

    async fn patch_product(&self, id: &str, patch: &Value) -> Result<Product>;

    async fn patch_user_group(&self, buyer_id: &str, id: &str, patch: &Value) -> Result<UserGroup>;
}

/// reqwest-backed implementation of [`CatalogApi`]
#[derive(Debug)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    auth: AuthManager,
    limiter: ConcurrencyLimiter,
}

impl CatalogClient {
    pub fn new(api_url: &str, credentials: CredentialSet, concurrency: ConcurrencyConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            auth: AuthManager::new(http.clone(), credentials),
            http,
            base_url: format!("{}/v1", api_url.trim_end_matches('/')),
            limiter: ConcurrencyLimiter::new(concurrency),
        }
    }

    pub fn limiter_stats(&self) -> ConcurrencyStats {
        self.limiter.stats()
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let _permit = self.limiter.acquire().await?;
        let token = self.auth.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        log::debug!("{} {} params={:?}", method, url, params);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .query(params);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} {} returned {}: {}", method, path, status, text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {} {}", method, path))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_products(&self, options: &ListOptions) -> Result<ListPage<Product>> {
        self.send(Method::GET, "/products", &options.to_query_params(), None)
            .await
    }

    async fn list_buyers(&self, options: &ListOptions) -> Result<ListPage<Buyer>> {
        self.send(Method::GET, "/buyers", &options.to_query_params(), None)
            .await
    }

    async fn list_user_groups(
        &self,
        buyer_id: &str,
        options: &ListOptions,
    ) -> Result<ListPage<UserGroup>> {
        let path = format!("/buyers/{}/usergroups", urlencoding::encode(buyer_id));
        self.send(Method::GET, &path, &options.to_query_params(), None)
            .await
    }

    async fn patch_product(&self, id: &str, patch: &Value) -> Result<Product> {
        let path = format!("/products/{}", urlencoding::encode(id));
        self.send(Method::PATCH, &path, &[], Some(patch)).await
    }

    async fn patch_user_group(&self, buyer_id: &str, id: &str, patch: &Value) -> Result<UserGroup> {
        let path = format!(
            "/buyers/{}/usergroups/{}",
            urlencoding::encode(buyer_id),
            urlencoding::encode(id)
        );
        self.send(Method::PATCH, &path, &[], Some(patch)).await
    }
}
