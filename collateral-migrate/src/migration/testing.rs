//! In-memory backends for exercising migration tasks without a network

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::report::{MigrationResult, ReportSink};
use crate::api::models::Meta;
use crate::api::{Buyer, CatalogApi, ListOptions, ListPage, Product, UserGroup};
use crate::docdb::DocumentStore;

/// JSON merge patch: objects merge key by key, anything else replaces
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn apply_patch<T: Serialize + DeserializeOwned>(record: &T, patch: &Value) -> Result<T> {
    let mut value = serde_json::to_value(record)?;
    merge_patch(&mut value, patch);
    Ok(serde_json::from_value(value)?)
}

/// `ID` filter with trailing `*` wildcard; other filters are ignored
fn matches(id: &str, options: &ListOptions) -> bool {
    match options.filters.get("ID") {
        Some(pattern) => match pattern.strip_suffix('*') {
            Some(prefix) => id.starts_with(prefix),
            None => id == pattern,
        },
        None => true,
    }
}

fn paginate<T: Clone>(records: &[T], options: &ListOptions, page_size: usize) -> ListPage<T> {
    let size = page_size.max(1);
    let page = options.page.unwrap_or(1).max(1);
    let total_pages = records.len().div_ceil(size) as u32;
    let items = records
        .iter()
        .skip((page as usize - 1) * size)
        .take(size)
        .cloned()
        .collect();

    ListPage {
        meta: Meta {
            page,
            page_size: size as u32,
            total_count: records.len() as u64,
            total_pages,
        },
        items,
    }
}

/// Tracks concurrent calls so tests can assert on overlap
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Catalog held in memory, with merge-patch semantics and scripted failures
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    pub products: Mutex<Vec<Product>>,
    pub buyers: Vec<Buyer>,
    pub groups: Mutex<BTreeMap<String, Vec<UserGroup>>>,
    pub page_size: usize,
    pub latency: Duration,
    /// Ids whose patch is rejected
    pub failing: HashSet<String>,
    /// Fail every list call
    pub fail_listing: bool,
    pub patch_calls: Mutex<Vec<String>>,
    pub in_flight: InFlight,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            page_size: 2,
            ..Default::default()
        }
    }

    pub fn with_products(self, products: Vec<Value>) -> Self {
        let products = products
            .into_iter()
            .map(|p| serde_json::from_value(p).unwrap())
            .collect();
        Self {
            products: Mutex::new(products),
            ..self
        }
    }

    pub fn with_buyer(mut self, id: &str) -> Self {
        self.buyers
            .push(serde_json::from_value(json!({ "ID": id, "Active": true })).unwrap());
        self
    }

    pub fn with_groups(self, buyer_id: &str, groups: Vec<Value>) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| serde_json::from_value(g).unwrap())
            .collect();
        self.groups.lock().unwrap().insert(buyer_id.to_string(), groups);
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn product(&self, id: &str) -> Product {
        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .unwrap()
    }

    pub fn group(&self, buyer_id: &str, id: &str) -> UserGroup {
        self.groups.lock().unwrap()[buyer_id]
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .unwrap()
    }

    pub fn patched_ids(&self) -> Vec<String> {
        let mut ids = self.patch_calls.lock().unwrap().clone();
        ids.sort();
        ids
    }

    async fn simulate_write(&self, id: &str) -> Result<()> {
        self.in_flight.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.exit();
        self.patch_calls.lock().unwrap().push(id.to_string());
        if self.failing.contains(id) {
            anyhow::bail!("PATCH {} returned 400 Bad Request", id);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for MemoryCatalog {
    async fn list_products(&self, options: &ListOptions) -> Result<ListPage<Product>> {
        if self.fail_listing {
            anyhow::bail!("GET /products returned 500 Internal Server Error");
        }
        let products: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| matches(&p.id, options))
            .cloned()
            .collect();
        Ok(paginate(&products, options, self.page_size))
    }

    async fn list_buyers(&self, options: &ListOptions) -> Result<ListPage<Buyer>> {
        if self.fail_listing {
            anyhow::bail!("GET /buyers returned 500 Internal Server Error");
        }
        let buyers: Vec<Buyer> = self
            .buyers
            .iter()
            .filter(|b| matches(&b.id, options))
            .cloned()
            .collect();
        Ok(paginate(&buyers, options, self.page_size))
    }

    async fn list_user_groups(
        &self,
        buyer_id: &str,
        options: &ListOptions,
    ) -> Result<ListPage<UserGroup>> {
        if self.fail_listing {
            anyhow::bail!("GET /usergroups returned 500 Internal Server Error");
        }
        let groups: Vec<UserGroup> = self
            .groups
            .lock()
            .unwrap()
            .get(buyer_id)
            .map(|groups| {
                groups
                    .iter()
                    .filter(|g| matches(&g.id, options))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(paginate(&groups, options, self.page_size))
    }

    async fn patch_product(&self, id: &str, patch: &Value) -> Result<Product> {
        self.simulate_write(id).await?;
        let mut products = self.products.lock().unwrap();
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow::anyhow!("Product {} not found", id))?;
        *product = apply_patch(product, patch)?;
        Ok(product.clone())
    }

    async fn patch_user_group(&self, buyer_id: &str, id: &str, patch: &Value) -> Result<UserGroup> {
        self.simulate_write(id).await?;
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .get_mut(buyer_id)
            .and_then(|groups| groups.iter_mut().find(|g| g.id == id))
            .ok_or_else(|| anyhow::anyhow!("User group {} not found under {}", id, buyer_id))?;
        *group = apply_patch(group, patch)?;
        Ok(group.clone())
    }
}

/// Document container held in memory, with whole-document replace
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    pub documents: Mutex<Vec<Value>>,
    pub failing: HashSet<String>,
    pub fail_query: bool,
    pub latency: Duration,
    pub replace_calls: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<String>>,
    pub in_flight: InFlight,
}

impl MemoryDocuments {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: Mutex::new(documents),
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn document(&self, id: &str) -> Value {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d["id"] == id)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn query_documents(&self, query: &str) -> Result<Vec<Value>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_query {
            anyhow::bail!("Query failed with 503 Service Unavailable");
        }
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn replace_document(&self, id: &str, document: &Value) -> Result<Value> {
        self.in_flight.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.exit();
        self.replace_calls.lock().unwrap().push(id.to_string());

        if self.failing.contains(id) {
            anyhow::bail!("Replace throttled by document database (429): Request rate is large");
        }

        let mut documents = self.documents.lock().unwrap();
        let slot = documents
            .iter_mut()
            .find(|d| d["id"] == id)
            .ok_or_else(|| anyhow::anyhow!("Document {} not found", id))?;
        *slot = document.clone();
        Ok(document.clone())
    }
}

/// Report sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub candidates: Mutex<Vec<(String, Vec<String>)>>,
    pub results: Mutex<Vec<MigrationResult>>,
    pub fail_candidates: bool,
    pub fail_results: bool,
}

impl ReportSink for MemorySink {
    fn record_candidates(&self, task: &str, ids: &[String]) -> Result<()> {
        if self.fail_candidates {
            anyhow::bail!("Disk full");
        }
        self.candidates
            .lock()
            .unwrap()
            .push((task.to_string(), ids.to_vec()));
        Ok(())
    }

    fn record_result(&self, result: &MigrationResult) -> Result<()> {
        if self.fail_results {
            anyhow::bail!("Disk full");
        }
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_patch_keeps_unrelated_keys() {
        let mut target = json!({ "ID": "p1", "xp": { "Foo": "bar" } });
        merge_patch(&mut target, &json!({ "xp": { "IsCollateralProduct": false } }));
        assert_eq!(
            target,
            json!({ "ID": "p1", "xp": { "Foo": "bar", "IsCollateralProduct": false } })
        );
    }

    #[test]
    fn test_merge_patch_creates_missing_bag() {
        let mut target = json!({ "ID": "p1", "xp": null });
        merge_patch(&mut target, &json!({ "xp": { "IsCollateralProduct": false } }));
        assert_eq!(target["xp"], json!({ "IsCollateralProduct": false }));
    }

    #[test]
    fn test_wildcard_filter() {
        let options = ListOptions::new().filter("ID", "SoldTo*");
        assert!(matches("SoldTo123", &options));
        assert!(!matches("ShipTo123", &options));
        assert!(matches("anything", &ListOptions::new()));
    }

    #[test]
    fn test_paginate() {
        let records: Vec<u32> = (1..=5).collect();
        let page = paginate(&records, &ListOptions::new().with_page(3), 2);
        assert_eq!(page.items, vec![5]);
        assert_eq!(page.meta.total_pages, 3);
        assert!(!page.has_more());
    }
}
