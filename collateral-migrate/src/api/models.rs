//! Catalog service record models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open-ended property bag attached to catalog records
pub type Xp = Map<String, Value>;

/// Common view over catalog records that carry an extension bag
pub trait ExtendedRecord {
    fn xp(&self) -> Option<&Xp>;

    /// Whether the extension bag contains `key` at all (any value, including null/false)
    fn has_xp_key(&self, key: &str) -> bool {
        self.xp().is_some_and(|xp| xp.contains_key(key))
    }

    /// Non-empty string value of an extension bag key
    fn xp_str(&self, key: &str) -> Option<&str> {
        self.xp()
            .and_then(|xp| xp.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub xp: Option<Xp>,
    /// Every other field, kept so nothing is lost on a round trip
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Buyer organization; user groups are scoped under one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Buyer {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Active", default)]
    pub active: bool,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// User group within a buyer (a salon when its ID starts with `SoldTo`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserGroup {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub xp: Option<Xp>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ExtendedRecord for Product {
    fn xp(&self) -> Option<&Xp> {
        self.xp.as_ref()
    }
}

impl ExtendedRecord for UserGroup {
    fn xp(&self) -> Option<&Xp> {
        self.xp.as_ref()
    }
}

/// Paging metadata returned with every list response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    #[serde(rename = "Page")]
    pub page: u32,
    #[serde(rename = "PageSize")]
    pub page_size: u32,
    #[serde(rename = "TotalCount")]
    pub total_count: u64,
    #[serde(rename = "TotalPages")]
    pub total_pages: u32,
}

/// One page of a list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<T> {
    #[serde(rename = "Meta")]
    pub meta: Meta,
    #[serde(rename = "Items", default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ListPage<T> {
    /// Whether the server reports pages after this one
    pub fn has_more(&self) -> bool {
        self.meta.page < self.meta.total_pages
    }
}
