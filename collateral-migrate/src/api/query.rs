//! List query options
//!
//! Reusable description of a list request: which page and which server-side
//! filters apply. Filters use the catalog's wildcard syntax,
//! e.g. `ID=SoldTo*`.

use std::collections::BTreeMap;

/// Options for a single list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// 1-based page number; `None` lets the server pick the first page
    pub page: Option<u32>,
    /// Field filters, rendered as `field=value` query parameters
    pub filters: BTreeMap<String, String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server-side filter
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Copy of these options pointed at another page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Convert to query parameters for the HTTP request
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        for (field, value) in &self.filters {
            params.push((field.clone(), value.clone()));
        }

        params
    }
}
