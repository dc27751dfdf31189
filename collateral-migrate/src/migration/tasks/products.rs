//! Backfill `xp.IsCollateralProduct = false` on every product lacking it

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{MigrationTask, TaskContext};
use crate::api::{CatalogApi, ExtendedRecord, ListOptions, Product};
use crate::migration::collector::collect_all;
use crate::migration::executor::BatchExecutor;
use crate::migration::progress::Progress;
use crate::migration::report::{ElementError, MigrationResult};

pub const COLLATERAL_FLAG: &str = "IsCollateralProduct";

/// A product needs the flag unless it already has the key, whatever its value
pub fn is_candidate(product: &Product) -> bool {
    !product.has_xp_key(COLLATERAL_FLAG)
}

/// Partial patch touching only the flag; the server merges it into `xp`
pub fn collateral_patch() -> Value {
    json!({ "xp": { COLLATERAL_FLAG: false } })
}

pub struct ProductsTask {
    catalog: Arc<dyn CatalogApi>,
    executor: BatchExecutor,
}

impl ProductsTask {
    pub fn new(catalog: Arc<dyn CatalogApi>, executor: BatchExecutor) -> Self {
        Self { catalog, executor }
    }
}

#[async_trait]
impl MigrationTask for ProductsTask {
    fn name(&self) -> &'static str {
        "products"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<MigrationResult> {
        let mut result = MigrationResult::new(self.name(), ctx.dry_run);
        let catalog = self.catalog.as_ref();

        let products = collect_all("products", ListOptions::new(), move |options| async move {
            catalog.list_products(&options).await
        })
        .await?;
        result.total_records = products.len();

        let candidates: Vec<Product> = products.into_iter().filter(is_candidate).collect();
        result.candidates = candidates.len();
        result.already_migrated = result.total_records - result.candidates;

        log::info!(
            "{} of {} products need {} ({} already set)",
            result.candidates,
            result.total_records,
            COLLATERAL_FLAG,
            result.already_migrated
        );

        let ids: Vec<String> = candidates.iter().map(|p| p.id.clone()).collect();
        ctx.record_candidates(self.name(), &ids);

        if ctx.dry_run || candidates.is_empty() {
            return Ok(result.finish_without_batch());
        }

        let patch = &collateral_patch();
        let progress = Progress::new("products", candidates.len());
        let outcome = self
            .executor
            .run(
                candidates,
                |product| product.id.clone(),
                move |product| async move {
                    catalog
                        .patch_product(&product.id, patch)
                        .await
                        .map(|_| ())
                        .map_err(ElementError::from)
                },
                &progress,
            )
            .await;

        Ok(result.finish(outcome))
    }
}
