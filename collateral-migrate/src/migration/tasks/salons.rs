//! Backfill `xp.CollateralClassificationID` on salons (SoldTo* user groups)
//!
//! The id is looked up from the salon's `xp.Classification` label. Salons
//! without any classification are counted separately and left untouched.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{MigrationTask, TaskContext};
use crate::api::{CatalogApi, ExtendedRecord, ListOptions, UserGroup};
use crate::migration::classification::ClassificationMap;
use crate::migration::collector::collect_all;
use crate::migration::executor::BatchExecutor;
use crate::migration::progress::Progress;
use crate::migration::report::{ElementError, MigrationResult};

pub const SOURCE_FIELD: &str = "Classification";
pub const TARGET_FIELD: &str = "CollateralClassificationID";
pub const SALON_ID_PATTERN: &str = "SoldTo*";

/// Where a salon stands with respect to this migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalonState {
    Candidate,
    AlreadyMigrated,
    /// No classification label to derive the id from
    Unclassifiable,
}

/// Classification label of a salon. Any other non-null value is read as its
/// JSON text, so it still goes through the lookup and is reported if unmapped.
pub fn classification_label(salon: &UserGroup) -> Option<String> {
    if let Some(label) = salon.xp_str(SOURCE_FIELD) {
        return Some(label.to_string());
    }
    match salon.xp()?.get(SOURCE_FIELD)? {
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

pub fn salon_state(salon: &UserGroup) -> SalonState {
    if salon.has_xp_key(TARGET_FIELD) {
        SalonState::AlreadyMigrated
    } else if classification_label(salon).is_none() {
        SalonState::Unclassifiable
    } else {
        SalonState::Candidate
    }
}

pub fn classification_patch(classification_id: &str) -> Value {
    json!({ "xp": { TARGET_FIELD: classification_id } })
}

pub struct SalonsTask {
    catalog: Arc<dyn CatalogApi>,
    buyer_id: String,
    classifications: Arc<ClassificationMap>,
    executor: BatchExecutor,
}

impl SalonsTask {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        buyer_id: impl Into<String>,
        classifications: Arc<ClassificationMap>,
        executor: BatchExecutor,
    ) -> Self {
        Self {
            catalog,
            buyer_id: buyer_id.into(),
            classifications,
            executor,
        }
    }

    /// Fail unless the configured buyer actually exists
    async fn verify_buyer(&self) -> Result<()> {
        let catalog = self.catalog.as_ref();
        let options = ListOptions::new().filter("ID", self.buyer_id.as_str());
        let buyers = collect_all("buyers", options, move |options| async move {
            catalog.list_buyers(&options).await
        })
        .await?;

        if !buyers.iter().any(|b| b.id == self.buyer_id) {
            anyhow::bail!("Buyer '{}' not found in catalog", self.buyer_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationTask for SalonsTask {
    fn name(&self) -> &'static str {
        "salons"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<MigrationResult> {
        let mut result = MigrationResult::new(self.name(), ctx.dry_run);
        self.verify_buyer().await?;

        let catalog = self.catalog.as_ref();
        let buyer_id = self.buyer_id.as_str();
        let options = ListOptions::new().filter("ID", SALON_ID_PATTERN);
        let salons = collect_all("salons", options, move |options| async move {
            catalog.list_user_groups(buyer_id, &options).await
        })
        .await?;
        result.total_records = salons.len();

        let mut candidates = Vec::new();
        for salon in salons {
            match salon_state(&salon) {
                SalonState::Candidate => candidates.push(salon),
                SalonState::AlreadyMigrated => result.already_migrated += 1,
                SalonState::Unclassifiable => result.unclassifiable += 1,
            }
        }
        result.candidates = candidates.len();

        log::info!(
            "{} of {} salons under buyer {} need {} ({} already set)",
            result.candidates,
            result.total_records,
            buyer_id,
            TARGET_FIELD,
            result.already_migrated
        );
        if result.unclassifiable > 0 {
            log::warn!(
                "{} salons have no {} and were left untouched",
                result.unclassifiable,
                SOURCE_FIELD
            );
        }

        let ids: Vec<String> = candidates.iter().map(|s| s.id.clone()).collect();
        ctx.record_candidates(self.name(), &ids);

        if ctx.dry_run || candidates.is_empty() {
            return Ok(result.finish_without_batch());
        }

        let classifications = self.classifications.as_ref();
        log::debug!("Resolving against {} classification labels", classifications.len());
        let progress = Progress::new("salons", candidates.len());
        let outcome = self
            .executor
            .run(
                candidates,
                |salon| salon.id.clone(),
                move |salon| async move {
                    let label = classification_label(&salon).unwrap_or_default();
                    let Some(classification_id) = classifications.resolve(&label) else {
                        let record = serde_json::to_value(&salon).unwrap_or(Value::Null);
                        return Err(ElementError::Unresolvable { label, record });
                    };
                    catalog
                        .patch_user_group(buyer_id, &salon.id, &classification_patch(classification_id))
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
