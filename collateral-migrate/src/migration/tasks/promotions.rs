//! Backfill `HasCollateralBundle = false` on promotion documents
//!
//! The document store throttles bursts, so writes go through the sequential
//! applier instead of the batch executor.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{MigrationTask, TaskContext};
use crate::docdb::DocumentStore;
use crate::migration::applier::SequentialApplier;
use crate::migration::progress::Progress;
use crate::migration::report::{ElementError, MigrationResult};

pub const PROMOTION_QUERY: &str = "SELECT * FROM root";
pub const BUNDLE_FLAG: &str = "HasCollateralBundle";

pub fn is_candidate(document: &Value) -> bool {
    document.get(BUNDLE_FLAG).is_none()
}

fn document_id(document: &Value) -> Option<&str> {
    document.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Promotion document waiting for a replace, keyed for the error report
struct Pending {
    key: String,
    document: Value,
}

pub struct PromotionsTask {
    store: Arc<dyn DocumentStore>,
    applier: SequentialApplier,
}

impl PromotionsTask {
    pub fn new(store: Arc<dyn DocumentStore>, applier: SequentialApplier) -> Self {
        Self { store, applier }
    }
}

#[async_trait]
impl MigrationTask for PromotionsTask {
    fn name(&self) -> &'static str {
        "promotions"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<MigrationResult> {
        let mut result = MigrationResult::new(self.name(), ctx.dry_run);
        let store = self.store.as_ref();

        let documents = store.query_documents(PROMOTION_QUERY).await?;
        result.total_records = documents.len();

        let pending: Vec<Pending> = documents
            .into_iter()
            .filter(is_candidate)
            .enumerate()
            .map(|(n, document)| Pending {
                key: document_id(&document)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("<missing id #{}>", n)),
                document,
            })
            .collect();
        result.candidates = pending.len();
        result.already_migrated = result.total_records - result.candidates;

        log::info!(
            "{} of {} promotions need {} ({} already set)",
            result.candidates,
            result.total_records,
            BUNDLE_FLAG,
            result.already_migrated
        );

        let ids: Vec<String> = pending.iter().map(|p| p.key.clone()).collect();
        ctx.record_candidates(self.name(), &ids);

        if ctx.dry_run || pending.is_empty() {
            return Ok(result.finish_without_batch());
        }

        let progress = Progress::new("promotions", pending.len());
        let outcome = self
            .applier
            .run(
                pending,
                |p| p.key.clone(),
                move |Pending { mut document, .. }| async move {
                    let Some(id) = document_id(&document).map(str::to_string) else {
                        return Err(ElementError::failed("Document has no id"));
                    };
                    if let Value::Object(fields) = &mut document {
                        fields.insert(BUNDLE_FLAG.to_string(), Value::Bool(false));
                    }
                    store
                        .replace_document(&id, &document)
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
