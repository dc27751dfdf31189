//! Exhaustive collection of paginated list endpoints

use anyhow::{Context, Result};
use std::future::Future;

use crate::api::{ListOptions, ListPage};

/// Fetch every page of a list endpoint into memory, in server order.
///
/// `fetch` is called with `options` pointed at page 1, 2, ... until the
/// server reports no further pages or returns an empty page. Any fetch
/// failure aborts the whole collection.
pub async fn collect_all<T, F, Fut>(label: &str, options: ListOptions, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(ListOptions) -> Fut,
    Fut: Future<Output = Result<ListPage<T>>>,
{
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let result = fetch(options.with_page(page))
            .await
            .with_context(|| format!("Failed to fetch {} page {}", label, page))?;

        let count = result.items.len();
        let has_more = result.has_more();
        log::debug!(
            "Fetched {} {} on page {}/{}, has_next={}",
            count,
            label,
            page,
            result.meta.total_pages,
            has_more
        );
        records.extend(result.items);

        if !has_more || count == 0 {
            break;
        }
        page += 1;
    }

    log::info!("Fetched {} total {}", records.len(), label);
    Ok(records)
}
