//! `buyers` command: list catalog buyers so an operator can set `catalog.buyer_id`

use anyhow::Result;
use colored::*;

use crate::api::{Buyer, CatalogApi, CatalogClient, ListOptions};
use crate::config::Config;
use crate::migration::collect_all;

pub async fn handle_buyers_command(config: &Config) -> Result<()> {
    let client = CatalogClient::new(
        config.catalog_url()?,
        config.credentials()?,
        config.resilience().concurrency,
    );
    let buyers = fetch_buyers(&client).await?;

    if buyers.is_empty() {
        println!("{}", "No buyers found".yellow());
        return Ok(());
    }

    let configured = config.catalog.buyer_id.as_deref();
    for buyer in &buyers {
        println!("{}", buyer_line(buyer, configured));
    }
    println!();
    println!("{} buyers", buyers.len().to_string().bold());
    Ok(())
}

async fn fetch_buyers(catalog: &dyn CatalogApi) -> Result<Vec<Buyer>> {
    collect_all("buyers", ListOptions::new(), move |options| async move {
        catalog.list_buyers(&options).await
    })
    .await
}

fn buyer_line(buyer: &Buyer, configured: Option<&str>) -> String {
    let marker = if configured == Some(buyer.id.as_str()) { "*" } else { " " };
    let state = if buyer.active {
        String::new()
    } else {
        " (inactive)".dimmed().to_string()
    };
    format!(
        "{} {}  {}{}",
        marker,
        buyer.id.bright_cyan(),
        buyer.name.as_deref().unwrap_or(""),
        state
    )
}
