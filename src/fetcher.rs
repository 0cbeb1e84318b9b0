use std::time::{Duration, Instant};

use anyhow::Context;
use rusqlite::Connection;
use tracing::info;

use crate::db::{self, Product};
use crate::error::ScrapeError;
use crate::parser;

const USER_AGENT: &str = concat!("menu_catalog/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the menu page. The timeout bounds the single fetch of a run.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ScrapeError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Fetch the menu page once. No retries: a failure here ends the run.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<String, ScrapeError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status,
        });
    }
    Ok(response.text().await?)
}

/// Fetch and extract the whole catalog.
pub async fn scrape(client: &reqwest::Client, url: &str) -> Result<Vec<Product>, ScrapeError> {
    info!("Scraping menu from {}", url);
    let start = Instant::now();
    let html = fetch_document(client, url).await?;
    let products = parser::extract(&html)?;
    info!(
        "Scraped {} products ({} bytes) in {}ms",
        products.len(),
        html.len(),
        start.elapsed().as_millis()
    );
    Ok(products)
}

/// Populate an empty store from the menu page; a populated store is left alone
/// and no request is made. Returns the number of products inserted.
pub async fn seed_if_empty(
    conn: &Connection,
    client: &reqwest::Client,
    url: &str,
) -> anyhow::Result<usize> {
    if db::count_products(conn)? > 0 {
        info!("Catalog already stored, skipping scrape");
        return Ok(0);
    }
    info!("Database is empty, scraping menu...");
    let products = scrape(client, url)
        .await
        .with_context(|| format!("Scrape of {} failed", url))?;
    let n = db::insert_products(conn, &products)?;
    info!("Inserted {} products", n);
    Ok(n)
}
