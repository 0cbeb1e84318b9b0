use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

pub const DEFAULT_DB_PATH: &str = "data/catalog.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id          INTEGER PRIMARY KEY,
            category    TEXT NOT NULL,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price       INTEGER NOT NULL CHECK(price BETWEEN 0 AND 65535),
            scraped_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
        ",
    )?;
    Ok(())
}

// ── Records ──

/// One catalog entry, in the order it appeared on the source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub category: String,
    pub name: String,
    pub description: String,
    pub price: u16,
}

pub fn count_products(conn: &Connection) -> Result<usize> {
    let n: usize = conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?;
    Ok(n)
}

/// Insert all products in one transaction; either every row lands or none does.
pub fn insert_products(conn: &Connection, products: &[Product]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let count = insert_rows(&tx, products)?;
    tx.commit()?;
    Ok(count)
}

/// Drop the stored catalog and insert a fresh one atomically.
pub fn replace_products(conn: &Connection, products: &[Product]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM products", [])?;
    let count = insert_rows(&tx, products)?;
    tx.commit()?;
    Ok(count)
}

fn insert_rows(conn: &Connection, products: &[Product]) -> Result<usize> {
    let scraped_at = chrono::Utc::now().to_rfc3339();
    let mut stmt = conn.prepare(
        "INSERT INTO products (category, name, description, price, scraped_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut count = 0;
    for p in products {
        count += stmt.execute(rusqlite::params![
            p.category, p.name, p.description, p.price, scraped_at,
        ])?;
    }
    Ok(count)
}

/// All products in insertion (= document) order.
pub fn fetch_products(conn: &Connection) -> Result<Vec<Product>> {
    let mut stmt =
        conn.prepare("SELECT category, name, description, price FROM products ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Product {
                category: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                price: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub products: usize,
    pub categories: usize,
    pub last_scraped_at: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let products = count_products(conn)?;
    let categories: usize =
        conn.query_row("SELECT COUNT(DISTINCT category) FROM products", [], |r| r.get(0))?;
    let last_scraped_at: Option<String> =
        conn.query_row("SELECT MAX(scraped_at) FROM products", [], |r| r.get(0))?;
    Ok(Stats {
        products,
        categories,
        last_scraped_at,
    })
}
