pub mod markers;
pub mod price;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::db::Product;
use markers::{CategoryState, Marker};

static MENU: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul.menu").unwrap());

/// The page no longer has the shape the extractor was written against.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("menu item #{index}: missing or empty {field}")]
    MissingField { field: &'static str, index: usize },
    #[error("unrecognised price {raw:?}")]
    InvalidPrice { raw: String },
}

/// Walk the first `ul.menu` and turn its children into products, in document order.
///
/// A page without a menu yields no products. A header without a label puts the
/// following products back into the uncategorised state. Any malformed product
/// aborts the whole run so a changed page layout never turns into half-parsed rows.
pub fn extract(html: &str) -> Result<Vec<Product>, ParseError> {
    let doc = Html::parse_document(html);
    let Some(menu) = doc.select(&MENU).next() else {
        debug!("No ul.menu found in document");
        return Ok(Vec::new());
    };

    let mut state = CategoryState::default();
    let mut products = Vec::new();

    for (index, child) in menu.children().filter_map(ElementRef::wrap).enumerate() {
        match markers::classify(child) {
            Marker::Category { label } => {
                let label = label.unwrap_or_default();
                if label.is_empty() {
                    debug!("Menu child #{} is a category without a label", index);
                }
                state = state.enter(label);
            }
            Marker::Product {
                name,
                description,
                price,
            } => {
                let name = non_empty(name, "item name", index)?;
                let price_text = non_empty(price, "item price", index)?;
                products.push(Product {
                    category: state.current().to_string(),
                    name,
                    description: description.unwrap_or_default(),
                    price: price::parse_price(&price_text)?,
                });
            }
            Marker::Other => {
                debug!("Skipping menu child #{} <{}>", index, child.value().name());
            }
        }
    }

    Ok(products)
}

fn non_empty(
    value: Option<String>,
    field: &'static str,
    index: usize,
) -> Result<String, ParseError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingField { field, index })
}
