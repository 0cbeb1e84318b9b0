use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

static CATEGORY_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.categoryName").unwrap());
static ITEM_NAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.itemName").unwrap());
static ITEM_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.itemDescription").unwrap());
static ITEM_PRICE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.itemPrice").unwrap());

const CATEGORY_CLASS: &str = "menuCategory";
const PRODUCT_CLASS: &str = "product";

/// Structural role of one child of the menu list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Category {
        label: Option<String>,
    },
    Product {
        name: Option<String>,
        description: Option<String>,
        price: Option<String>,
    },
    Other,
}

pub fn classify(el: ElementRef<'_>) -> Marker {
    if el.value().name() != "li" {
        return Marker::Other;
    }
    if el.value().classes().any(|c| c == CATEGORY_CLASS) {
        return Marker::Category {
            label: first_text(el, &CATEGORY_NAME),
        };
    }
    if el.value().classes().any(|c| c == PRODUCT_CLASS) {
        return Marker::Product {
            name: first_text(el, &ITEM_NAME),
            description: first_text(el, &ITEM_DESCRIPTION),
            price: first_text(el, &ITEM_PRICE),
        };
    }
    Marker::Other
}

/// Trimmed text content of the first descendant matching `selector`.
fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
}

/// Which category owns the products visited next.
///
/// The menu flattens its two levels into one sibling list, so ownership is
/// carried forward from the last category header until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryState {
    #[default]
    AwaitingCategory,
    HaveCategory(String),
}

impl CategoryState {
    /// Move to the header just visited. An empty label owns nothing.
    pub fn enter(self, label: String) -> Self {
        if label.is_empty() {
            CategoryState::AwaitingCategory
        } else {
            CategoryState::HaveCategory(label)
        }
    }

    /// Category for a product seen in this state; empty before any header.
    pub fn current(&self) -> &str {
        match self {
            CategoryState::AwaitingCategory => "",
            CategoryState::HaveCategory(label) => label,
        }
    }
}
