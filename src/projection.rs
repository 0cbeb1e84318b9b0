//! Per-request narrowing of product records to a subset of their fields.
//!
//! Field lists arrive as untrusted comma-separated text. They are resolved
//! against the closed [`Field`] set up front, so anything the projector sees
//! is already a known field and unknown names simply vanish.

use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::db::Product;

/// A product field, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Category,
    Name,
    Description,
    Price,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Category, Field::Name, Field::Description, Field::Price];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Name => "name",
            Field::Description => "description",
            Field::Price => "price",
        }
    }
}

impl FromStr for Field {
    type Err = ();

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL.into_iter().find(|f| f.as_str() == s).ok_or(())
    }
}

/// Split a comma-separated list into known fields, first occurrence wins.
pub fn parse_field_list(raw: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    for name in raw.split(',').filter(|s| !s.is_empty()) {
        match name.parse::<Field>() {
            Ok(field) if !fields.contains(&field) => fields.push(field),
            Ok(_) => {}
            Err(()) => debug!("Ignoring unknown field {:?}", name),
        }
    }
    fields
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keep only the listed fields.
    Include,
    /// Drop the listed fields.
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub mode: Mode,
    pub fields: Vec<Field>,
}

impl Projection {
    pub fn new(mode: Mode, fields: Vec<Field>) -> Self {
        Self { mode, fields }
    }

    pub fn include(raw: &str) -> Self {
        Self::new(Mode::Include, parse_field_list(raw))
    }

    pub fn exclude(raw: &str) -> Self {
        Self::new(Mode::Exclude, parse_field_list(raw))
    }

    pub fn keeps(&self, field: Field) -> bool {
        let listed = self.fields.contains(&field);
        match self.mode {
            Mode::Include => listed,
            Mode::Exclude => !listed,
        }
    }

    pub fn apply(&self, product: &Product) -> PartialProduct {
        PartialProduct::from(product).narrow(self)
    }
}

/// A product with some fields projected away. Serializes in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u16>,
}

impl From<&Product> for PartialProduct {
    fn from(p: &Product) -> Self {
        Self {
            category: Some(p.category.clone()),
            name: Some(p.name.clone()),
            description: Some(p.description.clone()),
            price: Some(p.price),
        }
    }
}

impl PartialProduct {
    /// Apply a further projection. Fields already removed stay removed.
    pub fn narrow(mut self, projection: &Projection) -> Self {
        for field in Field::ALL {
            if !projection.keeps(field) {
                self.clear(field);
            }
        }
        self
    }

    fn clear(&mut self, field: Field) {
        match field {
            Field::Category => self.category = None,
            Field::Name => self.name = None,
            Field::Description => self.description = None,
            Field::Price => self.price = None,
        }
    }
}

pub fn project(products: &[Product], projection: &Projection) -> Vec<PartialProduct> {
    products.iter().map(|p| projection.apply(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tea() -> Product {
        Product {
            category: "Drinks".to_string(),
            name: "Tea".to_string(),
            description: "Hot".to_string(),
            price: 1500,
        }
    }

    #[test]
    fn field_names_are_case_sensitive() {
        assert_eq!("name".parse::<Field>(), Ok(Field::Name));
        assert!("Name".parse::<Field>().is_err());
        assert!("NAME".parse::<Field>().is_err());
    }

    #[test]
    fn field_list_tolerates_empty_segments_and_junk() {
        assert_eq!(
            parse_field_list(",name,,bogus,price,name,"),
            vec![Field::Name, Field::Price]
        );
        assert!(parse_field_list("").is_empty());
        assert!(parse_field_list(",,,").is_empty());
    }

    #[test]
    fn include_name_and_price() {
        let out = Projection::include("name,price").apply(&tea());
        assert_eq!(serde_json::to_value(&out).unwrap(), json!({"name": "Tea", "price": 1500}));
    }

    #[test]
    fn include_nothing_is_empty_object() {
        let out = Projection::include("").apply(&tea());
        assert_eq!(out, PartialProduct::default());
        assert_eq!(serde_json::to_string(&out).unwrap(), "{}");
    }

    #[test]
    fn include_only_unknown_is_empty_object() {
        assert_eq!(
            Projection::include("kategori,fiyat").apply(&tea()),
            PartialProduct::default()
        );
    }

    #[test]
    fn exclude_nothing_is_full_record() {
        let out = Projection::exclude("").apply(&tea());
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::to_value(tea()).unwrap()
        );
    }

    #[test]
    fn exclude_ignores_unknown_names() {
        let out = Projection::exclude("description,colour").apply(&tea());
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"category": "Drinks", "name": "Tea", "price": 1500})
        );
    }

    #[test]
    fn exclude_then_include_does_not_restore() {
        let out = Projection::exclude("price")
            .apply(&tea())
            .narrow(&Projection::include("price"));
        assert_eq!(out, PartialProduct::default());
    }

    #[test]
    fn output_keeps_canonical_order() {
        let out = Projection::include("price,category,name").apply(&tea());
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"category":"Drinks","name":"Tea","price":1500}"#
        );
    }

    #[test]
    fn project_is_per_record() {
        let mut coffee = tea();
        coffee.name = "Coffee".to_string();
        let out = project(&[tea(), coffee], &Projection::include("name"));
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!([{"name": "Tea"}, {"name": "Coffee"}])
        );
    }
}
