use serde::{Deserialize, Serialize};

/// A product as published by the catalog store.
///
/// Everything except the name and price is optional in the upstream data, so
/// every field tolerates absence; the document builder renders placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "original_price")]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub discount: Option<u32>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default, alias = "in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub image: Option<String>,
}

impl CatalogRecord {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_rating(mut self, rating: f64, reviews: u32) -> Self {
        self.rating = Some(rating);
        self.reviews = Some(reviews);
        self
    }

    pub fn with_discount(mut self, original_price: f64, discount: u32) -> Self {
        self.original_price = Some(original_price);
        self.discount = Some(discount);
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Label for the record in logs and errors: its id, or its name when the id is
    /// missing. Not unique; document ids come from `build_document_at`.
    pub fn key(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_catalog_entry() {
        let json = r#"{
            "id": "4",
            "name": "AirPods Pro (3rd Gen)",
            "price": 249,
            "originalPrice": 299,
            "discount": 17,
            "inStock": true,
            "features": ["Spatial Audio"]
        }"#;

        let record: CatalogRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.key(), "4");
        assert_eq!(record.original_price, Some(299.0));
        assert_eq!(record.discount, Some(17));
        assert!(record.in_stock);
        assert_eq!(record.category, None);
    }

    #[test]
    fn accepts_snake_case_store_columns() {
        let json = r#"{"name": "Mouse", "price": 79, "in_stock": true, "original_price": 99}"#;
        let record: CatalogRecord = serde_json::from_str(json).unwrap();

        assert!(record.in_stock);
        assert_eq!(record.original_price, Some(99.0));
    }

    #[test]
    fn key_falls_back_to_name() {
        let record = CatalogRecord::new("Widget", 10.0);
        assert_eq!(record.key(), "Widget");

        let record = record.with_id("  ");
        assert_eq!(record.key(), "Widget");
    }
}
