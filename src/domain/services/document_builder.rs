use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::domain::{CatalogRecord, Document};

const UNNAMED_PRODUCT: &str = "Unnamed product";
const DEFAULT_CATEGORY: &str = "General";
const NO_PRICE: &str = "Price not available";
const NO_DESCRIPTION: &str = "No description available";
const NO_FEATURES: &str = "No features listed";
const NO_RATINGS: &str = "No ratings";
const NO_BADGE: &str = "None";

/// Namespace for document ids so repopulating the same catalog replaces documents
/// instead of duplicating them.
const DOCUMENT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x1c, 0x3a, 0x52, 0x9e, 0x0b, 0x4d, 0x7a, 0x8c, 0x41, 0x2f, 0xd3, 0x15, 0x77, 0xa0, 0x64,
]);

/// Deterministic id for the document built from the record at `position` in its
/// catalog.
///
/// Records with an explicit id map to the same document wherever they appear.
/// Id-less records are keyed on their position and rendered content instead, so
/// two of them never share an id even when their names match.
pub fn document_id(record: &CatalogRecord, position: usize) -> String {
    let seed = match record.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => format!("id:{}", id),
        _ => format!("pos:{}:{}", position, render_content(record)),
    };
    Uuid::new_v5(&DOCUMENT_NAMESPACE, seed.as_bytes()).to_string()
}

/// Flatten a catalog record into a searchable document with no embedding.
///
/// Lines always appear in the same order and absent fields are spelled out with a
/// placeholder, so two records differing in one field differ in exactly one line.
pub fn build_document(record: &CatalogRecord) -> Document {
    build_document_at(record, 0)
}

/// Like [`build_document`] for the record at `position` in a catalog.
pub fn build_document_at(record: &CatalogRecord, position: usize) -> Document {
    let content = render_content(record);
    Document::new(document_id(record, position), content).with_metadata(build_metadata(record))
}

pub fn render_content(record: &CatalogRecord) -> String {
    let name = if record.name.trim().is_empty() {
        UNNAMED_PRODUCT
    } else {
        record.name.trim()
    };

    let category = non_empty(record.category.as_deref()).unwrap_or(DEFAULT_CATEGORY);

    let description = non_empty(record.description.as_deref()).unwrap_or(NO_DESCRIPTION);

    let features = match record.features.as_deref() {
        Some(features) if !features.is_empty() => features.join(", "),
        _ => NO_FEATURES.to_string(),
    };

    let rating = match record.rating {
        Some(rating) => format!(
            "{}/5 ({} reviews)",
            format_number(rating),
            record.reviews.unwrap_or(0)
        ),
        None => NO_RATINGS.to_string(),
    };

    let availability = if record.in_stock {
        "In Stock"
    } else {
        "Out of Stock"
    };

    let badge = non_empty(record.badge.as_deref()).unwrap_or(NO_BADGE);

    [
        format!("Product: {}", name),
        format!("Category: {}", category),
        format!("Price: {}", render_price(record)),
        format!("Description: {}", description),
        format!("Features: {}", features),
        format!("Rating: {}", rating),
        format!("Availability: {}", availability),
        format!("Badge: {}", badge),
    ]
    .join("\n")
}

fn render_price(record: &CatalogRecord) -> String {
    let Some(price) = record.price else {
        return NO_PRICE.to_string();
    };

    let mut line = format!("${}", format_number(price));
    if let Some(original) = record.original_price {
        line.push_str(&format!(" (was ${})", format_number(original)));
    }
    if let Some(discount) = record.discount.filter(|d| *d > 0) {
        line.push_str(&format!(", {}% off", discount));
    }
    line
}

fn build_metadata(record: &CatalogRecord) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("productId".to_string(), json!(record.key()));
    metadata.insert("name".to_string(), json!(record.name));
    metadata.insert("category".to_string(), json!(record.category));
    metadata.insert("price".to_string(), json!(record.price));
    metadata.insert("originalPrice".to_string(), json!(record.original_price));
    metadata.insert("rating".to_string(), json!(record.rating));
    metadata.insert("reviews".to_string(), json!(record.reviews));
    metadata.insert("inStock".to_string(), json!(record.in_stock));
    metadata.insert("badge".to_string(), json!(record.badge));
    metadata.insert("discount".to_string(), json!(record.discount));
    metadata
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Whole amounts print without decimals ("3899"), others with at most two ("19.99").
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let rounded = format!("{:.2}", value);
        rounded
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
