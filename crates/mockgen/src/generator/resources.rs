//! Resource-name inference and representative resource bodies.

use super::classify::path_segments;
use crate::schema::capitalize;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

const FALLBACK_RESOURCE: &str = "resource";

/// A trailing segment that addresses one item: a pure integer.
fn is_item_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Singular resource name for a URL.
///
/// Uses the last segment, or the one before it when the last is numeric, and
/// strips one trailing `s`.
pub fn infer_resource_name(url: &str) -> String {
    let segments = path_segments(url);
    let name = match segments.as_slice() {
        [.., parent, last] if is_item_segment(last) => *parent,
        [.., last] if !is_item_segment(last) => *last,
        _ => "",
    };

    let singular = name.strip_suffix('s').unwrap_or(name);
    if singular.is_empty() {
        FALLBACK_RESOURCE.to_string()
    } else {
        singular.to_string()
    }
}

/// Numeric id in the trailing segment, or 1.
pub fn extract_id(url: &str) -> u64 {
    path_segments(url)
        .last()
        .and_then(|last| last.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Last numeric segment anywhere in the URL, or 1.
///
/// `/requests/8/approve` addresses entity 8 even though the trailing segment
/// is the action name.
pub fn entity_id(url: &str) -> u64 {
    path_segments(url)
        .iter()
        .rev()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .find_map(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Whether the URL addresses a collection rather than a single item.
pub fn is_collection(url: &str) -> bool {
    !path_segments(url).last().is_some_and(|last| is_item_segment(last))
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build a representative body for one resource.
///
/// The field set is picked by the first keyword contained in `resource`;
/// unknown resources get a generic shape.
pub fn mock_resource(resource: &str, id: u64, now: DateTime<Utc>) -> Value {
    let ts = timestamp(now);
    let lower = resource.to_ascii_lowercase();

    if lower.contains("user") {
        json!({
            "id": id,
            "name": "John Doe",
            "email": "john@example.com",
            "role": "user",
            "avatar": format!("https://i.pravatar.cc/150?u={id}"),
            "createdAt": ts,
        })
    } else if lower.contains("product") {
        json!({
            "id": id,
            "title": "Sample Product",
            "price": 49.99,
            "currency": "USD",
            "inStock": true,
            "sku": format!("SKU-{id:05}"),
        })
    } else if lower.contains("order") {
        json!({
            "id": id,
            "orderNumber": format!("ORD-{id:06}"),
            "status": "processing",
            "total": 129.97,
            "items": [{"productId": 1, "quantity": 2, "price": 49.99}],
            "createdAt": ts,
        })
    } else if lower.contains("post") {
        json!({
            "id": id,
            "title": "Sample Post",
            "content": "Lorem ipsum dolor sit amet.",
            "authorId": 1,
            "tags": ["sample"],
            "publishedAt": ts,
        })
    } else if lower.contains("comment") {
        json!({
            "id": id,
            "postId": 1,
            "author": "Jane Smith",
            "text": "Great post!",
            "createdAt": ts,
        })
    } else if lower.contains("categor") {
        json!({
            "id": id,
            "name": format!("Category {id}"),
            "slug": format!("category-{id}"),
            "parentId": null,
        })
    } else if lower.contains("file") {
        json!({
            "id": id,
            "filename": format!("document-{id}.pdf"),
            "mimeType": "application/pdf",
            "size": 102400,
            "url": format!("https://files.example.com/document-{id}.pdf"),
            "uploadedAt": ts,
        })
    } else if lower.contains("notification") {
        json!({
            "id": id,
            "title": "New notification",
            "message": "You have a new message",
            "read": false,
            "createdAt": ts,
        })
    } else if lower.contains("payment") {
        json!({
            "id": id,
            "amount": 99.99,
            "currency": "USD",
            "method": "card",
            "status": "completed",
            "paidAt": ts,
        })
    } else if lower.contains("addres") {
        json!({
            "id": id,
            "street": "123 Main St",
            "city": "Springfield",
            "postalCode": "12345",
            "country": "US",
        })
    } else if lower.contains("review") {
        json!({
            "id": id,
            "rating": 5,
            "title": "Excellent",
            "comment": "Would buy again.",
            "userId": 1,
            "createdAt": ts,
        })
    } else if lower.contains("cart") {
        json!({
            "id": id,
            "items": [{"productId": 1, "quantity": 1, "price": 49.99}],
            "subtotal": 49.99,
            "currency": "USD",
            "updatedAt": ts,
        })
    } else {
        json!({
            "id": id,
            "name": format!("{} {}", capitalize(resource), id),
            "description": format!("Mock {resource} description"),
            "createdAt": ts,
            "updatedAt": ts,
        })
    }
}
