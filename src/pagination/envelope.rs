//! Response-shape normalisation
//!
//! Billomat wraps list responses as
//!
//! ```text
//! { "invoices": { "invoice": [ {..}, {..} ], "@page": "1", "@per_page": "100", "@total": "2" } }
//! ```
//!
//! Counts arrive as numeric strings, a page holding exactly one record
//! carries an object instead of a list, and an empty collection omits the
//! data key entirely.

use super::types::PageResult;
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::types::{JsonObject, JsonValue, Record};

/// Parse a count that may be encoded as a number or a numeric string.
///
/// Decimal strings (`"1500.0"`) are accepted. Negative and non-finite values
/// are rejected.
pub fn parse_count(value: &JsonValue) -> Option<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Number of pages needed for `total` records at `per_page` records each.
///
/// Computed as `ceil(total / per_page)` in floating point. An exact multiple
/// never yields an extra page.
pub fn page_count(total: f64, per_page: f64) -> u64 {
    if per_page <= 0.0 || total <= 0.0 {
        return 0;
    }
    (total / per_page).ceil() as u64
}

/// Parse one list response into a [`PageResult`]
pub fn parse_page(body: &JsonValue, resource: &Resource, requested_page: u32) -> Result<PageResult> {
    let envelope = envelope(body, resource)?;

    let total = count_field(envelope, "@total", resource)?;
    let per_page = count_field(envelope, "@per_page", resource)?;
    if per_page < 1.0 {
        return Err(Error::malformed(
            resource.path,
            format!("'@per_page' must be positive, got {per_page}"),
        ));
    }

    let page = envelope
        .get("@page")
        .and_then(parse_count)
        .map_or(requested_page, |p| p as u32);

    let items = if total <= 0.0 {
        Vec::new()
    } else {
        extract_items(envelope, resource)?
    };

    Ok(PageResult::new(items, total, per_page, page))
}

/// Records under the resource's data key, normalised to a list
pub fn extract_items(envelope: &JsonObject, resource: &Resource) -> Result<Vec<Record>> {
    match envelope.get(resource.data_key) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Object(record)) => Ok(vec![record.clone()]),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object().cloned().ok_or_else(|| {
                    Error::malformed(
                        resource.path,
                        format!("'{}' entries must be objects", resource.data_key),
                    )
                })
            })
            .collect(),
        Some(_) => Err(Error::malformed(
            resource.path,
            format!("'{}' must be an object or a list", resource.data_key),
        )),
    }
}

/// Unwrap a single-record response such as `{ "invoice": { .. } }`.
///
/// Bodies without the wrapper are returned unchanged.
pub fn extract_single(body: JsonValue, resource: &Resource) -> Result<Record> {
    match body {
        JsonValue::Object(map) => match map.get(resource.data_key) {
            Some(JsonValue::Object(inner)) => Ok(inner.clone()),
            _ => Ok(map),
        },
        other => Err(Error::malformed(
            resource.path,
            format!("expected a JSON object, got {other}"),
        )),
    }
}

fn envelope<'a>(body: &'a JsonValue, resource: &Resource) -> Result<&'a JsonObject> {
    body.get(resource.path)
        .and_then(JsonValue::as_object)
        .ok_or_else(|| {
            Error::malformed(
                resource.path,
                format!("missing '{}' envelope", resource.path),
            )
        })
}

fn count_field(envelope: &JsonObject, field: &str, resource: &Resource) -> Result<f64> {
    let value = envelope
        .get(field)
        .ok_or_else(|| Error::malformed(resource.path, format!("missing '{field}'")))?;
    parse_count(value).ok_or_else(|| {
        Error::malformed(
            resource.path,
            format!("'{field}' is not a count: {value}"),
        )
    })
}
