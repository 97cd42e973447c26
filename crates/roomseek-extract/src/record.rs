//! Coercion of loosely typed model JSON into an `ExtractionRecord`.

use roomseek_core::numeric::parse_number;
use roomseek_core::{Category, Error, ExtractionMethod, ExtractionRecord, Result};
use serde_json::{Map, Value};

/// Values the model echoes back from the template instead of leaving null.
const PLACEHOLDERS: &[&str] = &[
    "",
    "null",
    "none",
    "undefined",
    "n/a",
    "tên_tỉnh_thành",
    "tên_phường_xã",
    "tên_tiện_ích1",
    "tên_tiện_ích2",
    "số_tiền_vnd",
    "diện_tích_m2",
];

/// Convert a parsed JSON object into a validated record.
///
/// Fails with `MalformedOutput` when `isRoomSearchQuery` is missing or not a
/// boolean, and with `InvariantViolation` when a range is inverted.
pub fn record_from_value(value: &Value, method: ExtractionMethod) -> Result<ExtractionRecord> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::MalformedOutput("expected a JSON object".into()))?;

    let is_search = match object.get("isRoomSearchQuery") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(other) => {
            return Err(Error::MalformedOutput(format!(
                "isRoomSearchQuery is not a boolean: {}",
                other
            )))
        }
        None => {
            return Err(Error::MalformedOutput(
                "isRoomSearchQuery is missing".into(),
            ))
        }
    };

    if !is_search {
        return Ok(ExtractionRecord::not_search(method));
    }

    let record = ExtractionRecord {
        is_room_search_query: true,
        category: text_field(object, &["category"]).map(|c| Category::from_label(&c)),
        province: text_field(object, &["province", "provinceName"]),
        ward: text_field(object, &["ward", "wardName"]),
        amenity_names: amenity_names(object.get("amenityNames")),
        min_price: number_field(object, "minPrice"),
        max_price: number_field(object, "maxPrice"),
        min_area: number_field(object, "minArea"),
        max_area: number_field(object, "maxArea"),
        extraction_method: method,
    };

    record.check_bounds()?;
    Ok(record)
}

fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    if PLACEHOLDERS.contains(&lowered.as_str()) || trimmed.contains('|') {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First non-placeholder string among `keys`.
fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| object.get(*k).and_then(Value::as_str))
        .find_map(clean_text)
}

fn amenity_names(value: Option<&Value>) -> Option<Vec<String>> {
    let names: Vec<String> = match value? {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(clean_text)
            .collect(),
        Value::String(s) => s.split(',').filter_map(clean_text).collect(),
        _ => Vec::new(),
    };
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Numbers or numeric strings; zero, negative and unparseable values are absent.
fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }?;
    (value > 0.0).then_some(value)
}
