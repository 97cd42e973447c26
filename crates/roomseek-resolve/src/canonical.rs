//! Parameter canonicalizer.

use roomseek_core::numeric::format_number;
use roomseek_core::{Amenity, ExtractionRecord, SearchParameters};
use tracing::debug;

/// Lowest floor derived from a stated maximum price, in VND.
pub const MIN_PRICE_FLOOR: f64 = 500_000.0;
/// Derived floor as a fraction of the stated maximum.
pub const MIN_PRICE_RATIO: f64 = 0.6;
/// Width of the area band derived from a stated minimum, in m².
pub const AREA_SPAN: f64 = 5.0;

/// Map a record to canonical search parameters. Pure given its inputs.
///
/// A non-search record yields the default parameters.
pub fn canonicalize(record: &ExtractionRecord, catalog: &[Amenity]) -> SearchParameters {
    if !record.is_room_search_query {
        return SearchParameters::default();
    }

    let min_price = record
        .min_price
        .or_else(|| record.max_price.and_then(derive_min_price));
    let max_area = record
        .max_area
        .or_else(|| record.min_area.map(|min| min + AREA_SPAN));

    SearchParameters {
        province: record.province.clone(),
        ward: record.ward.clone(),
        category: record.category.clone(),
        amenities: record
            .amenity_names
            .as_deref()
            .and_then(|names| resolve_amenities(names, catalog)),
        min_price: min_price.map(format_number),
        max_price: record.max_price.map(format_number),
        min_area: record.min_area.map(format_number),
        max_area: max_area.map(format_number),
        ..SearchParameters::default()
    }
}

/// Floor derived from a maximum price: `max(500 000, 0.6 × max)`, or
/// `0.6 × max` when that floor would not stay below the maximum.
pub fn derive_min_price(max_price: f64) -> Option<f64> {
    if max_price <= 0.0 {
        return None;
    }
    let ratio = (max_price * MIN_PRICE_RATIO).round();
    let floor = ratio.max(MIN_PRICE_FLOOR);
    Some(if floor < max_price { floor } else { ratio })
}

/// Resolve requested amenity names to comma-joined catalog identifiers.
///
/// A token equal to a catalog id resolves to that id; otherwise the first
/// catalog entry whose name contains the token, or is contained in it,
/// wins (case-insensitive). Duplicates keep their first position.
pub fn resolve_amenities(requested: &[String], catalog: &[Amenity]) -> Option<String> {
    let mut ids: Vec<&str> = Vec::new();

    for name in requested {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            continue;
        }

        let found = catalog
            .iter()
            .find(|a| a.id.to_lowercase() == wanted)
            .or_else(|| {
                catalog.iter().find(|a| {
                    let have = a.name.to_lowercase();
                    !have.is_empty() && (have.contains(&wanted) || wanted.contains(&have))
                })
            });

        match found {
            Some(amenity) if !ids.contains(&amenity.id.as_str()) => ids.push(&amenity.id),
            Some(_) => {}
            None => debug!("No catalog amenity matches '{}'", name),
        }
    }

    if ids.is_empty() {
        None
    } else {
        Some(ids.join(","))
    }
}
