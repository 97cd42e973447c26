//! Rule-based extraction used when the model cannot be used.

use once_cell::sync::Lazy;
use regex::Regex;
use roomseek_core::numeric::parse_number;
use roomseek_core::{Category, ExtractionMethod, ExtractionRecord};

use crate::gate::classify;
use crate::rules::{numbered_ward, AMENITY_RULES, CATEGORY_RULES, NAMED_WARD_RULES, PROVINCE_RULES};

static MAX_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dưới\s*(\d+(?:[.,]\d+)?)\s*triệu").unwrap());

/// Extract search criteria from keywords. Never fails.
///
/// Domain membership comes from [`classify`]; a rejected message yields a
/// non-search record with no fields.
pub fn extract_fallback(message: &str) -> ExtractionRecord {
    if !classify(message).is_in_domain {
        return ExtractionRecord::not_search(ExtractionMethod::RuleBased);
    }

    let lowered = message.to_lowercase();
    let mut record = ExtractionRecord::search(ExtractionMethod::RuleBased);

    if let Some(rule) = CATEGORY_RULES.iter().find(|r| lowered.contains(r.needle)) {
        record.category = Some(Category::from_label(rule.token));
        if let Some((min, max)) = rule.default_area {
            record.min_area = Some(min);
            record.max_area = Some(max);
        }
    }

    if let Some(amount) = MAX_PRICE_RE
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_number(m.as_str()))
    {
        record.max_price = Some((amount * 1_000_000.0).round());
    }

    record.province = PROVINCE_RULES
        .iter()
        .find(|r| r.matches(&lowered))
        .map(|r| r.value.to_string());

    record.ward = numbered_ward(&lowered).or_else(|| {
        NAMED_WARD_RULES
            .iter()
            .find(|r| r.matches(&lowered))
            .map(|r| r.value.to_string())
    });

    let amenities: Vec<String> = AMENITY_RULES
        .iter()
        .filter(|r| r.matches(&lowered))
        .map(|r| r.value.to_string())
        .collect();
    if !amenities.is_empty() {
        record.amenity_names = Some(amenities);
    }

    record
}
