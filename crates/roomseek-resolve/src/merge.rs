//! Refinement merge: fold a follow-up turn into the previous parameters.
//!
//! Newest wins per field. Price and area are merged as whole ranges: if the
//! new turn states either bound, both bounds come from the new turn, so a
//! valid range never combines with half of another one.

use roomseek_core::SearchParameters;
use serde::Serialize;

/// Merged parameters with per-field provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub merged: SearchParameters,
    /// Fields carried over from the previous turn.
    pub from_previous: Vec<&'static str>,
    /// Fields stated in the current turn.
    pub from_current: Vec<&'static str>,
}

/// Merge `current` over `previous`.
pub fn merge_refinement(previous: &SearchParameters, current: &SearchParameters) -> MergeOutcome {
    let mut merged = current.clone();
    let mut from_previous = Vec::new();
    let mut from_current = Vec::new();

    macro_rules! field {
        ($name:literal, $($field:ident),+) => {
            if $(current.$field.is_some())||+ {
                from_current.push($name);
            } else if $(previous.$field.is_some())||+ {
                $(merged.$field = previous.$field.clone();)+
                from_previous.push($name);
            }
        };
    }

    field!("province", province);
    field!("ward", ward);
    field!("category", category);
    field!("amenities", amenities);
    field!("price", min_price, max_price);
    field!("area", min_area, max_area);

    MergeOutcome {
        merged,
        from_previous,
        from_current,
    }
}
