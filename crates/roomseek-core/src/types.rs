//! Request-scoped value types exchanged between pipeline stages.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::numeric::parse_number;

/// Default page returned to the listing engine.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size returned to the listing engine.
pub const DEFAULT_PAGE_SIZE: u32 = 8;
/// Listings are ordered by creation time unless the caller says otherwise.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Listing category the user is searching for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Boarding room (`phòng trọ`).
    PhongTro,
    /// Apartment (`căn hộ`).
    CanHo,
    /// Whole house (`nhà nguyên căn`).
    NhaNguyenCan,
    /// Mini apartment building (`chung cư mini`).
    ChungCuMini,
    Homestay,
    /// Any other category, kept verbatim.
    Other(String),
}

impl Category {
    /// Map a category label (canonical token or free text) to a category.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "phong_tro" | "phòng trọ" => Self::PhongTro,
            "can_ho" | "căn hộ" => Self::CanHo,
            "nha_nguyen_can" | "nhà nguyên căn" => Self::NhaNguyenCan,
            "chung_cu_mini" | "chung cư mini" => Self::ChungCuMini,
            "homestay" => Self::Homestay,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    /// Canonical token accepted by the listing engine.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PhongTro => "phong_tro",
            Self::CanHo => "can_ho",
            Self::NhaNguyenCan => "nha_nguyen_can",
            Self::ChungCuMini => "chung_cu_mini",
            Self::Homestay => "homestay",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which extractor produced an [`ExtractionRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Model,
    RuleBased,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::RuleBased => write!(f, "rule-based"),
        }
    }
}

/// Candidate structured interpretation of a message.
///
/// When `is_room_search_query` is false every other field is meaningless and
/// must be ignored downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub is_room_search_query: bool,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub amenity_names: Option<Vec<String>>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_area: Option<f64>,
    #[serde(default)]
    pub max_area: Option<f64>,
    pub extraction_method: ExtractionMethod,
}

impl ExtractionRecord {
    /// A record for an in-domain message with no fields recognised yet.
    pub fn search(method: ExtractionMethod) -> Self {
        Self {
            is_room_search_query: true,
            category: None,
            province: None,
            ward: None,
            amenity_names: None,
            min_price: None,
            max_price: None,
            min_area: None,
            max_area: None,
            extraction_method: method,
        }
    }

    /// A record for a message that is not a room search.
    pub fn not_search(method: ExtractionMethod) -> Self {
        Self {
            is_room_search_query: false,
            ..Self::search(method)
        }
    }

    /// Verify `min < max` for both ranges whenever both bounds are present.
    pub fn check_bounds(&self) -> Result<()> {
        check_range("price", self.min_price, self.max_price)?;
        check_range("area", self.min_area, self.max_area)
    }
}

/// Sort direction for listing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Canonical, query-ready parameters handed to the listing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameters {
    pub province: Option<String>,
    pub ward: Option<String>,
    pub category: Option<Category>,
    /// Comma-joined amenity catalog identifiers.
    pub amenities: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_area: Option<String>,
    pub max_area: Option<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            province: None,
            ward: None,
            category: None,
            amenities: None,
            min_price: None,
            max_price: None,
            min_area: None,
            max_area: None,
            sort_by: DEFAULT_SORT_FIELD.to_string(),
            sort_order: SortOrder::Desc,
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchParameters {
    /// Convert back into record form; amenity identifiers become the requested names.
    pub fn to_record(&self, method: ExtractionMethod) -> ExtractionRecord {
        ExtractionRecord {
            is_room_search_query: true,
            category: self.category.clone(),
            province: self.province.clone(),
            ward: self.ward.clone(),
            amenity_names: self.amenities.as_ref().map(|ids| {
                ids.split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            }),
            min_price: self.min_price.as_deref().and_then(parse_number),
            max_price: self.max_price.as_deref().and_then(parse_number),
            min_area: self.min_area.as_deref().and_then(parse_number),
            max_area: self.max_area.as_deref().and_then(parse_number),
            extraction_method: method,
        }
    }

    /// Verify `min < max` for both ranges whenever both bounds are present.
    pub fn check_bounds(&self) -> Result<()> {
        let parse = |v: &Option<String>| v.as_deref().and_then(parse_number);
        check_range("price", parse(&self.min_price), parse(&self.max_price))?;
        check_range("area", parse(&self.min_area), parse(&self.max_area))
    }

    /// Whether any search constraint (beyond paging and sorting) is set.
    pub fn has_constraints(&self) -> bool {
        self.province.is_some()
            || self.ward.is_some()
            || self.category.is_some()
            || self.amenities.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.min_area.is_some()
            || self.max_area.is_some()
    }
}

fn check_range(name: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo >= hi => Err(Error::InvariantViolation(format!(
            "{} range inverted: min={} max={}",
            name, lo, hi
        ))),
        _ => Ok(()),
    }
}

/// Prior conversation state supplied on a refinement turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Parameters produced by the previous turn.
    pub previous: SearchParameters,
    /// Number of refinement turns already merged into `previous`.
    #[serde(default)]
    pub turns: u32,
}

/// Inbound user message plus optional conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub text: String,
    #[serde(default)]
    pub prior: Option<ConversationState>,
    /// Record already extracted upstream; skips the model when present.
    #[serde(default)]
    pub pre_extracted: Option<ExtractionRecord>,
}

impl RawMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prior: None,
            pre_extracted: None,
        }
    }

    pub fn with_prior(mut self, prior: ConversationState) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_pre_extracted(mut self, record: ExtractionRecord) -> Self {
        self.pre_extracted = Some(record);
        self
    }
}

/// An administrative region from the province reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub license_plates: Vec<String>,
}

/// An entry of the amenity catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Amenity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
        }
    }
}
