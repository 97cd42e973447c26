//! Runtime types.

use roomseek_core::{ConversationState, ExtractionMethod, SearchParameters};
use roomseek_extract::{ExtractionPath, RelevanceDecision};
use serde::Serialize;
use serde_json::Value;

/// Reply for messages that are not room searches.
pub const NON_SEARCH_MESSAGE: &str = "Em xin lỗi, nhưng em chỉ có thể hỗ trợ các câu hỏi liên quan đến tìm kiếm phòng trọ, căn hộ và các dịch vụ bất động sản. Nếu Anh/Chị có nhu cầu tìm phòng trọ hoặc căn hộ, em rất sẵn lòng hỗ trợ!";

/// Stage that produced an [`Interpretation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpretationSource {
    /// Rejected by the relevance gate.
    QuickCheck,
    /// Served from the semantic cache.
    VectorCache,
    /// Merged-parameters cache hit on a refinement turn.
    MergedParams,
    /// Pre-extracted record supplied with the message.
    Metadata,
    Model,
    RuleBased,
}

impl InterpretationSource {
    /// Whether the result came out of an extractor and may be cached.
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Metadata | Self::Model | Self::RuleBased)
    }
}

impl From<ExtractionMethod> for InterpretationSource {
    fn from(method: ExtractionMethod) -> Self {
        match method {
            ExtractionMethod::Model => Self::Model,
            ExtractionMethod::RuleBased => Self::RuleBased,
        }
    }
}

/// The two parameter sets a merged result was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedFrom {
    pub cached: SearchParameters,
    pub user: SearchParameters,
    /// Fields kept from `cached`; empty when the cache did the merge.
    #[serde(rename = "fieldsFromCached", skip_serializing_if = "Vec::is_empty")]
    pub fields_from_cached: Vec<&'static str>,
}

/// Final result of interpreting one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub is_room_search_query: bool,
    pub search_params: Option<SearchParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub source: InterpretationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_path: Option<ExtractionPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<MergedFrom>,
    /// Cached non-search answer, returned verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_answer: Option<Value>,
    pub relevance: RelevanceDecision,
    /// Refinement turns merged into `search_params`.
    pub turns: u32,
    pub processing_time_ms: u64,
}

impl Interpretation {
    pub(crate) fn non_search(relevance: RelevanceDecision, source: InterpretationSource) -> Self {
        Self {
            is_room_search_query: false,
            search_params: None,
            message: Some(NON_SEARCH_MESSAGE.to_string()),
            source,
            extraction_method: None,
            extraction_path: None,
            similarity: None,
            merged_from: None,
            cached_answer: None,
            relevance,
            turns: 0,
            processing_time_ms: 0,
        }
    }

    pub(crate) fn search(
        relevance: RelevanceDecision,
        params: SearchParameters,
        source: InterpretationSource,
    ) -> Self {
        Self {
            is_room_search_query: true,
            search_params: Some(params),
            message: None,
            ..Self::non_search(relevance, source)
        }
    }

    /// Conversation state to send back with the next refinement turn.
    pub fn conversation_state(&self) -> Option<ConversationState> {
        self.search_params.as_ref().map(|params| ConversationState {
            previous: params.clone(),
            turns: self.turns,
        })
    }
}
