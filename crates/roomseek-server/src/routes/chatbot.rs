//! Chatbot routes: message interpretation and pipeline status.
//! Served under /api/chatbot.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use roomseek_core::{ConversationState, ExtractionMethod, ExtractionRecord, RawMessage, SearchParameters};
use roomseek_extract::record_from_value;
use roomseek_runtime::{Interpretation, InterpretationSource, MergedFrom};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub const EMPTY_MESSAGE_ERROR: &str = "Tin nhắn không được để trống";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chatbot/message", post(post_message))
        .route("/chatbot/status", get(get_status))
        .route("/chatbot/provinces", get(get_provinces))
        .route("/chatbot/amenities", get(get_amenities))
}

/// Body of `POST /chatbot/message`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_state: Option<ConversationState>,
    /// Record extracted upstream, in model-output form.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Reply to `POST /chatbot/message`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
    pub request_id: String,
    pub is_room_search_query: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<SearchParameters>,
    pub suggestions: Vec<&'static str>,
    pub source: InterpretationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<MergedFrom>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_state: Option<ConversationState>,
    /// Milliseconds spent in the pipeline.
    pub processing_time: u64,
    pub timestamp: String,
}

impl MessageReply {
    fn new(request_id: String, interpretation: Interpretation) -> Self {
        let suggestions = suggestions(&interpretation);
        let conversation_state = interpretation.conversation_state();
        Self {
            request_id,
            is_room_search_query: interpretation.is_room_search_query,
            message: interpretation.message,
            search_params: interpretation.search_params,
            suggestions,
            source: interpretation.source,
            extraction_method: interpretation.extraction_method,
            similarity: interpretation.similarity,
            merged_from: interpretation.merged_from,
            conversation_state,
            processing_time: interpretation.processing_time_ms,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------
// Message interpretation
// ---------------------------------------------------------------

async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let text = req.message.trim();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": EMPTY_MESSAGE_ERROR,
            })),
        )
            .into_response();
    }

    let request_id = Uuid::new_v4().to_string();
    let mut raw = RawMessage::new(text);
    raw.prior = req.conversation_state;
    raw.pre_extracted = req.metadata.as_ref().and_then(pre_extracted);

    let interpretation = state.interpreter.interpret(&raw).await;
    state.interpreter.remember(text, &interpretation).await;

    info!(
        "[{}] {:?} search={} in {}ms",
        request_id,
        interpretation.source,
        interpretation.is_room_search_query,
        interpretation.processing_time_ms
    );

    Json(serde_json::json!({
        "success": true,
        "data": MessageReply::new(request_id, interpretation),
    }))
    .into_response()
}

/// Read an upstream record; unusable metadata is ignored.
fn pre_extracted(metadata: &Value) -> Option<ExtractionRecord> {
    if metadata.is_null() {
        return None;
    }
    match record_from_value(metadata, ExtractionMethod::Model) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring request metadata: {}", e);
            None
        }
    }
}

/// Follow-up prompts shown under the reply.
pub fn suggestions(interpretation: &Interpretation) -> Vec<&'static str> {
    if !interpretation.is_room_search_query {
        return vec![
            "Tìm phòng trọ phù hợp",
            "Tìm căn hộ chung cư",
            "Tìm nhà nguyên căn",
            "Xem tin đăng mới nhất",
        ];
    }

    match interpretation.search_params.as_ref() {
        Some(params) if params.has_constraints() => {
            let mut out = Vec::new();
            if params.category.is_some() {
                out.push("Xem thêm cùng loại hình");
            }
            if params.max_price.is_some() {
                out.push("Tìm với mức giá khác");
            }
            if params.province.is_some() {
                out.push("Tìm khu vực lân cận");
            }
            out.push("Lọc theo tiện ích");
            out
        }
        _ => vec![
            "Hãy cho tôi biết bạn đang tìm loại phòng gì?",
            "Bạn có ngân sách dự kiến không?",
            "Khu vực nào bạn muốn tìm kiếm?",
            "Xem các tin đăng mới nhất",
        ],
    }
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let health = state.interpreter.health().await;
    let reference = state.interpreter.reference().snapshot();

    Json(serde_json::json!({
        "success": true,
        "data": {
            "inference": health,
            "referenceData": reference,
            "timestamp": Utc::now().to_rfc3339(),
        },
    }))
}

// ---------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------

async fn get_provinces(State(state): State<Arc<AppState>>) -> Json<Value> {
    let provinces = state.interpreter.reference().provinces().await;
    Json(serde_json::json!({
        "success": true,
        "data": provinces.as_slice(),
    }))
}

async fn get_amenities(State(state): State<Arc<AppState>>) -> Json<Value> {
    let amenities = state.interpreter.reference().amenities().await;
    Json(serde_json::json!({
        "success": true,
        "data": amenities.as_slice(),
    }))
}
