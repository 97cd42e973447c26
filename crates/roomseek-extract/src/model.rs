//! Model-backed structured extraction with fallback.
//!
//! Each call walks a fixed state machine:
//!
//! ```text
//! ModelAttempt ── parsed ──────────────► record (Parsed)
//!      │       └─ repaired ────────────► record (Recovered)
//!      └─ unavailable / failed / malformed / inverted range
//!                  └──► FallbackAttempt ─► record (Fallback), always succeeds
//! ```

use std::sync::Arc;

use roomseek_core::{Error, ExtractionMethod, ExtractionRecord};
use roomseek_infer::{DecodingOptions, InferenceService};
use serde::Serialize;
use tracing::{debug, warn};

use crate::fallback::extract_fallback;
use crate::prompt::build_extraction_prompt;
use crate::record::record_from_value;
use crate::repair::{parse_model_output, RepairStrategy};

/// Why the model attempt was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    ServiceUnavailable(String),
    RequestFailed(String),
    Malformed(String),
    InvariantViolation(String),
}

/// Which branch of the state machine produced the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    Parsed,
    Recovered(RepairStrategy),
    Fallback(FallbackReason),
}

/// A record plus the branch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub record: ExtractionRecord,
    pub path: ExtractionPath,
}

/// Extracts search criteria through an inference service.
pub struct StructuredExtractor {
    inference: Arc<dyn InferenceService>,
    options: DecodingOptions,
}

impl StructuredExtractor {
    pub fn new(inference: Arc<dyn InferenceService>, options: DecodingOptions) -> Self {
        Self { inference, options }
    }

    /// Extract a record. Never fails; degrades to the rule-based extractor.
    pub async fn extract(&self, message: &str, amenity_names: &[String]) -> ExtractionRecord {
        self.extract_with_trace(message, amenity_names).await.record
    }

    /// Like [`extract`](Self::extract), also reporting the branch taken.
    pub async fn extract_with_trace(
        &self,
        message: &str,
        amenity_names: &[String],
    ) -> ExtractionOutcome {
        match self.attempt(message, amenity_names).await {
            Ok((record, path)) => ExtractionOutcome { record, path },
            Err(reason) => {
                warn!("Model extraction failed, using rule-based fallback: {:?}", reason);
                ExtractionOutcome {
                    record: extract_fallback(message),
                    path: ExtractionPath::Fallback(reason),
                }
            }
        }
    }

    async fn attempt(
        &self,
        message: &str,
        amenity_names: &[String],
    ) -> Result<(ExtractionRecord, ExtractionPath), FallbackReason> {
        let health = self.inference.health_probe().await;
        if !health.available {
            let reason = health.reason.unwrap_or_else(|| "unavailable".into());
            warn!("Inference service not available: {}", reason);
            return Err(FallbackReason::ServiceUnavailable(reason));
        }

        let prompt = build_extraction_prompt(message, amenity_names);
        let text = self
            .inference
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| match e {
                Error::ServiceUnavailable(msg) => FallbackReason::ServiceUnavailable(msg),
                other => FallbackReason::RequestFailed(other.to_string()),
            })?;

        let (value, repair) = parse_model_output(&text).map_err(|e| {
            warn!("Unparseable model output: {}", e);
            FallbackReason::Malformed(e.to_string())
        })?;
        if let Some(strategy) = repair {
            debug!("Recovered model output via {:?}", strategy);
        }

        let record = record_from_value(&value, ExtractionMethod::Model).map_err(|e| match e {
            Error::InvariantViolation(msg) => FallbackReason::InvariantViolation(msg),
            other => FallbackReason::Malformed(other.to_string()),
        })?;

        let path = match repair {
            Some(strategy) => ExtractionPath::Recovered(strategy),
            None => ExtractionPath::Parsed,
        };
        Ok((record, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roomseek_core::{Category, Result};
    use roomseek_infer::{DisabledInference, HealthStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Inference service returning a scripted reply.
    struct ScriptedInference {
        healthy: bool,
        reply: std::result::Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedInference {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                healthy: true,
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: &'static str) -> Arc<Self> {
            Arc::new(Self {
                healthy: true,
                reply: Err(error),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedInference {
        async fn health_probe(&self) -> HealthStatus {
            if self.healthy {
                HealthStatus::available()
            } else {
                HealthStatus::unavailable("llama3.2:latest model not found for chat")
            }
        }

        async fn generate(&self, prompt: &str, _options: &DecodingOptions) -> Result<String> {
            assert!(prompt.contains("isRoomSearchQuery"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(Error::Inference(msg.to_string())),
            }
        }
    }

    fn extractor(service: Arc<dyn InferenceService>) -> StructuredExtractor {
        StructuredExtractor::new(service, DecodingOptions::default())
    }

    #[tokio::test]
    async fn test_parsed_model_output() {
        let service = ScriptedInference::replying(
            r#"{"isRoomSearchQuery": true, "category": "can_ho", "province": "Hà Nội",
                "ward": null, "amenityNames": ["wifi"], "minPrice": 5000000,
                "maxPrice": 7000000, "minArea": null, "maxArea": null}"#,
        );
        let outcome = extractor(service.clone())
            .extract_with_trace("căn hộ Hà Nội 5-7 triệu có wifi", &[])
            .await;

        assert_eq!(outcome.path, ExtractionPath::Parsed);
        assert_eq!(outcome.record.category, Some(Category::CanHo));
        assert_eq!(outcome.record.extraction_method, ExtractionMethod::Model);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_truncated_output_is_recovered() {
        let service =
            ScriptedInference::replying(r#"{"isRoomSearchQuery": true, "maxPrice": 3000000"#);
        let outcome = extractor(service).extract_with_trace("phòng dưới 3 triệu", &[]).await;

        assert_eq!(
            outcome.path,
            ExtractionPath::Recovered(RepairStrategy::ClosedBraces(1))
        );
        assert_eq!(outcome.record.max_price, Some(3_000_000.0));
    }

    #[tokio::test]
    async fn test_model_may_reject_message() {
        let service = ScriptedInference::replying(r#"{"isRoomSearchQuery": false}"#);
        let outcome = extractor(service)
            .extract_with_trace("tìm phòng trọ dưới 3 triệu", &[])
            .await;

        assert_eq!(outcome.path, ExtractionPath::Parsed);
        assert!(!outcome.record.is_room_search_query);
        assert_eq!(outcome.record.extraction_method, ExtractionMethod::Model);
    }

    #[tokio::test]
    async fn test_disabled_service_falls_back_without_generating() {
        let outcome = extractor(Arc::new(DisabledInference::new("MCP disabled")))
            .extract_with_trace("tìm phòng trọ dưới 3 triệu", &[])
            .await;

        assert_eq!(
            outcome.path,
            ExtractionPath::Fallback(FallbackReason::ServiceUnavailable("MCP disabled".into()))
        );
        assert_eq!(outcome.record.extraction_method, ExtractionMethod::RuleBased);
        assert_eq!(outcome.record.max_price, Some(3_000_000.0));
    }

    #[tokio::test]
    async fn test_unhealthy_service_is_not_called() {
        let service = Arc::new(ScriptedInference {
            healthy: false,
            reply: Ok("{}"),
            calls: AtomicUsize::new(0),
        });
        let outcome = extractor(service.clone()).extract_with_trace("căn hộ", &[]).await;

        assert!(matches!(
            outcome.path,
            ExtractionPath::Fallback(FallbackReason::ServiceUnavailable(_))
        ));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_failure_falls_back() {
        let outcome = extractor(ScriptedInference::failing("generation timed out after 60s"))
            .extract_with_trace("căn hộ quận 7", &[])
            .await;
        assert!(matches!(
            outcome.path,
            ExtractionPath::Fallback(FallbackReason::RequestFailed(_))
        ));
        assert_eq!(outcome.record.category, Some(Category::CanHo));
    }

    #[tokio::test]
    async fn test_garbage_and_inverted_output_fall_back() {
        let garbage = extractor(ScriptedInference::replying("Tôi không chắc."))
            .extract_with_trace("căn hộ", &[])
            .await;
        assert!(matches!(
            garbage.path,
            ExtractionPath::Fallback(FallbackReason::Malformed(_))
        ));

        let inverted = extractor(ScriptedInference::replying(
            r#"{"isRoomSearchQuery": true, "minArea": 30, "maxArea": 20}"#,
        ))
        .extract_with_trace("căn hộ 25m2", &[])
        .await;
        assert!(matches!(
            inverted.path,
            ExtractionPath::Fallback(FallbackReason::InvariantViolation(_))
        ));
        assert_eq!(inverted.record.extraction_method, ExtractionMethod::RuleBased);

        let missing_flag = extractor(ScriptedInference::replying(r#"{"category": "can_ho"}"#))
            .extract("căn hộ", &[])
            .await;
        assert_eq!(missing_flag.extraction_method, ExtractionMethod::RuleBased);
    }
}
