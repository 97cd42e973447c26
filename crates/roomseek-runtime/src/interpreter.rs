//! Interpreter: runs the interpretation pipeline for one message.

use std::sync::Arc;
use std::time::Instant;

use roomseek_cache::{CacheDecision, MemorySemanticCache, SemanticCache, SemanticCacheAdapter};
use roomseek_core::{
    ConversationState, ExtractionMethod, ExtractionRecord, RawMessage, RoomSeekConfig,
    SearchParameters,
};
use roomseek_extract::{
    classify, extract_fallback, ExtractionPath, RelevanceDecision, StructuredExtractor,
};
use roomseek_infer::{create_inference, DecodingOptions, HealthStatus, InferenceService};
use roomseek_reference::{HttpReferenceSource, ReferenceCache};
use roomseek_resolve::{canonicalize, merge_refinement};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::types::*;

/// The interpretation pipeline and its collaborators.
pub struct Interpreter {
    inference: Arc<dyn InferenceService>,
    extractor: StructuredExtractor,
    cache: SemanticCacheAdapter,
    reference: Arc<ReferenceCache>,
    max_refinement_turns: u32,
}

impl Interpreter {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        cache: Arc<dyn SemanticCache>,
        reference: Arc<ReferenceCache>,
        config: &RoomSeekConfig,
    ) -> Self {
        let options = DecodingOptions::deterministic(&config.inference);
        Self {
            extractor: StructuredExtractor::new(inference.clone(), options),
            inference,
            cache: SemanticCacheAdapter::new(cache),
            reference,
            max_refinement_turns: config.max_refinement_turns,
        }
    }

    /// Build the pipeline with the collaborators described by `config`.
    pub fn from_config(config: &RoomSeekConfig) -> Self {
        let source = Arc::new(HttpReferenceSource::from_config(&config.reference));
        let reference = Arc::new(ReferenceCache::new(source, config.reference.ttl()));
        let cache = Arc::new(MemorySemanticCache::from_config(&config.cache));
        Self::new(create_inference(&config.inference), cache, reference, config)
    }

    pub fn reference(&self) -> &Arc<ReferenceCache> {
        &self.reference
    }

    pub async fn health(&self) -> HealthStatus {
        self.inference.health_probe().await
    }

    /// Interpret a message. Never fails; degraded collaborators only reduce
    /// how many fields are recognised.
    pub async fn interpret(&self, raw: &RawMessage) -> Interpretation {
        let start = Instant::now();
        let mut result = self.run(raw).await;
        result.processing_time_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn run(&self, raw: &RawMessage) -> Interpretation {
        let relevance = classify(&raw.text);
        if !relevance.is_in_domain {
            debug!("Relevance gate rejected message: {:?}", relevance.rule);
            return Interpretation::non_search(relevance, InterpretationSource::QuickCheck);
        }

        // A record supplied with the message takes precedence over the cache.
        if raw.pre_extracted.is_none() {
            if let Some(mut hit) = self.from_cache(raw, &relevance).await {
                if let (Some(prior), None) = (raw.prior.as_ref(), hit.merged_from.as_ref()) {
                    self.refine(&mut hit, prior);
                }
                return hit;
            }
        }

        let amenities = self.reference.amenities().await;
        let amenity_names: Vec<String> = amenities.iter().map(|a| a.name.clone()).collect();

        let (record, source, path) = match raw.pre_extracted.as_ref() {
            Some(record) => match record.check_bounds() {
                Ok(()) => (record.clone(), InterpretationSource::Metadata, None),
                Err(e) => {
                    warn!("Discarding pre-extracted record: {}", e);
                    let record = extract_fallback(&raw.text);
                    (record, InterpretationSource::RuleBased, None)
                }
            },
            None => {
                let outcome = self.extractor.extract_with_trace(&raw.text, &amenity_names).await;
                let source = outcome.record.extraction_method.into();
                (outcome.record, source, Some(outcome.path))
            }
        };

        if !record.is_room_search_query {
            let mut result = Interpretation::non_search(relevance, source);
            result.extraction_method = Some(record.extraction_method);
            result.extraction_path = path;
            return result;
        }

        let mut params = canonicalize(&record, &amenities);
        let mut method = record.extraction_method;
        let mut source = source;
        if let Err(e) = params.check_bounds() {
            warn!("Canonical parameters rejected, using rule-based extraction: {}", e);
            params = canonicalize(&extract_fallback(&raw.text), &amenities);
            method = ExtractionMethod::RuleBased;
            source = InterpretationSource::RuleBased;
        }

        let mut result = Interpretation::search(relevance, params, source);
        result.extraction_method = Some(method);
        result.extraction_path = path;
        if let Some(prior) = raw.prior.as_ref() {
            self.refine(&mut result, prior);
        }
        result
    }

    async fn from_cache(
        &self,
        raw: &RawMessage,
        relevance: &RelevanceDecision,
    ) -> Option<Interpretation> {
        let relevance = relevance.clone();
        let result = match self.cache.lookup(&raw.text, raw.prior.as_ref()).await {
            CacheDecision::Miss => return None,
            CacheDecision::Merged {
                params,
                confidence,
                cached,
                user,
            } => {
                let mut result =
                    Interpretation::search(relevance, params, InterpretationSource::MergedParams);
                result.similarity = Some(confidence);
                result.merged_from = Some(MergedFrom {
                    cached,
                    user,
                    fields_from_cached: Vec::new(),
                });
                result.turns = raw.prior.as_ref().map_or(1, |p| p.turns + 1);
                result
            }
            CacheDecision::Search { params, similarity } => {
                let mut result =
                    Interpretation::search(relevance, params, InterpretationSource::VectorCache);
                result.similarity = Some(similarity);
                result
            }
            CacheDecision::Record { record, similarity } => {
                let amenities = self.reference.amenities().await;
                let params = canonicalize(&record, &amenities);
                let mut result =
                    Interpretation::search(relevance, params, InterpretationSource::VectorCache);
                result.extraction_method = Some(record.extraction_method);
                result.similarity = Some(similarity);
                result
            }
            CacheDecision::Answer {
                payload,
                similarity,
            } => cached_answer(relevance, payload, similarity),
        };
        info!("Served from cache ({:?})", result.source);
        Some(result)
    }

    /// Fold the previous turn's parameters into `result`, newest wins.
    fn refine(&self, result: &mut Interpretation, prior: &ConversationState) {
        if prior.turns >= self.max_refinement_turns {
            info!(
                "Refinement limit of {} turns reached, starting fresh",
                self.max_refinement_turns
            );
            return;
        }
        let Some(current) = result.search_params.take() else {
            return;
        };

        let outcome = merge_refinement(&prior.previous, &current);
        debug!(
            "Merged refinement: kept {:?} from previous turn",
            outcome.from_previous
        );
        result.search_params = Some(outcome.merged);
        result.merged_from = Some(MergedFrom {
            cached: prior.previous.clone(),
            user: current,
            fields_from_cached: outcome.from_previous,
        });
        result.turns = prior.turns + 1;
    }

    /// Write an extraction-produced result back to the semantic cache.
    ///
    /// Gate rejections, cache hits and refinement merges are not written:
    /// the first are cheap to recompute, the others depend on more than the
    /// message text.
    pub async fn remember(&self, message: &str, interpretation: &Interpretation) {
        if !interpretation.source.is_extraction() || interpretation.merged_from.is_some() {
            return;
        }

        let payload = match serde_json::to_value(interpretation) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not serialize interpretation for cache: {}", e);
                return;
            }
        };
        let metadata = json!({
            "type": if interpretation.is_room_search_query { "room-query" } else { "non-room-query" },
            "isRoomSearchQuery": interpretation.is_room_search_query,
            "searchParams": interpretation.search_params,
            "extractionMethod": interpretation.extraction_method,
        });
        self.cache.write(message, &payload, &metadata).await;
    }
}

fn cached_answer(relevance: RelevanceDecision, payload: Value, similarity: f64) -> Interpretation {
    let is_search = payload
        .get("isRoomSearchQuery")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| (!is_search).then(|| NON_SEARCH_MESSAGE.to_string()));

    let mut result = Interpretation::non_search(relevance, InterpretationSource::VectorCache);
    result.is_room_search_query = is_search;
    result.message = message;
    result.similarity = Some(similarity);
    result.cached_answer = Some(payload);
    result
}

/// Parameters a record would canonicalize to without a catalog.
pub fn preview_parameters(record: &ExtractionRecord) -> Option<SearchParameters> {
    record
        .is_room_search_query
        .then(|| canonicalize(record, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roomseek_cache::{CacheLookupResult, NoopSemanticCache};
    use roomseek_core::{Amenity, Category, Province, Result};
    use roomseek_extract::FallbackReason;
    use roomseek_infer::DisabledInference;
    use roomseek_reference::ReferenceDataSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticReference;

    #[async_trait]
    impl ReferenceDataSource for StaticReference {
        async fn fetch_provinces(&self) -> Result<Vec<Province>> {
            Ok(Vec::new())
        }

        async fn fetch_amenities(&self) -> Result<Vec<Amenity>> {
            Ok(vec![
                Amenity::new("a-wifi", "WiFi"),
                Amenity::new("a-balcony", "Ban công"),
            ])
        }
    }

    /// Inference service that answers every prompt with `reply`.
    struct CountingInference {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl CountingInference {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceService for CountingInference {
        async fn health_probe(&self) -> HealthStatus {
            HealthStatus::available()
        }

        async fn generate(&self, _prompt: &str, _options: &DecodingOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    /// Semantic cache returning a fixed lookup result and counting writes.
    struct FixedCache {
        result: CacheLookupResult,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl SemanticCache for FixedCache {
        async fn lookup(
            &self,
            _message: &str,
            _prior: Option<&ConversationState>,
        ) -> Result<CacheLookupResult> {
            Ok(self.result.clone())
        }

        async fn write(&self, _message: &str, _payload: &Value, _metadata: &Value) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn reference() -> Arc<ReferenceCache> {
        Arc::new(ReferenceCache::with_default_ttl(Arc::new(StaticReference)))
    }

    fn interpreter(
        inference: Arc<dyn InferenceService>,
        cache: Arc<dyn SemanticCache>,
    ) -> Interpreter {
        Interpreter::new(inference, cache, reference(), &RoomSeekConfig::default())
    }

    fn offline() -> Interpreter {
        interpreter(
            Arc::new(DisabledInference::new("MCP disabled")),
            Arc::new(NoopSemanticCache),
        )
    }

    #[tokio::test]
    async fn test_gate_rejection_skips_everything() {
        let inference = CountingInference::new("{}");
        let interpreter = interpreter(inference.clone(), Arc::new(NoopSemanticCache));

        let result = interpreter
            .interpret(&RawMessage::new("bạn được train từ model nào"))
            .await;
        assert!(!result.is_room_search_query);
        assert_eq!(result.source, InterpretationSource::QuickCheck);
        assert_eq!(result.message.as_deref(), Some(NON_SEARCH_MESSAGE));
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_rules() {
        let result = offline()
            .interpret(&RawMessage::new("tìm phòng trọ dưới 3 triệu có wifi"))
            .await;

        assert!(result.is_room_search_query);
        assert_eq!(result.source, InterpretationSource::RuleBased);
        assert!(matches!(
            result.extraction_path,
            Some(ExtractionPath::Fallback(FallbackReason::ServiceUnavailable(_)))
        ));
        let params = result.search_params.unwrap();
        assert_eq!(params.category, Some(Category::PhongTro));
        assert_eq!(params.min_price.as_deref(), Some("1800000"));
        assert_eq!(params.max_price.as_deref(), Some("3000000"));
        assert_eq!(params.amenities.as_deref(), Some("a-wifi"));
        assert_eq!(params.min_area.as_deref(), Some("20"));
        assert_eq!(params.max_area.as_deref(), Some("30"));
    }

    #[tokio::test]
    async fn test_model_extraction_is_canonicalized() {
        let inference = CountingInference::new(
            r#"{"isRoomSearchQuery": true, "category": "can_ho", "amenityNames": ["ban công"],
                "maxPrice": 10000000, "minArea": 18}"#,
        );
        let result = interpreter(inference, Arc::new(NoopSemanticCache))
            .interpret(&RawMessage::new("căn hộ có ban công dưới 10 triệu 18m2"))
            .await;

        assert_eq!(result.source, InterpretationSource::Model);
        assert_eq!(result.extraction_path, Some(ExtractionPath::Parsed));
        let params = result.search_params.unwrap();
        assert_eq!(params.amenities.as_deref(), Some("a-balcony"));
        assert_eq!(params.min_price.as_deref(), Some("6000000"));
        assert_eq!(params.max_area.as_deref(), Some("23"));
    }

    #[tokio::test]
    async fn test_model_non_search_propagates() {
        let inference = CountingInference::new(r#"{"isRoomSearchQuery": false}"#);
        let result = interpreter(inference, Arc::new(NoopSemanticCache))
            .interpret(&RawMessage::new("giá vàng hôm nay"))
            .await;
        assert!(!result.is_room_search_query);
        assert_eq!(result.source, InterpretationSource::Model);
        assert!(result.search_params.is_none());
    }

    #[tokio::test]
    async fn test_pre_extracted_record_skips_model() {
        let inference = CountingInference::new("{}");
        let mut record = ExtractionRecord::search(ExtractionMethod::RuleBased);
        record.province = Some("Đà Nẵng".into());

        let result = interpreter(inference.clone(), Arc::new(NoopSemanticCache))
            .interpret(&RawMessage::new("phòng ở Đà Nẵng").with_pre_extracted(record))
            .await;
        assert_eq!(result.source, InterpretationSource::Metadata);
        assert_eq!(
            result.search_params.unwrap().province.as_deref(),
            Some("Đà Nẵng")
        );
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_merged_cache_hit_bypasses_extractors() {
        let cached = SearchParameters {
            province: Some("Hà Nội".into()),
            category: Some(Category::CanHo),
            ..Default::default()
        };
        let user = SearchParameters {
            max_price: Some("8000000".into()),
            ..Default::default()
        };
        let merged = SearchParameters {
            max_price: user.max_price.clone(),
            ..cached.clone()
        };
        let cache = Arc::new(FixedCache {
            result: CacheLookupResult::MergedHit {
                merged: merged.clone(),
                confidence: 0.87,
                source_cached: cached.clone(),
                source_user: user.clone(),
            },
            writes: AtomicUsize::new(0),
        });
        let inference = CountingInference::new("{}");
        let interpreter = interpreter(inference.clone(), cache.clone());

        let raw = RawMessage::new("căn hộ rẻ hơn, dưới 8 triệu").with_prior(ConversationState {
            previous: cached.clone(),
            turns: 1,
        });
        let result = interpreter.interpret(&raw).await;

        assert_eq!(result.source, InterpretationSource::MergedParams);
        assert_eq!(result.search_params, Some(merged));
        assert_eq!(result.similarity, Some(0.87));
        let from = result.merged_from.clone().unwrap();
        assert_eq!(from.cached, cached);
        assert_eq!(from.user, user);
        assert_eq!(result.turns, 2);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);

        interpreter.remember(&raw.text, &result).await;
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_search_and_answer() {
        let hit = CacheLookupResult::DirectHit {
            payload: json!({ "isRoomSearchQuery": true }),
            metadata: json!({
                "isRoomSearchQuery": true,
                "searchParams": { "category": "homestay" }
            }),
            similarity: 0.95,
        };
        let cache = Arc::new(FixedCache {
            result: hit,
            writes: AtomicUsize::new(0),
        });
        let result = interpreter(Arc::new(DisabledInference::new("off")), cache)
            .interpret(&RawMessage::new("homestay Đà Lạt"))
            .await;
        assert_eq!(result.source, InterpretationSource::VectorCache);
        assert_eq!(
            result.search_params.unwrap().category,
            Some(Category::Homestay)
        );

        let answer = CacheLookupResult::DirectHit {
            payload: json!({ "isRoomSearchQuery": false, "message": "Xin lỗi" }),
            metadata: Value::Null,
            similarity: 0.99,
        };
        let cache = Arc::new(FixedCache {
            result: answer,
            writes: AtomicUsize::new(0),
        });
        let result = interpreter(Arc::new(DisabledInference::new("off")), cache)
            .interpret(&RawMessage::new("giá phòng hôm nay"))
            .await;
        assert!(!result.is_room_search_query);
        assert_eq!(result.message.as_deref(), Some("Xin lỗi"));
        assert!(result.cached_answer.is_some());
    }

    #[tokio::test]
    async fn test_refinement_merge_and_limit() {
        let previous = SearchParameters {
            province: Some("Hà Nội".into()),
            category: Some(Category::CanHo),
            ..Default::default()
        };
        let interpreter = offline();

        let raw = RawMessage::new("thêm wifi nhé").with_prior(ConversationState {
            previous: previous.clone(),
            turns: 0,
        });
        let result = interpreter.interpret(&raw).await;
        let params = result.search_params.clone().unwrap();
        assert_eq!(params.province.as_deref(), Some("Hà Nội"));
        assert_eq!(params.category, Some(Category::CanHo));
        assert_eq!(params.amenities.as_deref(), Some("a-wifi"));
        assert_eq!(result.turns, 1);
        assert_eq!(
            result.merged_from.unwrap().fields_from_cached,
            vec!["province", "category"]
        );

        let exhausted = RawMessage::new("thêm wifi nhé").with_prior(ConversationState {
            previous,
            turns: 5,
        });
        let result = interpreter.interpret(&exhausted).await;
        let params = result.search_params.unwrap();
        assert_eq!(params.province, None);
        assert_eq!(result.turns, 0);
        assert!(result.merged_from.is_none());
    }

    #[tokio::test]
    async fn test_remember_writes_extraction_results_only() {
        let cache = Arc::new(FixedCache {
            result: CacheLookupResult::Miss,
            writes: AtomicUsize::new(0),
        });
        let interpreter = interpreter(Arc::new(DisabledInference::new("off")), cache.clone());

        let rejected = interpreter.interpret(&RawMessage::new("aaaaaaaaaa")).await;
        interpreter.remember("aaaaaaaaaa", &rejected).await;
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);

        let found = interpreter.interpret(&RawMessage::new("căn hộ quận 7")).await;
        interpreter.remember("căn hộ quận 7", &found).await;
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
    }

    fn memory_cache() -> Arc<MemorySemanticCache> {
        Arc::new(MemorySemanticCache::new(10, Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn test_cached_refinement_keeps_prior_constraints() {
        let interpreter = interpreter(Arc::new(DisabledInference::new("off")), memory_cache());
        let first = interpreter.interpret(&RawMessage::new("thêm wifi nhé")).await;
        interpreter.remember("thêm wifi nhé", &first).await;

        let previous = SearchParameters {
            province: Some("Hà Nội".into()),
            category: Some(Category::CanHo),
            ..Default::default()
        };
        let raw = RawMessage::new("thêm wifi nhé").with_prior(ConversationState {
            previous: previous.clone(),
            turns: 0,
        });
        let result = interpreter.interpret(&raw).await;

        assert_eq!(result.source, InterpretationSource::VectorCache);
        let params = result.search_params.clone().unwrap();
        assert_eq!(params.province.as_deref(), Some("Hà Nội"));
        assert_eq!(params.category, Some(Category::CanHo));
        assert_eq!(params.amenities.as_deref(), Some("a-wifi"));
        assert_eq!(result.turns, 1);
        let from = result.merged_from.unwrap();
        assert_eq!(from.cached, previous);
        assert_eq!(from.fields_from_cached, vec!["province", "category"]);
    }

    #[tokio::test]
    async fn test_pre_extracted_record_wins_over_cache() {
        let interpreter = interpreter(Arc::new(DisabledInference::new("off")), memory_cache());
        let first = interpreter.interpret(&RawMessage::new("phòng ở Đà Nẵng")).await;
        interpreter.remember("phòng ở Đà Nẵng", &first).await;

        let mut record = ExtractionRecord::search(ExtractionMethod::Model);
        record.province = Some("Hà Nội".into());
        record.max_price = Some(4_000_000.0);
        let result = interpreter
            .interpret(&RawMessage::new("phòng ở Đà Nẵng").with_pre_extracted(record))
            .await;

        assert_eq!(result.source, InterpretationSource::Metadata);
        let params = result.search_params.unwrap();
        assert_eq!(params.province.as_deref(), Some("Hà Nội"));
        assert_eq!(params.min_price.as_deref(), Some("2400000"));
    }

    #[test]
    fn test_preview_parameters() {
        let record = extract_fallback("tìm phòng trọ dưới 3 triệu");
        let params = preview_parameters(&record).unwrap();
        assert_eq!(params.min_price.as_deref(), Some("1800000"));
        assert!(preview_parameters(&extract_fallback("xin chào")).is_none());
    }
}
