//! Relevance gate: decides whether a message is worth interpreting.
//!
//! Ordered rules, first match wins. Missing a search costs less than
//! sending chatter to the model, so every uncertain case ends up out of
//! domain.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::rules::{domain_needles, EXCLUSION_PHRASES, EXCLUSION_TERMS, STRONG_TERMS};

/// The rule that decided a [`RelevanceDecision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceRule {
    TooShort,
    RepeatedCharacter,
    NoLetters,
    MeaninglessToken,
    ExcludedKeyword(String),
    ExcludedPhrase(String),
    StrongKeyword(String),
    DomainKeyword(String),
    NoDomainKeyword,
}

/// Outcome of the relevance gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceDecision {
    pub is_in_domain: bool,
    pub rule: RelevanceRule,
}

impl RelevanceDecision {
    fn accept(rule: RelevanceRule) -> Self {
        Self {
            is_in_domain: true,
            rule,
        }
    }

    fn reject(rule: RelevanceRule) -> Self {
        Self {
            is_in_domain: false,
            rule,
        }
    }
}

static MEANINGLESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:[a-z]{8,}|[0-9]{5,}|[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]{5,})$"#).unwrap()
});

static EXCLUSION_RE: Lazy<Regex> = Lazy::new(|| word_alternation(EXCLUSION_TERMS));
static EXCLUSION_PHRASE_RE: Lazy<Regex> = Lazy::new(|| word_alternation(EXCLUSION_PHRASES));
static STRONG_RE: Lazy<Regex> = Lazy::new(|| word_alternation(STRONG_TERMS));

/// `\b(?:t1|t2|...)\b`, longest terms first so phrases beat their prefixes.
fn word_alternation(terms: &[&str]) -> Regex {
    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    let body = sorted
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})\b", body)).unwrap()
}

/// Classify a message. Pure and deterministic.
pub fn classify(message: &str) -> RelevanceDecision {
    let lowered = message.trim().to_lowercase();

    if lowered.chars().count() < 2 {
        return RelevanceDecision::reject(RelevanceRule::TooShort);
    }
    if has_repeated_run(&lowered, 5) {
        return RelevanceDecision::reject(RelevanceRule::RepeatedCharacter);
    }
    if !lowered.chars().any(char::is_alphabetic) {
        return RelevanceDecision::reject(RelevanceRule::NoLetters);
    }
    if MEANINGLESS_RE.is_match(&lowered) {
        return RelevanceDecision::reject(RelevanceRule::MeaninglessToken);
    }
    if let Some(m) = EXCLUSION_RE.find(&lowered) {
        return RelevanceDecision::reject(RelevanceRule::ExcludedKeyword(m.as_str().into()));
    }
    if let Some(m) = EXCLUSION_PHRASE_RE.find(&lowered) {
        return RelevanceDecision::reject(RelevanceRule::ExcludedPhrase(m.as_str().into()));
    }
    if let Some(m) = STRONG_RE.find(&lowered) {
        return RelevanceDecision::accept(RelevanceRule::StrongKeyword(m.as_str().into()));
    }
    if let Some(term) = domain_needles().find(|n| lowered.contains(n)) {
        return RelevanceDecision::accept(RelevanceRule::DomainKeyword(term.into()));
    }

    RelevanceDecision::reject(RelevanceRule::NoDomainKeyword)
}

/// True when some character occurs `run` or more times in a row.
fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut count = 0;
    for c in text.chars() {
        if Some(c) == prev {
            count += 1;
        } else {
            prev = Some(c);
            count = 1;
        }
        if count >= run {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(message: &str) -> RelevanceRule {
        classify(message).rule
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(rule(""), RelevanceRule::TooShort);
        assert_eq!(rule(" a "), RelevanceRule::TooShort);
        assert_eq!(rule("aaaaaaaaaa"), RelevanceRule::RepeatedCharacter);
        assert_eq!(rule("phòng trọ!!!!!"), RelevanceRule::RepeatedCharacter);
        assert_eq!(rule("12345 678"), RelevanceRule::NoLetters);
        assert_eq!(rule("???"), RelevanceRule::NoLetters);
        assert_eq!(rule("qwertyuiop"), RelevanceRule::MeaninglessToken);
    }

    #[test]
    fn test_rejects_model_question() {
        let decision = classify("bạn được train từ model nào");
        assert!(!decision.is_in_domain);
        assert!(matches!(decision.rule, RelevanceRule::ExcludedKeyword(_)));
    }

    #[test]
    fn test_exclusion_is_word_bounded() {
        // "ai" inside "mai" or "tại" must not trigger the exclusion list
        assert!(classify("ngày mai tôi cần thuê phòng tại quận 7").is_in_domain);
        assert_eq!(
            rule("tôi muốn học AI"),
            RelevanceRule::ExcludedKeyword("ai".into())
        );
    }

    #[test]
    fn test_exclusion_phrase_does_not_catch_industry() {
        assert_eq!(
            rule("tin về công nghệ mới"),
            RelevanceRule::ExcludedPhrase("công nghệ".into())
        );
        assert_eq!(
            rule("phòng trọ gần đh công nghiệp"),
            RelevanceRule::StrongKeyword("phòng trọ".into())
        );
    }

    #[test]
    fn test_strong_and_domain_keywords() {
        assert_eq!(
            rule("Tìm căn hộ ở Đà Nẵng"),
            RelevanceRule::StrongKeyword("căn hộ".into())
        );
        assert!(matches!(
            rule("có wifi không"),
            RelevanceRule::DomainKeyword(_)
        ));
        assert!(classify("nhà nguyên căn 3 phòng ngủ").is_in_domain);
    }

    #[test]
    fn test_unrelated_chatter() {
        assert_eq!(rule("xin chào bạn"), RelevanceRule::NoDomainKeyword);
        assert!(!classify("hello there").is_in_domain);
    }

    #[test]
    fn test_repeated_run() {
        assert!(has_repeated_run("xxaaaaa", 5));
        assert!(!has_repeated_run("aaaabaaaa", 5));
    }
}
