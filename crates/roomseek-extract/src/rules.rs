//! Keyword rule table shared by the relevance gate and the fallback extractor.
//!
//! All needles are lowercase; callers match them against the lowercased
//! message.

use once_cell::sync::Lazy;
use regex::Regex;

/// Terms that mark a message as off-topic (matched on word boundaries).
pub const EXCLUSION_TERMS: &[&str] = &[
    "model",
    "train",
    "ai",
    "artificial intelligence",
    "machine learning",
    "thời tiết",
    "weather",
    "tin tức",
    "news",
    "study",
    "lập trình",
    "programming",
    "code",
    "coding",
    "github",
    "api",
    "database",
    "server",
    "frontend",
    "backend",
    "react",
    "nodejs",
    "python",
    "javascript",
    "html",
    "css",
];

/// Matched as whole phrases only: "công nghệ" must not catch "công nghiệp".
pub const EXCLUSION_PHRASES: &[&str] = &["công nghệ", "technology"];

/// Explicit rental-search phrases (matched on word boundaries).
pub const STRONG_TERMS: &[&str] = &[
    "phòng trọ",
    "căn hộ",
    "thuê phòng",
    "tìm phòng",
    "chung cư",
    "homestay",
];

/// Generic housing, price, location and amenity terms (matched as substrings).
pub const DOMAIN_TERMS: &[&str] = &[
    "nhà thuê",
    "studio",
    "mini house",
    "thuê nhà",
    "phòng",
    "trọ",
    "thuê",
    "tìm",
    "cần",
    "giá",
    "triệu",
    "gần",
    "quận",
    "huyện",
    "tỉnh",
    "thành phố",
    "tp",
    "đại học",
    "university",
    "m2",
    "mét vuông",
    "máy lạnh",
    "gửi xe",
    "parking",
    "security",
    "room",
    "apartment",
    "house",
];

/// A category needle; the first matching rule wins.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub needle: &'static str,
    /// Canonical category token.
    pub token: &'static str,
    /// Area band assumed when the category is named without an area.
    pub default_area: Option<(f64, f64)>,
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        needle: "phòng trọ",
        token: "phong_tro",
        default_area: Some((20.0, 30.0)),
    },
    CategoryRule {
        needle: "căn hộ",
        token: "can_ho",
        default_area: None,
    },
    CategoryRule {
        needle: "nhà nguyên căn",
        token: "nha_nguyen_can",
        default_area: None,
    },
    CategoryRule {
        needle: "chung cư mini",
        token: "chung_cu_mini",
        default_area: None,
    },
    CategoryRule {
        needle: "homestay",
        token: "homestay",
        default_area: None,
    },
];

/// Any of `needles` maps to `value`.
#[derive(Debug, Clone, Copy)]
pub struct AliasRule {
    pub needles: &'static [&'static str],
    pub value: &'static str,
}

impl AliasRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.needles.iter().any(|n| lowered.contains(n))
    }
}

/// Province aliases; the first matching rule wins.
pub const PROVINCE_RULES: &[AliasRule] = &[
    AliasRule {
        needles: &["đh công nghiệp", "gò vấp"],
        value: "Hồ Chí Minh",
    },
    AliasRule {
        needles: &["tp.hcm", "tp hcm", "hồ chí minh"],
        value: "Hồ Chí Minh",
    },
    AliasRule {
        needles: &["hà nội"],
        value: "Hà Nội",
    },
    AliasRule {
        needles: &["đà nẵng"],
        value: "Đà Nẵng",
    },
];

/// Named wards; numbered wards are matched by [`numbered_ward`].
pub const NAMED_WARD_RULES: &[AliasRule] = &[
    AliasRule {
        needles: &["phường tân định"],
        value: "Phường Tân Định",
    },
    AliasRule {
        needles: &["phường bến nghé"],
        value: "Phường Bến Nghé",
    },
    AliasRule {
        needles: &["phường nguyễn thái bình"],
        value: "Phường Nguyễn Thái Bình",
    },
];

// "phường 3", "p3", "p.3" for wards 1-5; "phường 12" is not ward 1.
static NUMBERED_WARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:phường\s*|\bp\.?)([1-5])\b").unwrap());

/// Ward 1-5 named in the lowercased message, as "Phường N".
pub fn numbered_ward(lowered: &str) -> Option<String> {
    NUMBERED_WARD_RE
        .captures(lowered)
        .and_then(|caps| caps.get(1))
        .map(|n| format!("Phường {}", n.as_str()))
}

/// Amenities recognised by the fallback extractor, in check order.
pub const AMENITY_RULES: &[AliasRule] = &[
    AliasRule {
        needles: &["wifi"],
        value: "WiFi",
    },
    AliasRule {
        needles: &["điều hòa"],
        value: "Điều hòa",
    },
    AliasRule {
        needles: &["ban công"],
        value: "Ban công",
    },
    AliasRule {
        needles: &["tủ lạnh"],
        value: "Tủ lạnh",
    },
    AliasRule {
        needles: &["thang máy"],
        value: "Thang máy",
    },
    AliasRule {
        needles: &["bảo vệ"],
        value: "Bảo vệ 24/7",
    },
];

/// Closed amenity vocabulary offered to the model.
pub const MODEL_AMENITY_VOCABULARY: &[&str] = &[
    "wifi",
    "máy lạnh",
    "ban công",
    "điều hòa",
    "tủ lạnh",
    "thang máy",
    "bãi đỗ xe",
    "nhà bếp",
    "tủ quần áo",
    "máy giặt",
    "tivi",
];

/// Every substring that marks a message as in-domain: the generic terms plus
/// every category and amenity needle the fallback extractor reacts to.
pub fn domain_needles() -> impl Iterator<Item = &'static str> {
    DOMAIN_TERMS
        .iter()
        .copied()
        .chain(CATEGORY_RULES.iter().map(|r| r.needle))
        .chain(AMENITY_RULES.iter().flat_map(|r| r.needles.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_ward() {
        assert_eq!(numbered_ward("gần phường 3 quận 10").as_deref(), Some("Phường 3"));
        assert_eq!(numbered_ward("trọ p.2 giá rẻ").as_deref(), Some("Phường 2"));
        assert_eq!(numbered_ward("khu p5").as_deref(), Some("Phường 5"));
        assert_eq!(numbered_ward("phường 12"), None);
        assert_eq!(numbered_ward("phòng trọ"), None);
    }

    #[test]
    fn test_fallback_needles_are_domain_terms() {
        let needles: Vec<_> = domain_needles().collect();
        for rule in CATEGORY_RULES {
            assert!(needles.contains(&rule.needle));
        }
        for rule in AMENITY_RULES {
            for needle in rule.needles {
                assert!(needles.contains(needle));
            }
        }
    }

    #[test]
    fn test_needles_are_lowercase() {
        for needle in domain_needles()
            .chain(STRONG_TERMS.iter().copied())
            .chain(EXCLUSION_TERMS.iter().copied())
        {
            assert_eq!(needle, needle.to_lowercase());
        }
    }
}
