//! Instruction prompt for model-backed extraction.

use crate::rules::MODEL_AMENITY_VOCABULARY;

/// Build the extraction prompt for `message`.
///
/// `catalog_names` extends the closed amenity vocabulary with names from the
/// live amenity catalog.
pub fn build_extraction_prompt(message: &str, catalog_names: &[String]) -> String {
    let vocabulary = amenity_vocabulary(catalog_names)
        .iter()
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Bạn là bộ phân tích yêu cầu tìm phòng. Đọc tin nhắn và trả về đúng một đối tượng JSON.
Tin nhắn: "{message}"

Đối tượng JSON gồm đúng 9 trường:
{{
  "isRoomSearchQuery": true hoặc false,
  "category": "phong_tro" | "can_ho" | "nha_nguyen_can" | "chung_cu_mini" | "homestay" | null,
  "province": chuỗi hoặc null,
  "ward": chuỗi hoặc null,
  "amenityNames": mảng chuỗi hoặc null,
  "minPrice": số VND hoặc null,
  "maxPrice": số VND hoặc null,
  "minArea": số m2 hoặc null,
  "maxArea": số m2 hoặc null
}}

isRoomSearchQuery:
- true khi tin nhắn tìm hoặc thuê phòng trọ, căn hộ, nhà ở.
- false khi tin nhắn hỏi về AI, mô hình, dữ liệu huấn luyện, công nghệ, thời tiết, tin tức hoặc chủ đề khác.
- "bạn được train từ model nào" → false; "tìm phòng trọ gần ĐH Công Nghiệp" → true.

category:
- "phòng trọ" → "phong_tro"; "căn hộ" → "can_ho"; "nhà nguyên căn" → "nha_nguyen_can";
  "chung cư mini" → "chung_cu_mini"; "homestay" → "homestay".
- Loại khác: ghi đúng tên loại. Không nhắc tới: null.

province:
- "TP.HCM", "Hồ Chí Minh", "Thành phố Hồ Chí Minh" → "Thành phố Hồ Chí Minh".
- "Đà Nẵng" → "Thành phố Đà Nẵng".
- Tỉnh/thành khác: giữ nguyên tên. Không nhắc tới: null.

ward:
- "P1", "P.1", "Phường 1" → "Phường 1".
- "Xã Tân Phú" → "Xã Tân Phú"; "Thị trấn Long Thành" → "Thị trấn Long Thành".
- Nếu chỉ nhắc quận/huyện, lấy phường/xã thuộc quận/huyện đó nếu có. Không nhắc tới: null.

amenityNames:
- Chỉ dùng các giá trị trong danh sách [{vocabulary}].
- Tiện ích ngoài danh sách: "tiện ích khác". Không nhắc tới: null.

minPrice / maxPrice (VND):
- "dưới 3 triệu" → minPrice 2000000, maxPrice 3000000.
- Khoảng giá "5-7 triệu" → minPrice 5000000, maxPrice 7000000.
- Luôn bảo đảm minPrice < maxPrice. Không nhắc tới: null.

minArea / maxArea (m2):
- Diện tích cụ thể v (ví dụ "22m2") → minArea khoảng v-2, maxArea khoảng v+3 (20 và 25).
- Luôn bảo đảm minArea < maxArea. Không nhắc tới: null.

Chỉ trả về JSON hợp lệ. Không giải thích, không thêm chữ nào ngoài JSON."#
    )
}

/// The fixed vocabulary followed by lowercased catalog names not already in it.
pub fn amenity_vocabulary(catalog_names: &[String]) -> Vec<String> {
    let mut vocabulary: Vec<String> = MODEL_AMENITY_VOCABULARY
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in catalog_names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !vocabulary.contains(&name) {
            vocabulary.push(name);
        }
    }
    vocabulary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_message_and_contract() {
        let prompt = build_extraction_prompt("tìm phòng trọ quận 1", &[]);
        assert!(prompt.contains("Tin nhắn: \"tìm phòng trọ quận 1\""));
        for field in [
            "isRoomSearchQuery",
            "category",
            "province",
            "ward",
            "amenityNames",
            "minPrice",
            "maxPrice",
            "minArea",
            "maxArea",
        ] {
            assert!(prompt.contains(&format!("\"{}\"", field)), "{}", field);
        }
        assert!(prompt.contains("\"tủ quần áo\""));
    }

    #[test]
    fn test_vocabulary_extended_by_catalog() {
        let vocabulary = amenity_vocabulary(&["WiFi".into(), "Hồ bơi".into(), " ".into()]);
        assert_eq!(vocabulary.len(), MODEL_AMENITY_VOCABULARY.len() + 1);
        assert_eq!(vocabulary.last().map(String::as_str), Some("hồ bơi"));
    }
}
