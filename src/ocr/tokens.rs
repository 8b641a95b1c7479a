use crate::core::geometry::BBox;
use crate::core::model::{
    NormalizedToken, PageDimensions, PageSide, TokenNormalization, WordToken, FULL_PAGE_REGION,
};
use crate::ocr::schema::{OcrPage, OcrWord};

/// A word that survived filtering, with its pixel box and region tag.
struct RawWord {
    text: String,
    confidence: Option<f64>,
    bbox_px: BBox,
    region: Option<i32>,
}

fn usable_words(page: &OcrPage) -> impl Iterator<Item = RawWord> + '_ {
    page.blocks.iter().flat_map(|block| {
        block
            .paragraphs
            .iter()
            .flat_map(|p| p.words.iter())
            .filter_map(move |word| raw_word(word, block.region))
    })
}

fn raw_word(word: &OcrWord, region: Option<i32>) -> Option<RawWord> {
    let vertices = word.vertices();
    if vertices.len() < 4 {
        return None;
    }
    let text = word.resolved_text();
    if text.is_empty() {
        return None;
    }
    let bbox_px = BBox::from_points(vertices.iter().map(|v| (v.x, v.y)))?;
    Some(RawWord {
        text,
        confidence: word.confidence,
        bbox_px,
        region,
    })
}

fn has_valid_dimensions(page: &OcrPage) -> bool {
    page.width > 0.0 && page.height > 0.0
}

pub fn page_dimensions(page: &OcrPage) -> PageDimensions {
    PageDimensions {
        width: page.width,
        height: page.height,
    }
}

/// Flat list of page-normalized words for clustering and column assignment.
pub fn extract_word_tokens(page: &OcrPage) -> Vec<WordToken> {
    if !has_valid_dimensions(page) {
        return Vec::new();
    }
    usable_words(page)
        .map(|w| {
            WordToken::new(
                w.text,
                w.confidence,
                w.bbox_px.normalize(page.width, page.height),
            )
        })
        .collect()
}

/// Stable token set with contiguous IDs starting at zero.
pub fn normalize_tokens(page: &OcrPage, page_side: PageSide) -> TokenNormalization {
    let dims = page_dimensions(page);
    if !has_valid_dimensions(page) {
        return TokenNormalization::empty(dims);
    }

    let tokens = usable_words(page)
        .enumerate()
        .map(|(idx, w)| {
            let bbox_px = w.bbox_px.clamp(page.width, page.height);
            NormalizedToken {
                token_id: idx as u32,
                text: w.text,
                confidence: w.confidence,
                bbox_px,
                bbox_norm: bbox_px.normalize(page.width, page.height),
                source_region_index: w.region.unwrap_or(FULL_PAGE_REGION),
                page_side,
            }
        })
        .collect();

    TokenNormalization {
        page_dimensions: dims,
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::schema::OcrResult;
    use pretty_assertions::assert_eq;

    fn page() -> OcrPage {
        let json = r#"{"pages":[{"width":200,"height":100,"blocks":[
            {"_region": 1, "paragraphs":[{"words":[
                {"text":"Anna","confidence":0.9,"boundingBox":{"vertices":[
                    {"x":20,"y":10},{"x":60,"y":10},{"x":60,"y":20},{"x":20,"y":20}]}},
                {"text":"   ","boundingBox":{"vertices":[
                    {"x":0,"y":0},{"x":1,"y":0},{"x":1,"y":1},{"x":0,"y":1}]}},
                {"text":"short","boundingBox":{"vertices":[{"x":0,"y":0},{"x":1,"y":1}]}}
            ]}]},
            {"paragraphs":[{"words":[
                {"symbols":[{"text":"1"},{"text":"2"}],"boundingBox":{"vertices":[
                    {"x":180,"y":90},{"x":230,"y":90},{"x":230,"y":110},{"x":180,"y":110}]}}
            ]}]}
        ]}]}"#;
        OcrResult::from_json_str(json).unwrap().pages.remove(0)
    }

    #[test]
    fn skips_blank_and_underspecified_words() {
        let tokens = extract_word_tokens(&page());
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Anna", "12"]);
        assert!((tokens[0].cx - 0.2).abs() < 1e-12);
        assert!((tokens[0].cy - 0.15).abs() < 1e-12);
    }

    #[test]
    fn normalization_clamps_and_numbers_tokens() {
        let norm = normalize_tokens(&page(), PageSide::Left);
        assert_eq!(norm.tokens.len(), 2);
        assert_eq!(norm.tokens[0].token_id, 0);
        assert_eq!(norm.tokens[1].token_id, 1);
        assert_eq!(norm.tokens[0].source_region_index, 1);
        assert_eq!(norm.tokens[1].source_region_index, FULL_PAGE_REGION);
        assert_eq!(norm.tokens[1].bbox_px, BBox::new(180.0, 90.0, 200.0, 100.0));
        assert_eq!(norm.tokens[1].bbox_norm, BBox::new(0.9, 0.9, 1.0, 1.0));
        assert_eq!(norm.tokens[1].page_side, PageSide::Left);
    }

    #[test]
    fn zero_sized_page_yields_no_tokens() {
        let mut p = page();
        p.width = 0.0;
        assert!(extract_word_tokens(&p).is_empty());
        assert!(normalize_tokens(&p, PageSide::Full).tokens.is_empty());
    }
}
