#![allow(dead_code)]

use ledgerstruct::ocr::schema::{BoundingPoly, OcrBlock, OcrPage, OcrParagraph, OcrWord, Vertex};

pub const PAGE_WIDTH: f64 = 2000.0;
pub const PAGE_HEIGHT: f64 = 3000.0;

/// Word with a normalized box `[x0, y0, x1, y1]`, converted to page pixels.
pub fn word(text: &str, bbox: [f64; 4], confidence: Option<f64>) -> OcrWord {
    let [x0, y0, x1, y1] = bbox;
    let (x0, x1) = (x0 * PAGE_WIDTH, x1 * PAGE_WIDTH);
    let (y0, y1) = (y0 * PAGE_HEIGHT, y1 * PAGE_HEIGHT);
    OcrWord {
        text: Some(text.to_string()),
        symbols: Vec::new(),
        confidence,
        bounding_box: Some(BoundingPoly {
            vertices: vec![
                Vertex { x: x0, y: y0 },
                Vertex { x: x1, y: y0 },
                Vertex { x: x1, y: y1 },
                Vertex { x: x0, y: y1 },
            ],
        }),
    }
}

pub fn page(words: Vec<OcrWord>) -> OcrPage {
    OcrPage {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        blocks: vec![OcrBlock {
            region: None,
            paragraphs: vec![OcrParagraph { words }],
        }],
    }
}

/// Two baptism entries laid out on the built-in baptism bands.
pub fn baptism_ledger() -> OcrPage {
    page(vec![
        word("No.", [0.01, 0.05, 0.05, 0.07], Some(0.95)),
        word("Name", [0.20, 0.05, 0.28, 0.07], Some(0.95)),
        word("1", [0.01, 0.30, 0.04, 0.32], Some(0.99)),
        word("1899-05-10", [0.08, 0.30, 0.17, 0.32], Some(0.91)),
        word("John", [0.20, 0.30, 0.26, 0.32], Some(0.88)),
        word("Kowalski", [0.40, 0.30, 0.50, 0.32], Some(0.80)),
        word("2", [0.01, 0.36, 0.04, 0.38], Some(0.97)),
        word("1899-06-02", [0.08, 0.36, 0.17, 0.38], Some(0.90)),
        word("Maria", [0.20, 0.36, 0.27, 0.38], Some(0.86)),
        word("Nowak", [0.40, 0.36, 0.48, 0.38], Some(0.82)),
    ])
}
