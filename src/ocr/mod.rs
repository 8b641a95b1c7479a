pub mod schema;
pub mod tokens;

pub use schema::{OcrBlock, OcrPage, OcrResult, OcrWord};
pub use tokens::{extract_word_tokens, normalize_tokens, page_dimensions};
