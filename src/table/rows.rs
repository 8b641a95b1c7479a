use crate::core::model::WordToken;

pub const DEFAULT_MERGE_GAP_FRAC: f64 = 0.6;

/// Groups tokens into visual rows.
///
/// Tokens are walked top to bottom; a token joins the current row while its
/// vertical center is within `median_height * merge_gap_frac` of the row's
/// first token. Each row is returned sorted left to right.
pub fn cluster_rows(tokens: &[WordToken], merge_gap_frac: f64) -> Vec<Vec<WordToken>> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let epsilon = median_height(tokens) * merge_gap_frac;

    let mut sorted: Vec<&WordToken> = tokens.iter().collect();
    sorted.sort_by(|a, b| a.cy.total_cmp(&b.cy));

    let mut rows: Vec<Vec<WordToken>> = Vec::new();
    let mut anchor_cy = f64::NAN;
    for token in sorted {
        match rows.last_mut() {
            Some(row) if (token.cy - anchor_cy).abs() <= epsilon => row.push(token.clone()),
            _ => {
                anchor_cy = token.cy;
                rows.push(vec![token.clone()]);
            }
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.cx.total_cmp(&b.cx));
    }
    rows
}

fn median_height(tokens: &[WordToken]) -> f64 {
    let mut heights: Vec<f64> = tokens.iter().map(WordToken::height).collect();
    heights.sort_by(f64::total_cmp);
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;

    fn tok(text: &str, x0: f64, y0: f64) -> WordToken {
        WordToken::new(text.to_string(), None, BBox::new(x0, y0, x0 + 0.05, y0 + 0.02))
    }

    fn texts(rows: &[Vec<WordToken>]) -> Vec<Vec<&str>> {
        rows.iter()
            .map(|r| r.iter().map(|t| t.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn groups_by_vertical_proximity_and_orders_by_x() {
        let tokens = vec![
            tok("c", 0.6, 0.305),
            tok("a", 0.1, 0.300),
            tok("d", 0.1, 0.400),
            tok("b", 0.3, 0.309),
        ];
        let rows = cluster_rows(&tokens, DEFAULT_MERGE_GAP_FRAC);
        assert_eq!(texts(&rows), vec![vec!["a", "b", "c"], vec!["d"]]);
    }

    #[test]
    fn anchor_is_first_token_of_row() {
        // epsilon = 0.02 * 0.6 = 0.012; "c" is within epsilon of "b" but not of "a".
        let tokens = vec![tok("a", 0.1, 0.300), tok("b", 0.2, 0.310), tok("c", 0.3, 0.320)];
        let rows = cluster_rows(&tokens, DEFAULT_MERGE_GAP_FRAC);
        assert_eq!(texts(&rows), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn single_token_is_one_row() {
        let rows = cluster_rows(&[tok("only", 0.5, 0.5)], DEFAULT_MERGE_GAP_FRAC);
        assert_eq!(rows.len(), 1);
        assert!(cluster_rows(&[], DEFAULT_MERGE_GAP_FRAC).is_empty());
    }
}
