// src/evaluate/parse.rs
// Score extraction from raw backend text. Backends answer in whatever shape
// their model produced; this ladder recovers a per-item score vector:
//   1) the whole response as a JSON array,
//   2) the first bracketed numeric array inside the text,
//   3) bare score-shaped tokens (0.x or 1.0).
// A position that yields no usable number becomes None for that item only.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::EvaluationParseError;

/// Parse `raw` into exactly `expected` optional scores, clamped to [0, 1].
/// Extra trailing scores are dropped; missing positions come back as None.
/// Errors only when the response contains nothing score-like at all.
pub(crate) fn parse_scores(
    raw: &str,
    expected: usize,
) -> Result<Vec<Option<f64>>, EvaluationParseError> {
    let mut scores = extract(raw).ok_or_else(|| EvaluationParseError(preview(raw)))?;
    scores.resize(expected, None);
    Ok(scores)
}

fn extract(raw: &str) -> Option<Vec<Option<f64>>> {
    let trimmed = raw.trim();

    // 1) Whole response is a JSON array.
    if let Ok(serde_json::Value::Array(values)) = serde_json::from_str(trimmed) {
        return Some(values.iter().map(value_score).collect());
    }

    // 2) First bracketed numeric array inside prose.
    static RE_ARRAY: OnceCell<Regex> = OnceCell::new();
    let re_array = RE_ARRAY.get_or_init(|| Regex::new(r"\[([\d.,\s-]+)\]").unwrap());
    if let Some(caps) = re_array.captures(trimmed) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Some(
            inner
                .split(',')
                .map(|piece| piece.trim().parse::<f64>().ok().and_then(clamped))
                .collect(),
        );
    }

    // 3) Bare score-shaped tokens scattered in text.
    static RE_SCORE: OnceCell<Regex> = OnceCell::new();
    let re_score = RE_SCORE.get_or_init(|| Regex::new(r"0\.\d+|1\.0").unwrap());
    let found: Vec<Option<f64>> = re_score
        .find_iter(trimmed)
        .map(|m| m.as_str().parse::<f64>().ok().and_then(clamped))
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

fn value_score(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().and_then(clamped),
        // Models sometimes quote their numbers.
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().and_then(clamped),
        _ => None,
    }
}

fn clamped(score: f64) -> Option<f64> {
    if score.is_finite() {
        Some(score.clamp(0.0, 1.0))
    } else {
        None
    }
}

fn preview(raw: &str) -> String {
    let mut p: String = raw.chars().take(120).collect();
    if raw.chars().count() > 120 {
        p.push_str("...");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_json_array() {
        let scores = parse_scores("[0.9, 0.1, 0.5]", 3).unwrap();
        assert_eq!(scores, vec![Some(0.9), Some(0.1), Some(0.5)]);
    }

    #[test]
    fn quoted_numbers_are_accepted() {
        let scores = parse_scores(r#"["0.8", 0.2]"#, 2).unwrap();
        assert_eq!(scores, vec![Some(0.8), Some(0.2)]);
    }

    #[test]
    fn array_embedded_in_prose() {
        let raw = "Here are the scores: [0.7, 0.3] as requested.";
        let scores = parse_scores(raw, 2).unwrap();
        assert_eq!(scores, vec![Some(0.7), Some(0.3)]);
    }

    #[test]
    fn bare_tokens_in_text() {
        let raw = "Item 1 scores 0.8 and item 2 scores 0.25";
        let scores = parse_scores(raw, 2).unwrap();
        assert_eq!(scores, vec![Some(0.8), Some(0.25)]);
    }

    #[test]
    fn out_of_range_scores_clamp() {
        let scores = parse_scores("[1.5, -0.2]", 2).unwrap();
        assert_eq!(scores, vec![Some(1.0), Some(0.0)]);
    }

    #[test]
    fn null_position_is_none_not_failure() {
        let scores = parse_scores("[0.4, null, 0.6]", 3).unwrap();
        assert_eq!(scores, vec![Some(0.4), None, Some(0.6)]);
    }

    #[test]
    fn short_array_pads_with_none() {
        let scores = parse_scores("[0.4]", 3).unwrap();
        assert_eq!(scores, vec![Some(0.4), None, None]);
    }

    #[test]
    fn extra_scores_are_dropped() {
        let scores = parse_scores("[0.1, 0.2, 0.3]", 2).unwrap();
        assert_eq!(scores, vec![Some(0.1), Some(0.2)]);
    }

    #[test]
    fn scoreless_text_errors() {
        assert!(parse_scores("I cannot comply with that.", 2).is_err());
        assert!(parse_scores("", 1).is_err());
    }
}
