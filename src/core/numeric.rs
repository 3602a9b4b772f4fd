//! Numeric helpers shared by the resolver and the table adapters.

use crate::domain::model::Cell;
use serde_json::Value;

/// Index of the key closest to `target`. Absent keys are skipped and ties keep
/// the earliest index. Returns `None` when no key is defined.
pub fn nearest_index(keys: &[Cell], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, key) in keys.iter().enumerate() {
        let Some(key) = key else { continue };
        let diff = (key - target).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((index, diff)),
        }
    }
    best.map(|(index, _)| index)
}

/// Diopter value as integer hundredths, the precision of the reference sheets.
pub fn hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

pub fn same_diopter(a: f64, b: f64) -> bool {
    hundredths(a) == hundredths(b)
}

/// 解析邊界：將表格儲存格轉為數值或空值
pub fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => cell_from_str(s),
        _ => None,
    }
}

pub fn cell_from_str(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Sheets sometimes render negatives with a unicode minus sign.
    let normalized = trimmed.replace('\u{2212}', "-");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nearest_index_tie_prefers_first() {
        let keys = [Some(-1.0), Some(-3.0), Some(-5.0)];
        assert_eq!(nearest_index(&keys, -2.0), Some(0));
        assert_eq!(nearest_index(&keys, -4.2), Some(2));
        assert_eq!(nearest_index(&keys, -3.0), Some(1));
    }

    #[test]
    fn test_nearest_index_skips_missing_keys() {
        let keys = [None, Some(-0.5), None, Some(-2.0)];
        assert_eq!(nearest_index(&keys, 0.0), Some(1));
        assert_eq!(nearest_index(&[None, None], -1.0), None);
        assert_eq!(nearest_index(&[], -1.0), None);
    }

    #[test]
    fn test_hundredths_absorbs_float_noise() {
        assert_eq!(hundredths(-1.5), -150);
        assert!(same_diopter(-0.1 + -0.2, -0.3));
        assert!(!same_diopter(-1.25, -1.5));
    }

    #[test]
    fn test_cell_parsing_boundary() {
        assert_eq!(cell_from_json(&json!(65)), Some(65.0));
        assert_eq!(cell_from_json(&json!(-1.25)), Some(-1.25));
        assert_eq!(cell_from_json(&json!(" -0.75 ")), Some(-0.75));
        assert_eq!(cell_from_json(&json!("\u{2212}2.5")), Some(-2.5));
        assert_eq!(cell_from_json(&json!("SPH")), None);
        assert_eq!(cell_from_json(&json!("")), None);
        assert_eq!(cell_from_json(&json!(null)), None);
        assert_eq!(cell_from_json(&json!(true)), None);
        assert_eq!(cell_from_str("NaN"), None);
        assert_eq!(cell_from_str("inf"), None);
    }
}
