use super::labelmap::LabelMap;
use super::model::{CellValue, Row, Table};
use crate::error::Result;

/// Default numeric cutoff for an indicator to count as active.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

const TRUTHY: [&str; 5] = ["1", "true", "yes", "y", "on"];
const FALSY: [&str; 6] = ["0", "false", "no", "n", "off", ""];

// ---------------------------------------------------------------------------
// Indicator truthiness
// ---------------------------------------------------------------------------

/// Decide whether an indicator cell marks its label as active.
///
/// Precedence, first match wins:
/// * missing / NaN → inactive
/// * boolean → its value
/// * number → `value > threshold`
/// * text in the truthy or falsy token sets (trimmed, case-insensitive)
/// * text that parses as a number → `value > threshold`
/// * anything else → inactive
pub fn is_active(value: &CellValue, threshold: f64) -> bool {
    match value {
        v if v.is_null() => false,
        CellValue::Bool(b) => *b,
        CellValue::Integer(i) => (*i as f64) > threshold,
        CellValue::Float(f) => *f > threshold,
        CellValue::String(s) | CellValue::Date(s) => text_is_active(s, threshold),
        CellValue::Null => false,
    }
}

fn text_is_active(s: &str, threshold: f64) -> bool {
    let token = s.trim().to_lowercase();
    if TRUTHY.contains(&token.as_str()) {
        return true;
    }
    if FALSY.contains(&token.as_str()) {
        return false;
    }
    // NaN never compares greater, so "nan" lands on inactive too.
    token.parse::<f64>().is_ok_and(|v| v > threshold)
}

// ---------------------------------------------------------------------------
// Row → labels
// ---------------------------------------------------------------------------

/// Active labels of one row, with their ids, in `label_names` order.
///
/// Label names that are not columns of `table` are skipped. An active label
/// with no id is a [`ConvertError::KeyLookup`]; one whose id is not
/// integer-like is a [`ConvertError::InvalidId`].
pub fn row_labels(
    table: &Table,
    row: &Row,
    labelmap: &LabelMap,
    threshold: f64,
) -> Result<(Vec<String>, Vec<i64>)> {
    let mut labels = Vec::new();
    let mut label_ids = Vec::new();

    for name in &labelmap.label_names {
        let Some(value) = table.cell(row, name) else {
            continue;
        };
        if !is_active(value, threshold) {
            continue;
        }
        let id = labelmap.id_of(name)?;
        labels.push(name.clone());
        label_ids.push(id);
    }

    Ok((labels, label_ids))
}
