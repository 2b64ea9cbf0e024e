use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value, mirroring what spreadsheet readers hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date/time kept as text.
    Date(String),
    Null,
}

impl CellValue {
    /// Blank cells and float NaN both count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Text content of the cell, trimmed. Missing values give an empty string.
    pub fn to_text(&self) -> String {
        if self.is_null() {
            return String::new();
        }
        self.to_string().trim().to_string()
    }
}

/// Renders the way a dataframe's `str()` would: integral floats keep `.0`,
/// very large or small floats use `1e-07` / `1.5e+20` notation, booleans are
/// capitalised.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) | CellValue::Date(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{}", format_float(*v)),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Null => Ok(()),
        }
    }
}

/// Shortest round-trip digits; scientific notation outside `[1e-4, 1e16)`.
fn format_float(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string().to_lowercase();
    }
    let magnitude = v.abs();
    if v == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if v.fract() == 0.0 {
            format!("{v:.1}")
        } else {
            v.to_string()
        };
    }
    // `{:e}` gives e.g. `1.5e20`; widen the exponent to a signed two-digit form.
    let sci = format!("{v:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

// ---------------------------------------------------------------------------
// Row – one spreadsheet row
// ---------------------------------------------------------------------------

/// One row of the source sheet, positionally aligned with [`Table::columns`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Row { cells }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded sheet
// ---------------------------------------------------------------------------

/// A loaded sheet: ordered header plus rows, with a name → position index.
#[derive(Debug, Clone)]
pub struct Table {
    /// Column names in sheet order (duplicates already disambiguated).
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Build a table, padding short rows with `Null` and renaming repeated
    /// headers `name.1`, `name.2`, ...
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let columns = dedupe_columns(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.cells.resize(width, CellValue::Null);
                row
            })
            .collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Table {
            columns,
            rows,
            index,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Cell of `row` under column `name`, if the table has that column.
    pub fn cell<'a>(&self, row: &'a Row, name: &str) -> Option<&'a CellValue> {
        self.index.get(name).and_then(|&i| row.cells.get(i))
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Repeated names get `.1`, `.2`, ... skipping any suffix already taken, so
/// every resulting name is unique.
fn dedupe_columns(columns: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(columns.len());
    for mut name in columns {
        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{name}.{count}");
            count = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), count + 1);
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rendering_matches_dataframe_str() {
        assert_eq!(CellValue::Float(2.0).to_text(), "2.0");
        assert_eq!(CellValue::Float(0.25).to_text(), "0.25");
        assert_eq!(CellValue::Integer(7).to_text(), "7");
        assert_eq!(CellValue::Bool(true).to_text(), "True");
        assert_eq!(CellValue::String("  padded \n".into()).to_text(), "padded");
        assert_eq!(CellValue::Float(f64::NAN).to_text(), "");
        assert_eq!(CellValue::Null.to_text(), "");
    }

    #[test]
    fn short_rows_are_padded_and_lookup_by_name() {
        let table = Table::new(
            vec!["text".into(), "F".into(), "A".into()],
            vec![Row::new(vec![CellValue::String("hi".into())])],
        );
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "A"), Some(&CellValue::Null));
        assert_eq!(table.cell(row, "missing"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn extreme_floats_use_exponent_notation() {
        assert_eq!(CellValue::Float(1e-7).to_text(), "1e-07");
        assert_eq!(CellValue::Float(1e20).to_text(), "1e+20");
        assert_eq!(CellValue::Float(-1.5e20).to_text(), "-1.5e+20");
        assert_eq!(CellValue::Float(2.5e-5).to_text(), "2.5e-05");
        assert_eq!(CellValue::Float(1e-4).to_text(), "0.0001");
        assert_eq!(CellValue::Float(1e15).to_text(), "1000000000000000.0");
        assert_eq!(CellValue::Float(1e16).to_text(), "1e+16");
        assert_eq!(CellValue::Float(0.0).to_text(), "0.0");
        assert_eq!(CellValue::Float(f64::INFINITY).to_text(), "inf");
    }

    #[test]
    fn suffixes_skip_names_already_present() {
        let table = Table::new(vec!["F".into(), "F".into(), "F.1".into()], Vec::new());
        assert_eq!(table.columns, vec!["F", "F.1", "F.1.1"]);

        let table = Table::new(
            vec!["F.1".into(), "F".into(), "F".into(), "F".into()],
            Vec::new(),
        );
        assert_eq!(table.columns, vec!["F.1", "F", "F.1.1", "F.2"]);
    }

    #[test]
    fn repeated_headers_get_suffixes() {
        let table = Table::new(vec!["F".into(), "F".into(), "F".into()], Vec::new());
        assert_eq!(table.columns, vec!["F", "F.1", "F.2"]);
        assert!(table.has_column("F.1"));
    }
}
