use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::util::display::array_value_to_string;
use calamine::{Data, Range, Reader, open_workbook_auto};
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Row, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – workbook, first row is the header
/// * `.csv`     – header row, values kept as text
/// * `.parquet` – scalar columns
/// * `.json`    – `[{ "text": "...", "F": 1, ... }, ...]`
///
/// `sheet` picks a workbook sheet by name, or by 0-based index when no sheet
/// carries that name. Other formats ignore it.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if sheet.is_some() && !is_workbook(&ext) {
        warn!("--sheet is ignored for .{ext} input");
    }

    let table = match ext.as_str() {
        e if is_workbook(e) => load_workbook(path, sheet)?,
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    info!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

fn is_workbook(ext: &str) -> bool {
    matches!(ext, "xlsx" | "xlsm" | "xlsb" | "xls" | "ods")
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        None => sheet_names
            .first()
            .cloned()
            .context("workbook contains no sheets")?,
        Some(wanted) => resolve_sheet(&sheet_names, wanted)?,
    };
    debug!("reading sheet {sheet_name:?} (available: {sheet_names:?})");

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("reading sheet {sheet_name:?}"))?;

    Ok(range_to_table(&range))
}

/// Exact name match first, then a 0-based index.
fn resolve_sheet(sheet_names: &[String], wanted: &str) -> Result<String> {
    if let Some(name) = sheet_names.iter().find(|name| name.as_str() == wanted) {
        return Ok(name.clone());
    }
    if let Ok(idx) = wanted.trim().parse::<usize>() {
        return sheet_names.get(idx).cloned().with_context(|| {
            format!(
                "sheet index {idx} out of range ({} sheets)",
                sheet_names.len()
            )
        });
    }
    bail!("Worksheet named {wanted:?} not found (available: {sheet_names:?})")
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::new(Vec::new(), Vec::new());
    };

    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_to_value(cell).to_string();
            if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            }
        })
        .collect();

    let mut rows: Vec<Row> = rows
        .map(|cells| Row::new(cells.iter().map(cell_to_value).collect()))
        .collect();
    promote_float_columns(&mut rows);

    Table::new(columns, rows)
}

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Workbooks store every number as a float; whole numbers read back as integers.
fn number_value(f: f64) -> CellValue {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT {
        CellValue::Integer(f as i64)
    } else {
        CellValue::Float(f)
    }
}

/// A column whose non-empty cells are all numbers, at least one fractional,
/// is a float column: its whole numbers go back to `Float` (`42.0`).
/// Columns mixing numbers with text or booleans keep per-cell types.
fn promote_float_columns(rows: &mut [Row]) {
    let width = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
    for col in 0..width {
        let mut has_float = false;
        let mut all_numeric = true;
        for cell in rows.iter().filter_map(|row| row.cells.get(col)) {
            match cell {
                CellValue::Float(_) => has_float = true,
                CellValue::Integer(_) | CellValue::Null => {}
                _ => all_numeric = false,
            }
        }
        if !(has_float && all_numeric) {
            continue;
        }
        for row in rows.iter_mut() {
            if let Some(cell) = row.cells.get_mut(col) {
                if let CellValue::Integer(i) = *cell {
                    *cell = CellValue::Float(i as f64);
                }
            }
        }
    }
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => number_value(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::Date(naive.to_string()),
            None => number_value(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Date(s.clone()),
        Data::Error(e) => {
            debug!("cell error {e:?} read as empty");
            CellValue::Null
        }
        Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// Empty fields are missing values; everything else stays text and is
/// interpreted later by the indicator parser.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Null
                } else {
                    CellValue::String(field.to_string())
                }
            })
            .collect();
        rows.push(Row::new(cells));
    }

    Ok(Table::new(columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "RequirementText": "Must respond in 2s", "Functional (F)": 1 },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen key order.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            Row::new(
                columns
                    .iter()
                    .map(|col| obj.get(col).map_or(CellValue::Null, json_to_value))
                    .collect(),
            )
        })
        .collect();

    Ok(Table::new(columns, rows))
}

fn json_to_value(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by **Pandas** (`df.to_parquet()`) or
/// **Polars** (`df.write_parquet()`).
///
/// Strings, booleans, integers and floats map directly; dates and timestamps
/// become ISO text; anything else is rendered with Arrow's display formatter.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let column_cells = batch
            .columns()
            .iter()
            .zip(&columns)
            .map(|(col, name)| {
                column_to_values(col).with_context(|| format!("converting column {name:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(Row::new(
                column_cells.iter().map(|cells| cells[row].clone()).collect(),
            ));
        }
    }

    Ok(Table::new(columns, rows))
}

// -- Arrow helpers --

/// Convert a whole Arrow column to cells, casting to a canonical type first.
fn column_to_values(col: &ArrayRef) -> Result<Vec<CellValue>> {
    let len = col.len();
    match col.data_type() {
        DataType::Boolean => {
            let arr = col.as_boolean();
            Ok((0..len)
                .map(|i| null_or(arr, i, || CellValue::Bool(arr.value(i))))
                .collect())
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let casted = cast(col, &DataType::Int64).context("casting to Int64")?;
            let arr = casted.as_primitive::<Int64Type>();
            Ok((0..len)
                .map(|i| null_or(arr, i, || CellValue::Integer(arr.value(i))))
                .collect())
        }
        DataType::UInt64 | DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let casted = cast(col, &DataType::Float64).context("casting to Float64")?;
            let arr = casted.as_primitive::<Float64Type>();
            Ok((0..len)
                .map(|i| null_or(arr, i, || CellValue::Float(arr.value(i))))
                .collect())
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let casted = cast(col, &DataType::Utf8).context("casting to Utf8")?;
            let arr = casted.as_string::<i32>();
            Ok((0..len)
                .map(|i| null_or(arr, i, || CellValue::String(arr.value(i).to_string())))
                .collect())
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => (0..len)
            .map(|i| -> Result<CellValue> {
                if col.is_null(i) {
                    return Ok(CellValue::Null);
                }
                Ok(CellValue::Date(array_value_to_string(col, i)?))
            })
            .collect(),
        _ => (0..len)
            .map(|i| -> Result<CellValue> {
                if col.is_null(i) {
                    return Ok(CellValue::Null);
                }
                Ok(CellValue::String(array_value_to_string(col, i)?))
            })
            .collect(),
    }
}

fn null_or(arr: &dyn Array, i: usize, value: impl FnOnce() -> CellValue) -> CellValue {
    if arr.is_null(i) { CellValue::Null } else { value() }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn xlsx_header_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Reqs").unwrap();
        sheet.write_string(0, 0, "RequirementText").unwrap();
        sheet.write_string(0, 1, "Functional (F)").unwrap();
        sheet.write_string(0, 3, "Trailing").unwrap();
        sheet.write_string(1, 0, "Must respond in 2s").unwrap();
        sheet.write_number(1, 1, 1.0).unwrap();
        sheet.write_boolean(1, 3, true).unwrap();
        sheet.write_string(2, 0, "Second").unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path, None).unwrap();
        assert_eq!(
            table.columns,
            vec!["RequirementText", "Functional (F)", "Unnamed: 2", "Trailing"]
        );
        assert_eq!(table.len(), 2);
        let first = &table.rows[0];
        assert_eq!(
            table.cell(first, "RequirementText"),
            Some(&CellValue::String("Must respond in 2s".into()))
        );
        assert_eq!(table.cell(first, "Functional (F)"), Some(&CellValue::Integer(1)));
        assert_eq!(table.cell(first, "Trailing"), Some(&CellValue::Bool(true)));
        assert_eq!(table.cell(&table.rows[1], "Trailing"), Some(&CellValue::Null));
    }

    #[test]
    fn whole_numbers_read_as_integers_unless_column_is_fractional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "text").unwrap();
        sheet.write_string(0, 1, "score").unwrap();
        sheet.write_number(1, 0, 42.0).unwrap();
        sheet.write_number(1, 1, 1.0).unwrap();
        sheet.write_string(2, 0, "words").unwrap();
        sheet.write_number(2, 1, 0.25).unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(42));
        assert_eq!(table.rows[0].cells[0].to_text(), "42");
        assert_eq!(table.rows[0].cells[1], CellValue::Float(1.0));
        assert_eq!(table.rows[1].cells[1], CellValue::Float(0.25));
    }

    #[test]
    fn sheet_selection_by_name_then_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.xlsx");

        let mut workbook = Workbook::new();
        for name in ["first", "second"] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            sheet.write_string(0, 0, name).unwrap();
        }
        workbook.save(&path).unwrap();

        assert_eq!(load_table(&path, None).unwrap().columns, vec!["first"]);
        assert_eq!(load_table(&path, Some("second")).unwrap().columns, vec!["second"]);
        assert_eq!(load_table(&path, Some("1")).unwrap().columns, vec!["second"]);
        assert!(load_table(&path, Some("third")).is_err());
        assert!(load_table(&path, Some("5")).is_err());
    }

    #[test]
    fn csv_keeps_text_and_marks_blanks_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.csv", "text,F,A\nhello,1,\n,yes,0\n");

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns, vec!["text", "F", "A"]);
        assert_eq!(table.rows[0].cells[1], CellValue::String("1".into()));
        assert_eq!(table.rows[0].cells[2], CellValue::Null);
        assert_eq!(table.rows[1].cells[0], CellValue::Null);
    }

    #[test]
    fn json_records_in_first_seen_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "data.json",
            r#"[{"text": "a", "F": 1}, {"text": "b", "A": true, "F": 0.25}]"#,
        );

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns, vec!["text", "F", "A"]);
        assert_eq!(table.rows[0].cells[2], CellValue::Null);
        assert_eq!(table.rows[1].cells[1], CellValue::Float(0.25));
        assert_eq!(table.rows[1].cells[2], CellValue::Bool(true));
    }

    #[test]
    fn parquet_scalar_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("text", DataType::Utf8, true),
            Field::new("F", DataType::Int32, true),
            Field::new("A", DataType::Float64, true),
            Field::new("P", DataType::Boolean, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("a"), None])),
                Arc::new(Int32Array::from(vec![Some(1), None])),
                Arc::new(Float64Array::from(vec![0.75, 0.0])),
                Arc::new(BooleanArray::from(vec![false, true])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns, vec!["text", "F", "A", "P"]);
        assert_eq!(
            table.rows[0].cells,
            vec![
                CellValue::String("a".into()),
                CellValue::Integer(1),
                CellValue::Float(0.75),
                CellValue::Bool(false),
            ]
        );
        assert_eq!(table.rows[1].cells[0], CellValue::Null);
        assert_eq!(table.rows[1].cells[1], CellValue::Null);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.txt", "whatever");
        let err = load_table(&path, None).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
