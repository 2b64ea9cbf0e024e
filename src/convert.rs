use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::data::indicator::{DEFAULT_THRESHOLD, row_labels};
use crate::data::labelmap::LabelMap;
use crate::data::loader::load_table;
use crate::data::model::Table;
use crate::error::{ConvertError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Encodings the JSONL writer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    /// UTF-8 with a leading byte-order mark.
    Utf8Sig,
}

impl FromStr for OutputEncoding {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(OutputEncoding::Utf8Sig),
            _ => Err(ConvertError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Everything one conversion run needs to know.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub labelmap: PathBuf,
    /// Sheet name or 0-based index; first sheet when `None`.
    pub sheet: Option<String>,
    pub threshold: f64,
    /// Emit the `labels` name list next to `label_ids`.
    pub include_labels: bool,
    /// Drop rows with no active label.
    pub skip_no_label: bool,
    pub encoding: OutputEncoding,
}

impl ConvertOptions {
    pub fn new(input: PathBuf, output: PathBuf, labelmap: PathBuf) -> Self {
        Self {
            input,
            output,
            labelmap,
            sheet: None,
            threshold: DEFAULT_THRESHOLD,
            include_labels: true,
            skip_no_label: false,
            encoding: OutputEncoding::Utf8,
        }
    }
}

// ---------------------------------------------------------------------------
// Output record & run summary
// ---------------------------------------------------------------------------

/// One JSONL line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub label_ids: Vec<i64>,
}

/// Row counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub written: usize,
    pub skipped_empty_text: usize,
    /// `None` unless rows without labels are being skipped.
    pub skipped_no_label: Option<usize>,
    pub output: PathBuf,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Done.")?;
        writeln!(f, "Input rows: {}", self.total)?;
        writeln!(f, "Written:    {}", self.written)?;
        writeln!(f, "Skipped (empty text): {}", self.skipped_empty_text)?;
        if let Some(n) = self.skipped_no_label {
            writeln!(f, "Skipped (no labels): {n}")?;
        }
        writeln!(f, "Output: {}", self.output.display())
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run a full conversion: load, validate, stream records, summarise.
///
/// Every precondition (paths, labelmap shape, readable input, required
/// columns) is checked before the output file is created.
pub fn run(opts: &ConvertOptions) -> Result<Summary> {
    // Init → Loaded
    require_exists("input spreadsheet", &opts.input)?;
    require_exists("labelmap", &opts.labelmap)?;

    let labelmap = LabelMap::load(&opts.labelmap)?;
    info!(
        "labelmap: text column {:?}, {} labels",
        labelmap.text_column,
        labelmap.label_names.len()
    );

    let table = load_table(&opts.input, opts.sheet.as_deref())
        .map_err(|e| ConvertError::read(&opts.input, e))?;
    if table.is_empty() {
        warn!("{} has a header but no data rows", opts.input.display());
    }

    // Loaded → Validated
    validate_columns(&table, &labelmap)?;
    let without_id = labelmap.labels_without_id();
    if !without_id.is_empty() {
        warn!("labels without an id in label2id (fatal if any row marks them active): {without_id:?}");
    }

    // Validated → Streaming
    if let Some(parent) = opts.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&opts.output)?;
    let mut writer = BufWriter::new(file);
    let mut summary = write_records(&table, &labelmap, opts, &mut writer)?;
    writer.flush()?;

    // Streaming → Done
    summary.output = std::fs::canonicalize(&opts.output).unwrap_or_else(|_| opts.output.clone());
    Ok(summary)
}

fn require_exists(what: &'static str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConvertError::InputNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// The text column and every label column must be present.
pub fn validate_columns(table: &Table, labelmap: &LabelMap) -> Result<()> {
    let missing: Vec<String> = labelmap
        .required_columns()
        .filter(|col| !table.has_column(col))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        debug!("all {} required columns present", labelmap.label_names.len() + 1);
        return Ok(());
    }
    Err(ConvertError::MissingColumns {
        missing,
        available: table.columns.clone(),
    })
}

/// Stream every row of `table` to `out` as JSONL, in row order.
///
/// The returned summary carries no output path; [`run`] fills it in.
pub fn write_records<W: Write>(
    table: &Table,
    labelmap: &LabelMap,
    opts: &ConvertOptions,
    out: &mut W,
) -> Result<Summary> {
    let mut summary = Summary {
        skipped_no_label: opts.skip_no_label.then_some(0),
        ..Summary::default()
    };

    if opts.encoding == OutputEncoding::Utf8Sig {
        out.write_all(UTF8_BOM)?;
    }

    for (row_no, row) in table.rows.iter().enumerate() {
        summary.total += 1;

        let text = table
            .cell(row, &labelmap.text_column)
            .map(|cell| cell.to_text())
            .unwrap_or_default();
        if text.is_empty() {
            trace!("row {row_no}: empty text, skipped");
            summary.skipped_empty_text += 1;
            continue;
        }

        let (labels, label_ids) = row_labels(table, row, labelmap, opts.threshold)?;

        if let Some(skipped) = summary.skipped_no_label.as_mut() {
            if label_ids.is_empty() {
                trace!("row {row_no}: no active label, skipped");
                *skipped += 1;
                continue;
            }
        }

        let record = Record {
            text,
            labels: opts.include_labels.then_some(labels),
            label_ids,
        };
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
        summary.written += 1;
    }

    info!(
        "{} rows in, {} written, {} skipped for empty text",
        summary.total, summary.written, summary.skipped_empty_text
    );
    Ok(summary)
}
