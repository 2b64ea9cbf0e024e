use std::path::PathBuf;

use clap::Parser;

use crate::convert::{ConvertOptions, OutputEncoding};
use crate::data::indicator::DEFAULT_THRESHOLD;
use crate::error::Result;

/// Convert an Excel multilabel dataset to JSONL using a labelmap.
///
/// Each output line looks like
/// `{"text": "...", "labels": ["Functional (F)"], "label_ids": [0]}`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input spreadsheet (.xlsx; .xls, .ods, .csv, .parquet and .json also work)
    #[arg(long = "in_xlsx", value_name = "PATH")]
    pub in_xlsx: PathBuf,

    /// Output JSONL path (parent directories are created)
    #[arg(long = "out_jsonl", value_name = "PATH")]
    pub out_jsonl: PathBuf,

    /// Labelmap JSON (contains text_column, label_names, label2id)
    #[arg(long, value_name = "PATH")]
    pub labelmap: PathBuf,

    /// Excel sheet name/index (default: first sheet)
    #[arg(long, value_name = "NAME_OR_INDEX")]
    pub sheet: Option<String>,

    /// Threshold to treat numeric label values as positive
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Include 'labels' string list in output (default: ON)
    #[arg(long = "include_labels")]
    pub include_labels: bool,

    /// Do NOT include 'labels' string list (only label_ids)
    #[arg(long = "no_labels")]
    pub no_labels: bool,

    /// Skip rows that have no active labels
    #[arg(long = "skip_no_label")]
    pub skip_no_label: bool,

    /// Output file encoding (utf-8 or utf-8-sig)
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve flags into run options. Fails on an unknown encoding.
    pub fn into_options(self) -> Result<ConvertOptions> {
        let encoding: OutputEncoding = self.encoding.parse()?;
        if self.include_labels && self.no_labels {
            log::debug!("--no_labels overrides --include_labels");
        }
        let mut opts = ConvertOptions::new(self.in_xlsx, self.out_jsonl, self.labelmap);
        opts.sheet = self.sheet;
        opts.threshold = self.threshold;
        opts.include_labels = !self.no_labels;
        opts.skip_no_label = self.skip_no_label;
        opts.encoding = encoding;
        Ok(opts)
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
