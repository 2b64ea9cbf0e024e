use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the conversion pipeline.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Everything that can stop a conversion run.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// A required input path does not exist.
    #[error("{what} not found: {}", .path.display())]
    InputNotFound { what: &'static str, path: PathBuf },

    /// The labelmap is missing a key or has the wrong shape.
    #[error("{0}")]
    Schema(String),

    /// The spreadsheet lacks the text column or some label columns.
    #[error(
        "spreadsheet missing required columns:\n{}\n\nAvailable columns:\n{}",
        bullet_list(.missing),
        bullet_list(.available)
    )]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// The underlying parser could not read the file.
    #[error("failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    /// A label judged active has no entry in `label2id`.
    #[error("label {label:?} is active but has no id in label2id")]
    KeyLookup { label: String },

    /// A label judged active has an id that is not integer-like.
    #[error("label {label:?} is active but its label2id entry {value} is not an integer")]
    InvalidId { label: String, value: String },

    #[error("unsupported output encoding: {0:?} (expected utf-8 or utf-8-sig)")]
    UnsupportedEncoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Wrap a loader failure, keeping the whole `anyhow` context chain.
    pub fn read(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Read {
            path: path.into(),
            message: format!("{err:#}"),
        }
    }

    /// Process exit status for this error.
    ///
    /// Precondition failures exit with 2. Failures after streaming has
    /// started abort the run with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConvertError::InputNotFound { .. }
            | ConvertError::Schema(_)
            | ConvertError::MissingColumns { .. }
            | ConvertError::Read { .. }
            | ConvertError::UnsupportedEncoding(_) => 2,
            ConvertError::KeyLookup { .. }
            | ConvertError::InvalidId { .. }
            | ConvertError::Io(_)
            | ConvertError::Json(_) => 1,
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
