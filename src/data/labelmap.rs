use std::collections::HashMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{ConvertError, Result};

/// Keys every labelmap must carry.
const REQUIRED_KEYS: [&str; 3] = ["text_column", "label_names", "label2id"];

// ---------------------------------------------------------------------------
// LabelMap – the external label dictionary
// ---------------------------------------------------------------------------

/// Label dictionary: which column holds the text, which columns are labels
/// (in output order), and the integer id of each label.
///
/// ```json
/// {
///   "text_column": "RequirementText",
///   "label_names": ["Functional (F)", "Availability (A)"],
///   "label2id": {"Functional (F)": 0, "Availability (A)": 1}
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    pub text_column: String,
    pub label_names: Vec<String>,
    /// Raw ids, converted to integers only when a label is used.
    pub label2id: HashMap<String, JsonValue>,
}

impl LabelMap {
    /// Read and validate a labelmap file.
    ///
    /// Only presence and shape are checked here. A label without an id, or
    /// with an id that is not an integer, is accepted and only fails once a
    /// row marks it active.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::read(path, anyhow::Error::new(e).context("reading labelmap")))?;
        let root: JsonValue = serde_json::from_str(&text)
            .map_err(|e| ConvertError::read(path, anyhow::Error::new(e).context("parsing labelmap JSON")))?;
        Self::from_json(&root)
    }

    /// Validate an already-parsed labelmap document.
    pub fn from_json(root: &JsonValue) -> Result<Self> {
        let obj = root
            .as_object()
            .ok_or_else(|| ConvertError::schema("labelmap must be a JSON object"))?;

        for key in REQUIRED_KEYS {
            if !obj.contains_key(key) {
                return Err(ConvertError::schema(format!("labelmap missing key: '{key}'")));
            }
        }

        let (Some(names), Some(ids)) = (obj["label_names"].as_array(), obj["label2id"].as_object())
        else {
            return Err(ConvertError::schema(
                "labelmap has invalid schema (label_names must be list, label2id must be dict)",
            ));
        };

        let text_column = obj["text_column"]
            .as_str()
            .ok_or_else(|| ConvertError::schema("labelmap text_column must be a string"))?
            .to_string();

        let label_names = names
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    ConvertError::schema(format!("labelmap label_names[{i}] is not a string: {v}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let label2id = ids
            .iter()
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();

        Ok(LabelMap {
            text_column,
            label_names,
            label2id,
        })
    }

    /// Integer id of `name`.
    ///
    /// Fails with [`ConvertError::KeyLookup`] when the label has no entry and
    /// [`ConvertError::InvalidId`] when the entry is not integer-like.
    pub fn id_of(&self, name: &str) -> Result<i64> {
        let value = self.label2id.get(name).ok_or_else(|| ConvertError::KeyLookup {
            label: name.to_string(),
        })?;
        json_to_id(value).ok_or_else(|| ConvertError::InvalidId {
            label: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Label names that have no entry in `label2id`.
    pub fn labels_without_id(&self) -> Vec<&str> {
        self.label_names
            .iter()
            .filter(|name| !self.label2id.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Text column followed by every label column, in declared order.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.text_column.as_str()).chain(self.label_names.iter().map(String::as_str))
    }
}

/// Integer ids may be written as `3`, `3.0`, `"3"` or `true`; fractional
/// numbers truncate toward zero.
fn json_to_id(v: &JsonValue) -> Option<i64> {
    match v {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
