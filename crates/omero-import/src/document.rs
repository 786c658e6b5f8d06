//! Structured bulk documents (YAML or JSON) parsed into a string-keyed mapping.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ImportError, Result};

/// A parsed bulk document: top-level keys to scalar, list or mapping values.
pub type Document = Map<String, Value>;

/// Structured formats a bulk document may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick a format from the file extension. Anything that is not JSON is read as YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json" | "js") => Self::Json,
            _ => Self::Yaml,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Whether a parser for this format is compiled in.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        match self {
            Self::Json => true,
            Self::Yaml => cfg!(feature = "yaml"),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Capability check for the document at `path`.
///
/// Run once before any document is read so a missing parser is reported
/// up front rather than halfway through an include chain.
pub fn ensure_supported(path: &Path) -> Result<DocumentFormat> {
    let format = DocumentFormat::from_path(path);
    if format.is_supported() {
        Ok(format)
    } else {
        Err(ImportError::FormatUnsupported {
            format: format.label(),
            path: path.to_path_buf(),
        })
    }
}

/// Read and parse a single bulk document.
pub fn read_document(path: &Path) -> Result<Document> {
    let format = ensure_supported(path)?;
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ImportError::DocumentNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ImportError::DocumentRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_document(&text, format, path)
}

/// Parse document text. The root must be a single mapping.
pub fn parse_document(text: &str, format: DocumentFormat, path: &Path) -> Result<Document> {
    let value = match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(text).map_err(|err| ImportError::DocumentParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?
        }
        DocumentFormat::Yaml => parse_yaml(text, path)?,
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ImportError::DocumentParse {
            path: path.to_path_buf(),
            message: "document is empty".to_string(),
        }),
        other => Err(ImportError::DocumentParse {
            path: path.to_path_buf(),
            message: format!("expected a mapping at the top level, found {}", kind(&other)),
        }),
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(text: &str, path: &Path) -> Result<Value> {
    serde_yaml::from_str::<Value>(text).map_err(|err| ImportError::DocumentParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(_text: &str, path: &Path) -> Result<Value> {
    Err(ImportError::FormatUnsupported {
        format: DocumentFormat::Yaml.label(),
        path: path.to_path_buf(),
    })
}

/// Short name of a value's type for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
