//! Bulk document loading with `include` inheritance.
//!
//! A bulk document may name a parent through `include`. The chain is followed
//! child first until a document has no `include`, then merged root first so
//! that the most specific document wins on key collisions.
//!
//! Relative references are resolved against the directory of the document
//! that holds them. The process working directory is never changed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::document::{Document, ensure_supported, kind, read_document};
use crate::error::{ImportError, Result};

/// Keys with structural meaning; everything else is a job default.
pub const RESERVED_KEYS: [&str; 3] = ["path", "columns", "include"];

/// One document in an include chain.
#[derive(Debug, Clone)]
pub struct ChainLink {
    /// Absolute location of the document.
    pub location: PathBuf,
    /// Directory that relative references in this document resolve against.
    pub base_dir: PathBuf,
    pub document: Document,
}

/// Documents reachable from a starting document through `include`, child first.
#[derive(Debug, Clone)]
pub struct IncludeChain {
    links: Vec<ChainLink>,
}

impl IncludeChain {
    /// Follow `include` references from `start` up to the root document.
    pub fn discover(start: &Path) -> Result<Self> {
        ensure_supported(start)?;
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(absolute(start)?);

        while let Some(location) = next.take() {
            let identity = fs::canonicalize(&location).unwrap_or_else(|_| location.clone());
            if !seen.insert(identity) {
                return Err(ImportError::IncludeCycle { path: location });
            }
            let document = read_document(&location)?;
            let base_dir = location
                .parent()
                .map_or_else(PathBuf::new, Path::to_path_buf);
            next = include_target(&document, &location)?.map(|include| base_dir.join(include));
            debug!(
                document = %location.display(),
                depth = links.len(),
                include = ?next,
                "loaded bulk document"
            );
            links.push(ChainLink {
                location,
                base_dir,
                document,
            });
        }

        Ok(Self { links })
    }

    /// Build a chain from already-loaded links, child first.
    #[must_use]
    pub fn from_links(links: Vec<ChainLink>) -> Self {
        Self { links }
    }

    #[must_use]
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// The starting (most specific) document.
    #[must_use]
    pub fn start(&self) -> Option<&ChainLink> {
        self.links.first()
    }

    /// Overlay every document, root first; the starting document wins.
    #[must_use]
    pub fn merge(&self) -> Document {
        let mut merged = Document::new();
        for link in self.links.iter().rev() {
            for (key, value) in &link.document {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

/// A merged bulk document, ready for row expansion.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// The document the bulk run was started from.
    pub source: PathBuf,
    /// Directory of the starting document; the importer runs from here.
    pub base_dir: PathBuf,
    /// Row file, or the single import target when no columns are declared.
    pub path: PathBuf,
    pub columns: Vec<String>,
    /// Remaining keys, applied to every job as defaults.
    pub defaults: Document,
    /// Every document that contributed, child first.
    pub documents: Vec<PathBuf>,
}

impl BulkConfig {
    /// Merge an include chain into a bulk configuration.
    pub fn from_chain(chain: &IncludeChain) -> Result<Self> {
        let Some(start) = chain.start() else {
            return Err(ImportError::MissingPath {
                path: PathBuf::new(),
            });
        };

        // `path` is resolved against the document that declared it.
        let mut path = None;
        for link in chain.links().iter().rev() {
            match link.document.get("path") {
                Some(Value::String(raw)) => path = Some(link.base_dir.join(raw)),
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(ImportError::InvalidField {
                        key: "path".to_string(),
                        path: link.location.clone(),
                        reason: format!("expected a string, found {}", kind(other)),
                    });
                }
            }
        }
        let path = path.ok_or_else(|| ImportError::MissingPath {
            path: start.location.clone(),
        })?;

        let mut merged = chain.merge();
        let columns = match merged.get("columns") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => parse_columns(value, &start.location)?,
        };
        for key in RESERVED_KEYS {
            merged.remove(key);
        }

        Ok(Self {
            source: start.location.clone(),
            base_dir: start.base_dir.clone(),
            path,
            columns,
            defaults: merged,
            documents: chain.links().iter().map(|link| link.location.clone()).collect(),
        })
    }

    /// Whether the row file drives one job per row.
    #[must_use]
    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Load a bulk document and everything it includes.
pub fn load_bulk(start: &Path) -> Result<BulkConfig> {
    let chain = IncludeChain::discover(start)?;
    BulkConfig::from_chain(&chain)
}

fn include_target(document: &Document, location: &Path) -> Result<Option<PathBuf>> {
    match document.get("include") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(include)) if include.trim().is_empty() => Ok(None),
        Some(Value::String(include)) => Ok(Some(PathBuf::from(include))),
        Some(other) => Err(ImportError::InvalidField {
            key: "include".to_string(),
            path: location.to_path_buf(),
            reason: format!("expected a string, found {}", kind(other)),
        }),
    }
}

fn parse_columns(value: &Value, location: &Path) -> Result<Vec<String>> {
    let invalid = |reason: String| ImportError::InvalidField {
        key: "columns".to_string(),
        path: location.to_path_buf(),
        reason,
    };
    let Value::Array(items) = value else {
        return Err(invalid(format!("expected a list, found {}", kind(value))));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(invalid(format!(
                "expected column names, found {}",
                kind(other)
            ))),
        })
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| ImportError::DocumentRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(dir: &str, document: Value) -> ChainLink {
        let Value::Object(document) = document else {
            panic!("test documents are mappings");
        };
        ChainLink {
            location: PathBuf::from(dir).join("bulk.yml"),
            base_dir: PathBuf::from(dir),
            document,
        }
    }

    #[test]
    fn child_overrides_parent() {
        let chain = IncludeChain::from_links(vec![
            link("/child", json!({"name": "child", "include": "../root/bulk.yml"})),
            link("/root", json!({"name": "root", "continue": true, "path": "files.txt"})),
        ]);
        let merged = chain.merge();
        assert_eq!(merged.get("name"), Some(&json!("child")));
        assert_eq!(merged.get("continue"), Some(&json!(true)));
    }

    #[test]
    fn path_resolves_against_declaring_document() {
        let chain = IncludeChain::from_links(vec![
            link("/child", json!({"include": "../root/bulk.yml", "columns": ["path"]})),
            link("/root", json!({"path": "rows.tsv"})),
        ]);
        let bulk = BulkConfig::from_chain(&chain).expect("bulk");
        assert_eq!(bulk.path, PathBuf::from("/root/rows.tsv"));
        assert_eq!(bulk.base_dir, PathBuf::from("/child"));
        assert_eq!(bulk.columns, vec!["path".to_string()]);
        assert!(bulk.defaults.is_empty());
    }

    #[test]
    fn missing_path_is_reported() {
        let chain = IncludeChain::from_links(vec![link("/only", json!({"name": "x"}))]);
        let err = BulkConfig::from_chain(&chain).expect_err("no path");
        assert!(matches!(err, ImportError::MissingPath { .. }));
    }

    #[test]
    fn columns_must_be_strings() {
        let chain =
            IncludeChain::from_links(vec![link("/d", json!({"path": "a", "columns": [1]}))]);
        let err = BulkConfig::from_chain(&chain).expect_err("numeric column");
        assert!(err.to_string().contains("columns"));
    }
}
