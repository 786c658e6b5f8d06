//! Error types for bulk import orchestration.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code when the client library directory cannot be listed.
pub const EXIT_CLASSPATH_UNREADABLE: i32 = 102;
/// Exit code when the client library directory holds no archives.
pub const EXIT_CLASSPATH_EMPTY: i32 = 103;
/// Exit code when a bulk document and explicit paths are both given.
pub const EXIT_BULK_WITH_PATHS: i32 = 104;
/// Exit code when the bulk document format has no parser compiled in.
pub const EXIT_FORMAT_UNSUPPORTED: i32 = 105;
/// Exit code when an import fails and continue-on-error is not set.
pub const EXIT_IMPORT_FAILED: i32 = 106;
/// Exit code for every other configuration or row format problem.
pub const EXIT_CONFIG: i32 = 2;

/// Errors that can occur while resolving or running an import.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    // === Configuration Errors ===
    /// Bulk document or include target does not exist.
    #[error("bulk document not found: {path}")]
    DocumentNotFound { path: PathBuf },

    /// Bulk document could not be read.
    #[error("failed to read bulk document {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bulk document is not valid YAML/JSON or is not a mapping.
    #[error("failed to parse bulk document {path}: {message}")]
    DocumentParse { path: PathBuf, message: String },

    /// No parser for this document format was compiled in.
    #[error("{format} is unsupported: cannot load {path}")]
    FormatUnsupported { format: &'static str, path: PathBuf },

    /// An include chain refers back to a document already in the chain.
    #[error("include cycle detected: {path} is included more than once")]
    IncludeCycle { path: PathBuf },

    /// A document field has the wrong shape.
    #[error("invalid '{key}' in {path}: {reason}")]
    InvalidField {
        key: String,
        path: PathBuf,
        reason: String,
    },

    /// The merged bulk document has no `path`.
    #[error("bulk document {path} does not define 'path'")]
    MissingPath { path: PathBuf },

    /// Explicit paths were passed alongside a bulk document.
    #[error("when using bulk import, omit paths")]
    BulkWithPaths,

    /// A job field received a value of the wrong kind.
    #[error("invalid value '{value}' for '{field}': expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// A skip selector is not one of the known steps.
    #[error("invalid skip step '{value}' (expected one of: all, checksum, minmax, thumbnails, upgrade)")]
    InvalidSkip { value: String },

    /// Login is required but no session was supplied.
    #[error("no session available: supply a server and session key")]
    MissingConnection,

    // === Row Errors ===
    /// Row data file could not be opened or read.
    #[error("failed to read row file {path}: {source}")]
    RowRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row is inconsistent with the declared columns.
    #[error("row {row} of {path}: {reason}")]
    RowFormat {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    // === Classpath Errors ===
    /// Client library directory cannot be listed.
    #[error("cannot get JAR files from '{dir}' ({source})")]
    ClasspathUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Client library directory holds no archives.
    #[error("no JAR files found under '{dir}'")]
    ClasspathEmpty { dir: PathBuf },

    // === Process Errors ===
    /// Redirect target could not be created.
    #[error("failed to open log file {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The child process could not be started or waited on.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A job failed and continue-on-error was not set.
    #[error("import failed with exit code {exit_code} at job {job}. Use -c to continue after errors")]
    ImportFailed { job: usize, exit_code: i32 },
}

impl ImportError {
    /// Process exit code reported for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ClasspathUnreadable { .. } => EXIT_CLASSPATH_UNREADABLE,
            Self::ClasspathEmpty { .. } => EXIT_CLASSPATH_EMPTY,
            Self::BulkWithPaths => EXIT_BULK_WITH_PATHS,
            Self::FormatUnsupported { .. } => EXIT_FORMAT_UNSUPPORTED,
            Self::ImportFailed { .. } => EXIT_IMPORT_FAILED,
            Self::Launch { .. } | Self::LogOpen { .. } => 1,
            Self::DocumentNotFound { .. }
            | Self::DocumentRead { .. }
            | Self::DocumentParse { .. }
            | Self::IncludeCycle { .. }
            | Self::InvalidField { .. }
            | Self::MissingPath { .. }
            | Self::InvalidValue { .. }
            | Self::InvalidSkip { .. }
            | Self::MissingConnection
            | Self::RowRead { .. }
            | Self::RowFormat { .. } => EXIT_CONFIG,
        }
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_codes_are_distinct() {
        let codes = [
            ImportError::ClasspathUnreadable {
                dir: PathBuf::from("lib"),
                source: std::io::Error::other("denied"),
            }
            .exit_code(),
            ImportError::ClasspathEmpty {
                dir: PathBuf::from("lib"),
            }
            .exit_code(),
            ImportError::BulkWithPaths.exit_code(),
            ImportError::FormatUnsupported {
                format: "yaml",
                path: PathBuf::from("bulk.yml"),
            }
            .exit_code(),
            ImportError::ImportFailed {
                job: 1,
                exit_code: 1,
            }
            .exit_code(),
        ];
        assert_eq!(codes, [102, 103, 104, 105, 106]);
    }

    #[test]
    fn row_format_message_names_row_and_file() {
        let error = ImportError::RowFormat {
            path: PathBuf::from("batch.csv"),
            row: 3,
            reason: "expected 2 fields, found 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "row 3 of batch.csv: expected 2 fields, found 1"
        );
        assert_eq!(error.exit_code(), EXIT_CONFIG);
    }
}
