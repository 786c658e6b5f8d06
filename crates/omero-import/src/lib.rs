//! Bulk import orchestration for the OMERO command-line importer.
//!
//! This crate turns a bulk document (YAML or JSON, with `include`
//! inheritance) and an optional row file into a sequence of importer jobs,
//! resolves each job into a Java command line, and runs the jobs one at a
//! time with continue-on-error or fail-fast handling.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use omero_import::{BatchRunner, BulkJobs, JavaLauncher, JobConfig, LaunchSettings, ProcessExecutor, load_bulk};
//!
//! let bulk = load_bulk(Path::new("bulk.yml"))?;
//! let launcher = JavaLauncher::new(LaunchSettings::for_install(Path::new("/opt/omero")))?;
//! let jobs = BulkJobs::for_cli_job(&bulk, &JobConfig::new())?;
//! let outcome = BatchRunner::new(&launcher, ProcessExecutor)
//!     .with_working_dir(Some(bulk.base_dir.clone()))
//!     .run(jobs)?;
//! ```

mod args;
mod batch;
mod document;
mod error;
mod invoker;
mod job;
mod loader;
mod rows;

// === Error Types ===
pub use error::{
    EXIT_BULK_WITH_PATHS, EXIT_CLASSPATH_EMPTY, EXIT_CLASSPATH_UNREADABLE, EXIT_CONFIG,
    EXIT_FORMAT_UNSUPPORTED, EXIT_IMPORT_FAILED, ImportError, Result,
};

// === Bulk Documents ===
pub use document::{Document, DocumentFormat, ensure_supported, parse_document, read_document};
pub use loader::{BulkConfig, ChainLink, IncludeChain, RESERVED_KEYS, load_bulk};

// === Jobs ===
pub use job::{
    DEFAULT_DEPTH, FlagKind, FlagShape, FlagValue, JAVA_FLAGS, JavaFlag, JobConfig, Redirect,
    SkipStep, java_flag,
};
pub use rows::{BulkJobs, Row, RowFormat, RowPlan, RowReader, apply_row, plan_rows};

// === Invocation ===
pub use args::{Connection, resolve, skip_arguments};
pub use invoker::{
    DEFAULT_MAX_HEAP, IMPORTER_CLASS, Invocation, JavaLauncher, JobExecutor, LaunchSettings,
    MainClass, ProcessExecutor, TEST_ENGINE_CLASS, build_classpath, open_log,
};

// === Batch Execution ===
pub use batch::{BatchOutcome, BatchRunner, BatchState, JobReport};
