//! CLI argument definitions for the importer wrapper.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use omero_import::{Connection, SkipStep};

#[derive(Parser)]
#[command(
    name = "omero-import",
    version,
    about = "Run the Java-based command-line importer",
    long_about = "Run the Java-based command-line importer.\n\n\
                  Login is handled by this wrapper; every option marked (**) is passed\n\
                  strictly to Java. Tokens after \"--\" are forwarded verbatim.\n\
                  Use --bulk with a YAML or JSON document to drive many imports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import images through the Java command-line importer.
    Import(ImportArgs),

    /// Run the importer TestEngine suite (developers only).
    #[command(name = "testengine")]
    TestEngine(ImportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Server host name.
    #[arg(short = 's', long = "server", env = "OMERO_HOST", value_name = "HOST")]
    pub server: Option<String>,

    /// Server port.
    #[arg(
        short = 'p',
        long = "port",
        env = "OMERO_PORT",
        default_value_t = 4064,
        value_name = "PORT"
    )]
    pub port: u16,

    /// Key of an existing session.
    #[arg(short = 'k', long = "key", env = "OMERO_SESSION_KEY", value_name = "KEY")]
    pub key: Option<String>,
}

impl ConnectionArgs {
    /// Connection parameters, when both a server and a session key are known.
    #[must_use]
    pub fn connection(&self) -> Option<Connection> {
        match (&self.server, &self.key) {
            (Some(host), Some(session)) => Some(Connection {
                host: host.clone(),
                port: self.port,
                session: session.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Show the Java help text.
    #[arg(long = "javahelp", visible_alias = "java-help")]
    pub java_help: bool,

    /// Show the advanced help text.
    #[arg(long = "advanced-help")]
    pub advanced_help: bool,

    /// Bulk YAML or JSON file for driving multiple imports.
    #[arg(long = "bulk", value_name = "FILE")]
    pub bulk: Option<PathBuf>,

    /// Directory or file prefix to prepend to --file and --errs.
    #[arg(long = "logprefix", value_name = "PREFIX")]
    pub logprefix: Option<PathBuf>,

    /// File for storing the standard out of the Java process.
    #[arg(long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// File for storing the standard err of the Java process.
    #[arg(long = "errs", value_name = "FILE")]
    pub errs: Option<PathBuf>,

    /// Installation directory (default: current directory).
    #[arg(long = "omero-dir", env = "OMERODIR", value_name = "DIR", default_value = ".")]
    pub omero_dir: PathBuf,

    /// Path to the directory containing the client JARs (default: <omero-dir>/lib/client).
    #[arg(long = "clientdir", value_name = "DIR")]
    pub clientdir: Option<PathBuf>,

    /// Path to a logback xml file (default: <omero-dir>/etc/logback-cli.xml).
    #[arg(long = "logback", value_name = "FILE")]
    pub logback: Option<PathBuf>,

    /// Java executable used to launch the importer.
    #[arg(long = "java", env = "JAVA", value_name = "PATH", default_value = "java")]
    pub java: String,

    /// Image or plate name to use (**).
    #[arg(short = 'n', long = "name", value_name = "NAME", help_heading = "Naming arguments")]
    pub name: Option<String>,

    /// Image or plate description to use (**).
    #[arg(
        short = 'x',
        long = "description",
        value_name = "DESCRIPTION",
        help_heading = "Naming arguments"
    )]
    pub description: Option<String>,

    #[arg(long = "plate_name", hide = true)]
    pub plate_name: Option<String>,

    #[arg(long = "plate_description", hide = true)]
    pub plate_description: Option<String>,

    /// Report errors to the OME team (**).
    #[arg(long = "report", help_heading = "Feedback arguments")]
    pub report: bool,

    /// Upload broken files and log file (if any) with report. Requires --report (**).
    #[arg(long = "upload", help_heading = "Feedback arguments")]
    pub upload: bool,

    /// Upload log file (if any) with report. Requires --report (**).
    #[arg(long = "logs", help_heading = "Feedback arguments")]
    pub logs: bool,

    /// Email for reported errors. Requires --report (**).
    #[arg(long = "email", value_name = "EMAIL", help_heading = "Feedback arguments")]
    pub email: Option<String>,

    #[arg(long = "qa-baseurl", hide = true)]
    pub qa_baseurl: Option<String>,

    /// Namespace to use for subsequent annotation (**).
    #[arg(
        long = "annotation-ns",
        alias = "annotation_ns",
        value_name = "ANNOTATION_NS",
        help_heading = "Annotation arguments"
    )]
    pub annotation_ns: Option<String>,

    /// Content for a text annotation (requires namespace) (**).
    #[arg(
        long = "annotation-text",
        alias = "annotation_text",
        value_name = "ANNOTATION_TEXT",
        help_heading = "Annotation arguments"
    )]
    pub annotation_text: Option<String>,

    /// Comment annotation ID to link all images to (**).
    #[arg(
        long = "annotation-link",
        alias = "annotation_link",
        value_name = "ANNOTATION_LINK",
        help_heading = "Annotation arguments"
    )]
    pub annotation_link: Option<String>,

    /// Display the used files and exit (**).
    #[arg(short = 'f', help_heading = "Java arguments")]
    pub used_files: bool,

    /// Continue importing after errors (**).
    #[arg(short = 'c', help_heading = "Java arguments")]
    pub continue_on_error: bool,

    /// Use the list of readers rather than the default (**).
    #[arg(short = 'l', value_name = "READER_FILE", help_heading = "Java arguments")]
    pub readers: Option<String>,

    /// OMERO dataset ID to import image into (**).
    #[arg(short = 'd', value_name = "DATASET_ID", help_heading = "Java arguments")]
    pub dataset: Option<String>,

    /// OMERO screen ID to import plate into (**).
    #[arg(short = 'r', value_name = "SCREEN_ID", help_heading = "Java arguments")]
    pub screen: Option<String>,

    /// OMERO target specification (**).
    #[arg(
        short = 'T',
        long = "target",
        value_name = "TARGET",
        help_heading = "Java arguments"
    )]
    pub target: Option<String>,

    /// Turn debug logging on (**).
    #[arg(long = "debug", value_enum, value_name = "LEVEL", help_heading = "Java arguments")]
    pub debug: Option<DebugArg>,

    /// Set an alternative output style.
    #[arg(long = "output", value_enum, value_name = "TYPE", help_heading = "Java arguments")]
    pub output: Option<OutputArg>,

    /// Number of directories to scan down for files.
    #[arg(long = "depth", default_value_t = omero_import::DEFAULT_DEPTH)]
    pub depth: u32,

    /// Optional step to skip during import (repeatable).
    #[arg(long = "skip", value_enum)]
    pub skip: Vec<SkipArg>,

    /// Paths to be passed to the Java process.
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Arguments passed verbatim to the Java process.
    #[arg(last = true, value_name = "JAVA_ARGS")]
    pub java_args: Vec<String>,
}

/// Importer debug levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DebugArg {
    #[value(name = "ALL")]
    All,
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "FATAL")]
    Fatal,
    #[value(name = "INFO")]
    Info,
    #[value(name = "TRACE")]
    Trace,
    #[value(name = "WARN")]
    Warn,
}

impl DebugArg {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Info => "INFO",
            Self::Trace => "TRACE",
            Self::Warn => "WARN",
        }
    }
}

/// Importer output styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Legacy,
    Yaml,
}

impl OutputArg {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Yaml => "yaml",
        }
    }
}

/// Import steps that can be skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SkipArg {
    All,
    Checksum,
    Minmax,
    Thumbnails,
    Upgrade,
}

impl From<SkipArg> for SkipStep {
    fn from(arg: SkipArg) -> Self {
        match arg {
            SkipArg::All => Self::All,
            SkipArg::Checksum => Self::Checksum,
            SkipArg::Minmax => Self::Minmax,
            SkipArg::Thumbnails => Self::Thumbnails,
            SkipArg::Upgrade => Self::Upgrade,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
