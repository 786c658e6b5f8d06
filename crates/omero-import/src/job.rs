//! Per-invocation job configuration and the importer flag table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::document::{Document, kind};
use crate::error::{ImportError, Result};

/// Default number of directories the importer scans below each path.
pub const DEFAULT_DEPTH: u32 = 4;

/// How a flag and its value are laid out on the importer command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagShape {
    /// `-X value`, or a bare `-X` for toggles.
    Separate,
    /// `--name=value`.
    Joined,
}

/// Whether a flag carries a value or is a plain switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Toggle,
    Value,
}

/// One entry of the importer flag table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaFlag {
    /// Field name used by bulk documents and row columns.
    pub field: &'static str,
    /// Flag as the importer expects it.
    pub flag: &'static str,
    pub shape: FlagShape,
    pub kind: FlagKind,
}

const fn toggle(field: &'static str, flag: &'static str) -> JavaFlag {
    JavaFlag {
        field,
        flag,
        shape: FlagShape::Separate,
        kind: FlagKind::Toggle,
    }
}

const fn separate(field: &'static str, flag: &'static str) -> JavaFlag {
    JavaFlag {
        field,
        flag,
        shape: FlagShape::Separate,
        kind: FlagKind::Value,
    }
}

const fn joined(field: &'static str, flag: &'static str) -> JavaFlag {
    JavaFlag {
        field,
        flag,
        shape: FlagShape::Joined,
        kind: FlagKind::Value,
    }
}

/// Flags forwarded to the importer, in emission order.
pub const JAVA_FLAGS: &[JavaFlag] = &[
    toggle("f", "-f"),
    toggle("c", "-c"),
    separate("l", "-l"),
    separate("d", "-d"),
    separate("r", "-r"),
    joined("target", "--target"),
    joined("name", "--name"),
    joined("description", "--description"),
    joined("plate_name", "--plate_name"),
    joined("plate_description", "--plate_description"),
    toggle("report", "--report"),
    toggle("upload", "--upload"),
    toggle("logs", "--logs"),
    separate("email", "--email"),
    joined("debug", "--debug"),
    joined("output", "--output"),
    joined("qa_baseurl", "--qa-baseurl"),
    separate("ns", "--annotation-ns"),
    separate("text", "--annotation-text"),
    separate("link", "--annotation-link"),
    toggle("advanced_help", "--advanced-help"),
];

/// Look up a flag table entry by field name.
#[must_use]
pub fn java_flag(field: &str) -> Option<&'static JavaFlag> {
    JAVA_FLAGS.iter().find(|flag| flag.field == field)
}

/// Value held by a flag field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Toggle(bool),
    Text(String),
}

impl FlagValue {
    /// Whether the flag should be emitted at all.
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Toggle(on) => *on,
            Self::Text(text) => !text.is_empty(),
        }
    }
}

/// Optional import steps that can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipStep {
    All,
    Checksum,
    Minmax,
    Thumbnails,
    Upgrade,
}

impl SkipStep {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Checksum => "checksum",
            Self::Minmax => "minmax",
            Self::Thumbnails => "thumbnails",
            Self::Upgrade => "upgrade",
        }
    }
}

impl FromStr for SkipStep {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "checksum" => Ok(Self::Checksum),
            "minmax" => Ok(Self::Minmax),
            "thumbnails" => Ok(Self::Thumbnails),
            "upgrade" => Ok(Self::Upgrade),
            _ => Err(ImportError::InvalidSkip {
                value: value.to_string(),
            }),
        }
    }
}

/// Where the child's standard streams go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirect {
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    /// Directory or file prefix joined in front of both targets.
    pub prefix: Option<PathBuf>,
}

impl Redirect {
    /// Resolved stdout target, if any.
    #[must_use]
    pub fn stdout_target(&self) -> Option<PathBuf> {
        self.stdout.as_deref().map(|path| self.prefixed(path))
    }

    /// Resolved stderr target, if any.
    #[must_use]
    pub fn stderr_target(&self) -> Option<PathBuf> {
        self.stderr.as_deref().map(|path| self.prefixed(path))
    }

    /// The prefix is kept even when `path` is absolute.
    fn prefixed(&self, path: &Path) -> PathBuf {
        match &self.prefix {
            Some(prefix) => prefix.join(
                path.components()
                    .filter(|part| !matches!(part, Component::Prefix(_) | Component::RootDir))
                    .collect::<PathBuf>(),
            ),
            None => path.to_path_buf(),
        }
    }
}

/// Fully resolved parameters for one importer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Positional path arguments.
    pub paths: Vec<String>,
    flags: BTreeMap<&'static str, FlagValue>,
    pub skip: BTreeSet<SkipStep>,
    pub depth: u32,
    pub redirect: Redirect,
    /// Ask the importer for its own help text (`-h`).
    pub java_help: bool,
    /// Tokens forwarded verbatim after the table flags.
    pub passthrough: Vec<String>,
    /// Unrecognized fields, kept by name for downstream lookups.
    pub attributes: BTreeMap<String, String>,
    /// Source row (1-based) when the job came from a row file.
    pub row: Option<usize>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            flags: BTreeMap::new(),
            skip: BTreeSet::new(),
            depth: DEFAULT_DEPTH,
            redirect: Redirect::default(),
            java_help: false,
            passthrough: Vec::new(),
            attributes: BTreeMap::new(),
            row: None,
        }
    }
}

impl JobConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag table field. Unknown fields go to the attribute map.
    pub fn set_flag(&mut self, field: &str, value: FlagValue) {
        match java_flag(field) {
            Some(entry) => {
                self.flags.insert(entry.field, value);
            }
            None => {
                let text = match value {
                    FlagValue::Toggle(on) => on.to_string(),
                    FlagValue::Text(text) => text,
                };
                self.attributes.insert(field.to_string(), text);
            }
        }
    }

    #[must_use]
    pub fn flag(&self, field: &str) -> Option<&FlagValue> {
        self.flags.get(field)
    }

    fn toggle_on(&self, field: &str) -> bool {
        matches!(self.flags.get(field), Some(value) if value.is_set())
    }

    /// Whether a failed job lets the batch carry on (`-c`).
    #[must_use]
    pub fn continue_on_error(&self) -> bool {
        self.toggle_on("c")
    }

    /// Login flags are needed unless only help or a used-files listing is requested.
    #[must_use]
    pub fn login_required(&self) -> bool {
        !self.java_help && !self.toggle_on("f") && !self.toggle_on("advanced_help")
    }

    /// Apply one textual field, as read from a row file.
    pub fn apply_text(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "path" => self.paths = vec![value.to_string()],
            "continue" => self.set_flag("c", FlagValue::Toggle(parse_toggle(key, value)?)),
            "skip" => {
                self.skip = value
                    .split([',', ' '])
                    .filter(|part| !part.trim().is_empty())
                    .map(str::parse)
                    .collect::<Result<_>>()?;
            }
            "depth" => self.depth = parse_depth(value)?,
            "file" => self.redirect.stdout = Some(PathBuf::from(value)),
            "errs" => self.redirect.stderr = Some(PathBuf::from(value)),
            "logprefix" => self.redirect.prefix = Some(PathBuf::from(value)),
            _ => match java_flag(key) {
                Some(entry) if entry.kind == FlagKind::Toggle => {
                    let on = parse_toggle(key, value)?;
                    self.flags.insert(entry.field, FlagValue::Toggle(on));
                }
                Some(entry) => {
                    self.flags.insert(entry.field, FlagValue::Text(value.to_string()));
                }
                None => {
                    debug!(field = %key, "keeping unrecognized field as job attribute");
                    self.attributes.insert(key.to_string(), value.to_string());
                }
            },
        }
        Ok(())
    }

    /// Apply one structured field, as read from a bulk document.
    pub fn apply_value(&mut self, key: &str, value: &Value) -> Result<()> {
        match value {
            Value::Null => {
                self.clear(key);
                Ok(())
            }
            Value::Bool(on) => match java_flag(key) {
                Some(entry) => {
                    self.flags.insert(entry.field, FlagValue::Toggle(*on));
                    Ok(())
                }
                None if key == "continue" => {
                    self.set_flag("c", FlagValue::Toggle(*on));
                    Ok(())
                }
                None => self.apply_text(key, &on.to_string()),
            },
            Value::Number(number) => self.apply_text(key, &number.to_string()),
            Value::String(text) => self.apply_text(key, text),
            Value::Array(items) if key == "skip" => {
                self.skip = items
                    .iter()
                    .map(|item| match item {
                        Value::String(step) => step.parse(),
                        other => Err(invalid(key, other, "a list of skip steps")),
                    })
                    .collect::<Result<_>>()?;
                Ok(())
            }
            other if is_job_field(key) => Err(invalid(key, other, "a scalar value")),
            other => {
                debug!(
                    field = %key,
                    kind = kind(other),
                    "keeping structured field as job attribute"
                );
                self.attributes.insert(key.to_string(), other.to_string());
                Ok(())
            }
        }
    }

    /// Overlay bulk document defaults onto a copy of this job.
    ///
    /// Document values replace values given on the command line, including
    /// the whole set of skip steps.
    pub fn with_defaults(&self, defaults: &Document, source: &Path) -> Result<Self> {
        let mut job = self.clone();
        for (key, value) in defaults {
            job.apply_value(key, value)
                .map_err(|err| ImportError::InvalidField {
                    key: key.clone(),
                    path: source.to_path_buf(),
                    reason: err.to_string(),
                })?;
        }
        Ok(job)
    }

    fn clear(&mut self, key: &str) {
        match key {
            "continue" => {
                self.flags.remove("c");
            }
            "skip" => self.skip.clear(),
            "depth" => self.depth = DEFAULT_DEPTH,
            "file" => self.redirect.stdout = None,
            "errs" => self.redirect.stderr = None,
            "logprefix" => self.redirect.prefix = None,
            _ => match java_flag(key) {
                Some(entry) => {
                    self.flags.remove(entry.field);
                }
                None => {
                    self.attributes.remove(key);
                }
            },
        }
    }
}

fn parse_toggle(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(ImportError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_depth(value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ImportError::InvalidValue {
            field: "depth".to_string(),
            value: value.to_string(),
            expected: "a non-negative integer",
        })
}

/// Keys that feed importer flags or launcher settings rather than the attribute map.
fn is_job_field(key: &str) -> bool {
    matches!(
        key,
        "path" | "continue" | "skip" | "depth" | "file" | "errs" | "logprefix"
    ) || java_flag(key).is_some()
}

fn invalid(key: &str, value: &Value, expected: &'static str) -> ImportError {
    ImportError::InvalidValue {
        field: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_table_fields_are_unique() {
        let fields: BTreeSet<_> = JAVA_FLAGS.iter().map(|flag| flag.field).collect();
        assert_eq!(fields.len(), JAVA_FLAGS.len());
    }

    #[test]
    fn row_text_sets_recognized_flags_and_attributes() {
        let mut job = JobConfig::new();
        job.apply_text("name", "ImgA").expect("name");
        job.apply_text("c", "yes").expect("toggle");
        job.apply_text("plate_barcode", "P-17").expect("attribute");

        assert_eq!(job.flag("name"), Some(&FlagValue::Text("ImgA".to_string())));
        assert!(job.continue_on_error());
        assert_eq!(
            job.attributes.get("plate_barcode").map(String::as_str),
            Some("P-17")
        );
    }

    #[test]
    fn toggle_rejects_free_text() {
        let mut job = JobConfig::new();
        let err = job.apply_text("report", "maybe").expect_err("not a bool");
        assert!(matches!(err, ImportError::InvalidValue { .. }));
    }

    #[test]
    fn skip_accepts_lists_and_comma_separated_text() {
        let mut job = JobConfig::new();
        job.apply_value("skip", &json!(["checksum", "minmax"]))
            .expect("list");
        assert_eq!(
            job.skip,
            BTreeSet::from([SkipStep::Checksum, SkipStep::Minmax])
        );
        job.apply_text("skip", "thumbnails, upgrade").expect("text");
        assert_eq!(
            job.skip,
            BTreeSet::from([SkipStep::Thumbnails, SkipStep::Upgrade])
        );
        assert!(job.apply_text("skip", "everything").is_err());
    }

    #[test]
    fn document_skip_replaces_cli_skip() {
        let mut cli_job = JobConfig::new();
        cli_job.skip.insert(SkipStep::Checksum);
        let mut defaults = Document::new();
        defaults.insert("skip".to_string(), json!(["minmax"]));

        let job = cli_job
            .with_defaults(&defaults, Path::new("bulk.yml"))
            .expect("defaults");
        assert_eq!(job.skip, BTreeSet::from([SkipStep::Minmax]));
    }

    #[test]
    fn structured_extra_fields_become_attributes() {
        let mut defaults = Document::new();
        defaults.insert("metadata".to_string(), json!({"owner": "lab"}));
        defaults.insert("tags".to_string(), json!(["x", "y"]));

        let job = JobConfig::new()
            .with_defaults(&defaults, Path::new("bulk.yml"))
            .expect("defaults");
        assert_eq!(
            job.attributes.get("metadata").map(String::as_str),
            Some(r#"{"owner":"lab"}"#)
        );
        assert_eq!(
            job.attributes.get("tags").map(String::as_str),
            Some(r#"["x","y"]"#)
        );
    }

    #[test]
    fn structured_value_for_flag_names_the_value() {
        let mut job = JobConfig::new();
        let err = job
            .apply_value("name", &json!(["a", "b"]))
            .expect_err("list name");
        assert_eq!(
            err.to_string(),
            r#"invalid value '["a","b"]' for 'name': expected a scalar value"#
        );
    }

    #[test]
    fn continue_false_in_document_overrides_cli() {
        let mut cli_job = JobConfig::new();
        cli_job.set_flag("c", FlagValue::Toggle(true));
        let mut defaults = Document::new();
        defaults.insert("continue".to_string(), json!(false));

        let job = cli_job
            .with_defaults(&defaults, Path::new("bulk.yml"))
            .expect("defaults");
        assert!(!job.continue_on_error());
        assert!(cli_job.continue_on_error());
    }

    #[test]
    fn login_not_required_for_used_files_listing() {
        let mut job = JobConfig::new();
        assert!(job.login_required());
        job.set_flag("f", FlagValue::Toggle(true));
        assert!(!job.login_required());
    }

    #[test]
    fn redirect_prefix_applies_to_both_streams() {
        let redirect = Redirect {
            stdout: Some(PathBuf::from("out.log")),
            stderr: Some(PathBuf::from("err.log")),
            prefix: Some(PathBuf::from("logs")),
        };
        assert_eq!(redirect.stdout_target(), Some(PathBuf::from("logs/out.log")));
        assert_eq!(redirect.stderr_target(), Some(PathBuf::from("logs/err.log")));
    }

    #[cfg(unix)]
    #[test]
    fn redirect_prefix_is_kept_for_absolute_targets() {
        let redirect = Redirect {
            stdout: Some(PathBuf::from("/tmp/out.log")),
            stderr: None,
            prefix: Some(PathBuf::from("logs/run1")),
        };
        assert_eq!(
            redirect.stdout_target(),
            Some(PathBuf::from("logs/run1/tmp/out.log"))
        );
        assert_eq!(redirect.stderr_target(), None);
    }

    #[test]
    fn invalid_document_field_names_source() {
        let mut defaults = Document::new();
        defaults.insert("depth".to_string(), json!("deep"));
        let err = JobConfig::new()
            .with_defaults(&defaults, Path::new("bulk.yml"))
            .expect_err("bad depth");
        assert!(err.to_string().contains("bulk.yml"));
    }
}
