//! Row files that expand a bulk document into one job per row.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecordsIntoIter};

use crate::error::{ImportError, Result};
use crate::job::JobConfig;
use crate::loader::BulkConfig;

/// How a row file is split into fields, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    /// Tab-delimited (`.tsv`).
    Tsv,
    /// Comma-delimited (`.csv`).
    Csv,
    /// One shell-tokenized line per row.
    Text,
}

impl RowFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("tsv") => Self::Tsv,
            Some("csv") => Self::Csv,
            _ => Self::Text,
        }
    }
}

/// One data line of a row file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source file.
    pub number: usize,
    pub fields: Vec<String>,
}

/// Forward-only reader over the rows of a file.
///
/// Re-open the file to read it again.
pub struct RowReader {
    path: PathBuf,
    inner: RowInner,
}

enum RowInner {
    Delimited(StringRecordsIntoIter<File>),
    Text {
        lines: Lines<BufReader<File>>,
        line: usize,
    },
}

impl RowReader {
    /// Open `path` with the format implied by its extension.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_as(path, RowFormat::from_path(path))
    }

    pub fn open_as(path: &Path, format: RowFormat) -> Result<Self> {
        let file = File::open(path).map_err(|source| ImportError::RowRead {
            path: path.to_path_buf(),
            source,
        })?;
        let inner = match format {
            RowFormat::Tsv | RowFormat::Csv => {
                let delimiter = if format == RowFormat::Tsv { b'\t' } else { b',' };
                let reader = ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .delimiter(delimiter)
                    .from_reader(file);
                RowInner::Delimited(reader.into_records())
            }
            RowFormat::Text => RowInner::Text {
                lines: BufReader::new(file).lines(),
                line: 0,
            },
        };
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }
}

fn row_format(path: &Path, row: usize, reason: impl Into<String>) -> ImportError {
    ImportError::RowFormat {
        path: path.to_path_buf(),
        row,
        reason: reason.into(),
    }
}

impl Iterator for RowReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RowInner::Delimited(records) => {
                let record = records.next()?;
                Some(match record {
                    Ok(record) => {
                        let number = record
                            .position()
                            .map_or(0, |pos| usize::try_from(pos.line()).unwrap_or(usize::MAX));
                        Ok(Row {
                            number,
                            fields: record.iter().map(str::to_string).collect(),
                        })
                    }
                    Err(err) => {
                        let row = err
                            .position()
                            .map_or(0, |pos| usize::try_from(pos.line()).unwrap_or(usize::MAX));
                        Err(row_format(&self.path, row, err.to_string()))
                    }
                })
            }
            RowInner::Text { lines, line } => loop {
                let text = match lines.next()? {
                    Ok(text) => text,
                    Err(source) => {
                        return Some(Err(ImportError::RowRead {
                            path: self.path.clone(),
                            source,
                        }));
                    }
                };
                *line += 1;
                let number = *line;
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                return Some(match shlex::split(trimmed) {
                    Some(fields) => Ok(Row { number, fields }),
                    None => Err(row_format(&self.path, number, "unbalanced quotes")),
                });
            },
        }
    }
}

/// What a bulk document expands into.
pub enum RowPlan {
    /// No columns declared: one job with `path` as its only target.
    Single,
    /// One job per row of the file at `path`.
    Rows(RowReader),
}

/// Decide how a bulk configuration expands into jobs.
pub fn plan_rows(bulk: &BulkConfig) -> Result<RowPlan> {
    if bulk.has_columns() {
        Ok(RowPlan::Rows(RowReader::open(&bulk.path)?))
    } else {
        Ok(RowPlan::Single)
    }
}

/// Map a row's fields onto a copy of `base`, one declared column at a time.
pub fn apply_row(
    base: &JobConfig,
    columns: &[String],
    row: &Row,
    source: &Path,
) -> Result<JobConfig> {
    let row_error = |reason: String| row_format(source, row.number, reason);
    if row.fields.len() < columns.len() {
        return Err(row_error(format!(
            "expected {} fields for columns [{}], found {}",
            columns.len(),
            columns.join(", "),
            row.fields.len()
        )));
    }

    let mut job = base.clone();
    job.row = Some(row.number);
    for (column, field) in columns.iter().zip(&row.fields) {
        job.apply_text(column, field)
            .map_err(|err| row_error(err.to_string()))?;
    }
    Ok(job)
}

/// Lazy sequence of jobs for a bulk run.
pub struct BulkJobs {
    state: JobsState,
}

enum JobsState {
    Single(Option<JobConfig>),
    Rows {
        base: JobConfig,
        columns: Vec<String>,
        source: PathBuf,
        reader: RowReader,
        failed: bool,
    },
}

impl BulkJobs {
    /// Expand `bulk` over `base`, which already carries the document defaults.
    pub fn new(bulk: &BulkConfig, base: JobConfig) -> Result<Self> {
        let state = match plan_rows(bulk)? {
            RowPlan::Single => {
                let mut job = base;
                job.paths = vec![bulk.path.to_string_lossy().into_owned()];
                JobsState::Single(Some(job))
            }
            RowPlan::Rows(reader) => JobsState::Rows {
                base,
                columns: bulk.columns.clone(),
                source: bulk.path.clone(),
                reader,
                failed: false,
            },
        };
        Ok(Self { state })
    }

    /// Lay the document defaults over the command-line job, then expand.
    pub fn for_cli_job(bulk: &BulkConfig, cli_job: &JobConfig) -> Result<Self> {
        let base = cli_job.with_defaults(&bulk.defaults, &bulk.source)?;
        Self::new(bulk, base)
    }
}

impl Iterator for BulkJobs {
    type Item = Result<JobConfig>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            JobsState::Single(job) => job.take().map(Ok),
            JobsState::Rows {
                base,
                columns,
                source,
                reader,
                failed,
            } => {
                if *failed {
                    return None;
                }
                let result = reader.next()?.and_then(|row| {
                    apply_row(base, columns.as_slice(), &row, source.as_path())
                });
                *failed = result.is_err();
                Some(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FlagValue;

    fn row(number: usize, fields: &[&str]) -> Row {
        Row {
            number,
            fields: fields.iter().map(|field| (*field).to_string()).collect(),
        }
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(RowFormat::from_path(Path::new("a.tsv")), RowFormat::Tsv);
        assert_eq!(RowFormat::from_path(Path::new("a.CSV")), RowFormat::Csv);
        assert_eq!(RowFormat::from_path(Path::new("a.txt")), RowFormat::Text);
        assert_eq!(RowFormat::from_path(Path::new("files")), RowFormat::Text);
    }

    #[test]
    fn path_column_becomes_single_target_in_any_position() {
        let columns = vec!["name".to_string(), "path".to_string()];
        let job = apply_row(
            &JobConfig::new(),
            &columns,
            &row(1, &["ImgA", "/a.tif"]),
            Path::new("batch.csv"),
        )
        .expect("row");
        assert_eq!(job.paths, vec!["/a.tif".to_string()]);
        assert_eq!(job.flag("name"), Some(&FlagValue::Text("ImgA".to_string())));
        assert_eq!(job.row, Some(1));
    }

    #[test]
    fn short_row_is_a_format_error() {
        let columns = vec!["path".to_string(), "name".to_string()];
        let err = apply_row(
            &JobConfig::new(),
            &columns,
            &row(4, &["/a.tif"]),
            Path::new("batch.csv"),
        )
        .expect_err("short row");
        let message = err.to_string();
        assert!(message.contains("row 4"));
        assert!(message.contains("expected 2 fields"));
        assert!(message.contains("found 1"));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let columns = vec!["path".to_string()];
        let job = apply_row(
            &JobConfig::new(),
            &columns,
            &row(1, &["/a.tif", "spare"]),
            Path::new("batch.csv"),
        )
        .expect("row");
        assert_eq!(job.paths, vec!["/a.tif".to_string()]);
        assert!(job.attributes.is_empty());
    }
}
