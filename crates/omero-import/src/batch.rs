//! Sequential execution of import jobs with continue-on-error handling.

use std::path::PathBuf;

use tracing::{debug, error, info, info_span, warn};

use crate::args::{Connection, resolve};
use crate::error::{ImportError, Result};
use crate::invoker::{JavaLauncher, JobExecutor};
use crate::job::JobConfig;

/// Where a batch run stands after each job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Running,
    ContinuedAfterFailure,
    AbortedOnFailure,
    Done,
}

/// Result of one job in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// 1-based position in the batch.
    pub index: usize,
    /// Source row, when the job came from a row file.
    pub row: Option<usize>,
    pub paths: Vec<String>,
    pub exit_code: i32,
    /// State the batch moved to after this job.
    pub state: BatchState,
}

impl JobReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Exit code of the last job that ran (0 for an empty batch).
    pub exit_code: i32,
    pub jobs: Vec<JobReport>,
    /// Set when a failure stopped the batch.
    pub aborted_at: Option<usize>,
    /// `Done`, or `AbortedOnFailure` when a failure stopped the batch.
    pub state: BatchState,
}

impl BatchOutcome {
    #[must_use]
    pub fn failures(&self) -> usize {
        self.jobs.iter().filter(|job| !job.succeeded()).count()
    }

    /// Turn an aborted run into the fatal error reported to the user.
    pub fn into_result(self) -> Result<Self> {
        match self.aborted_at {
            Some(job) => Err(ImportError::ImportFailed {
                job,
                exit_code: self.exit_code,
            }),
            None => Ok(self),
        }
    }
}

/// Drives jobs one at a time through argument resolution and execution.
pub struct BatchRunner<'a, E> {
    launcher: &'a JavaLauncher,
    executor: E,
    connection: Option<Connection>,
    working_dir: Option<PathBuf>,
}

impl<'a, E: JobExecutor> BatchRunner<'a, E> {
    pub fn new(launcher: &'a JavaLauncher, executor: E) -> Self {
        Self {
            launcher,
            executor,
            connection: None,
            working_dir: None,
        }
    }

    #[must_use]
    pub fn with_connection(mut self, connection: Option<Connection>) -> Self {
        self.connection = connection;
        self
    }

    /// Directory the importer runs from; relative paths resolve against it.
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    #[must_use]
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Run one job and return its exit code.
    pub fn run_job(&mut self, job: &JobConfig) -> Result<i32> {
        let tokens = resolve(job, self.connection.as_ref())?;
        let invocation = self
            .launcher
            .invocation(job, tokens, self.working_dir.as_deref());
        debug!(args = ?invocation.args, "resolved importer invocation");
        self.executor.execute(&invocation)
    }

    /// Run every job in order.
    ///
    /// A non-zero exit stops the batch unless the failing job has
    /// continue-on-error set. Errors from the job source or from launching
    /// end the run immediately.
    pub fn run<I>(&mut self, jobs: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = Result<JobConfig>>,
    {
        let mut reports = Vec::new();
        let mut exit_code = 0;
        let mut aborted_at = None;

        for (position, job) in jobs.into_iter().enumerate() {
            let index = position + 1;
            let job = job?;
            let span = info_span!("import_job", index, row = ?job.row);
            let _guard = span.enter();

            info!(paths = ?job.paths, "starting import");
            exit_code = self.run_job(&job)?;

            let state = if exit_code == 0 {
                info!("import finished");
                BatchState::Running
            } else if job.continue_on_error() {
                warn!(exit_code, "import failed with error code {exit_code}. Continuing");
                BatchState::ContinuedAfterFailure
            } else {
                error!(exit_code, "import failed. Use -c to continue after errors");
                BatchState::AbortedOnFailure
            };
            reports.push(JobReport {
                index,
                row: job.row,
                paths: job.paths,
                exit_code,
                state,
            });
            if state == BatchState::AbortedOnFailure {
                aborted_at = Some(index);
                break;
            }
        }

        Ok(BatchOutcome {
            exit_code,
            jobs: reports,
            aborted_at,
            state: if aborted_at.is_some() {
                BatchState::AbortedOnFailure
            } else {
                BatchState::Done
            },
        })
    }
}
