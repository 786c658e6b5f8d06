use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span};

use omero_import::{
    BatchOutcome, BatchRunner, BulkJobs, FlagValue, ImportError, JavaLauncher, JobConfig,
    LaunchSettings, MainClass, ProcessExecutor, Redirect, ensure_supported, load_bulk,
};

use crate::cli::ImportArgs;

/// Result of an `import` or `testengine` run.
#[derive(Debug)]
pub struct ImportRun {
    pub outcome: BatchOutcome,
    /// Whether the jobs came from a bulk document.
    pub bulk: bool,
}

impl ImportRun {
    /// Process exit code for this run.
    ///
    /// Single imports report the importer's own code. An aborted bulk run
    /// reports the import-failed code instead.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match (self.bulk, self.outcome.aborted_at) {
            (true, Some(job)) => ImportError::ImportFailed {
                job,
                exit_code: self.outcome.exit_code,
            }
            .exit_code(),
            _ => self.outcome.exit_code,
        }
    }
}

/// Launcher settings from the command line, rooted at the installation directory.
#[must_use]
pub fn launch_settings(args: &ImportArgs, main_class: MainClass) -> LaunchSettings {
    let defaults = LaunchSettings::for_install(&args.omero_dir);
    LaunchSettings {
        java: args.java.clone(),
        client_dir: args.clientdir.clone().unwrap_or(defaults.client_dir),
        logback: args.logback.clone().unwrap_or(defaults.logback),
        max_heap: defaults.max_heap,
        main_class,
    }
}

/// Translate command-line options into the base job configuration.
#[must_use]
pub fn job_from_args(args: &ImportArgs) -> JobConfig {
    let mut job = JobConfig::new();
    let toggles = [
        ("f", args.used_files),
        ("c", args.continue_on_error),
        ("report", args.report),
        ("upload", args.upload),
        ("logs", args.logs),
        ("advanced_help", args.advanced_help),
    ];
    for (field, on) in toggles {
        if on {
            job.set_flag(field, FlagValue::Toggle(true));
        }
    }

    let values = [
        ("l", args.readers.clone()),
        ("d", args.dataset.clone()),
        ("r", args.screen.clone()),
        ("target", args.target.clone()),
        ("name", args.name.clone()),
        ("description", args.description.clone()),
        ("plate_name", args.plate_name.clone()),
        ("plate_description", args.plate_description.clone()),
        ("email", args.email.clone()),
        ("debug", args.debug.map(|level| level.as_str().to_string())),
        ("output", args.output.map(|style| style.as_str().to_string())),
        ("qa_baseurl", args.qa_baseurl.clone()),
        ("ns", args.annotation_ns.clone()),
        ("text", args.annotation_text.clone()),
        ("link", args.annotation_link.clone()),
    ];
    for (field, value) in values {
        if let Some(value) = value {
            job.set_flag(field, FlagValue::Text(value));
        }
    }

    job.java_help = args.java_help;
    job.skip = args.skip.iter().map(|&step| step.into()).collect();
    job.depth = args.depth;
    job.redirect = Redirect {
        stdout: args.file.clone(),
        stderr: args.errs.clone(),
        prefix: args.logprefix.clone(),
    };
    job.passthrough = args.java_args.clone();
    job.paths = args.paths.clone();
    job
}

/// Run the importer for explicit paths or a bulk document.
pub fn run_import(args: &ImportArgs, main_class: MainClass) -> Result<ImportRun> {
    let settings = launch_settings(args, main_class);
    let launcher = JavaLauncher::new(settings).context("prepare importer classpath")?;
    let cli_job = job_from_args(args);
    let connection = args.connection.connection();

    let Some(bulk_path) = args.bulk.as_deref() else {
        let mut runner = BatchRunner::new(&launcher, ProcessExecutor).with_connection(connection);
        let outcome = runner.run([Ok(cli_job)])?;
        return Ok(ImportRun {
            outcome,
            bulk: false,
        });
    };

    if !args.paths.is_empty() {
        return Err(ImportError::BulkWithPaths.into());
    }
    let outcome = run_bulk(bulk_path, &cli_job, &launcher, connection)?;
    Ok(ImportRun {
        outcome,
        bulk: true,
    })
}

fn run_bulk(
    bulk_path: &Path,
    cli_job: &JobConfig,
    launcher: &JavaLauncher,
    connection: Option<omero_import::Connection>,
) -> Result<BatchOutcome> {
    let span = info_span!("bulk", document = %bulk_path.display());
    let _guard = span.enter();

    ensure_supported(bulk_path)?;
    let bulk = load_bulk(bulk_path)
        .with_context(|| format!("load bulk document {}", bulk_path.display()))?;
    debug!(
        documents = bulk.documents.len(),
        columns = ?bulk.columns,
        path = %bulk.path.display(),
        "merged bulk document"
    );

    let jobs = BulkJobs::for_cli_job(&bulk, cli_job)?;
    let mut runner = BatchRunner::new(launcher, ProcessExecutor)
        .with_connection(connection)
        .with_working_dir(Some(bulk.base_dir.clone()));
    let outcome = runner.run(jobs)?;
    info!(
        jobs = outcome.jobs.len(),
        failures = outcome.failures(),
        exit_code = outcome.exit_code,
        "bulk import finished"
    );
    Ok(outcome)
}

/// Exit code for an error that ended a run early.
#[must_use]
pub fn error_exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ImportError>()
        .map_or(1, ImportError::exit_code)
}
