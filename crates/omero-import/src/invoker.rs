//! Launching the Java importer as a child process.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::job::JobConfig;

/// Main class of the command-line importer.
pub const IMPORTER_CLASS: &str = "ome.formats.importer.cli.CommandLineImporter";
/// Main class of the importer test engine.
pub const TEST_ENGINE_CLASS: &str = "ome.formats.test.util.TestEngine";
/// Default JVM heap ceiling.
pub const DEFAULT_MAX_HEAP: &str = "1024M";

#[cfg(windows)]
const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const CLASSPATH_SEPARATOR: &str = ":";

/// Which Java entry point to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainClass {
    #[default]
    Importer,
    TestEngine,
}

impl MainClass {
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Importer => IMPORTER_CLASS,
            Self::TestEngine => TEST_ENGINE_CLASS,
        }
    }
}

/// Fixed launcher settings shared by every job of a run.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Java executable.
    pub java: String,
    /// Directory holding the client JARs.
    pub client_dir: PathBuf,
    /// Logback configuration passed to the JVM.
    pub logback: PathBuf,
    pub max_heap: String,
    pub main_class: MainClass,
}

impl LaunchSettings {
    /// Settings rooted at an installation directory.
    #[must_use]
    pub fn for_install(omero_dir: &Path) -> Self {
        Self {
            java: "java".to_string(),
            client_dir: omero_dir.join("lib").join("client"),
            logback: omero_dir.join("etc").join("logback-cli.xml"),
            max_heap: DEFAULT_MAX_HEAP.to_string(),
            main_class: MainClass::default(),
        }
    }
}

/// Collect the `.jar` files of `dir` as absolute paths, sorted by name.
pub fn build_classpath(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |source| ImportError::ClasspathUnreadable {
        dir: dir.to_path_buf(),
        source,
    };
    let mut jars = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        let is_jar = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
        if is_jar && path.is_file() {
            jars.push(std::path::absolute(&path).unwrap_or(path));
        }
    }
    if jars.is_empty() {
        return Err(ImportError::ClasspathEmpty {
            dir: dir.to_path_buf(),
        });
    }
    jars.sort();
    Ok(jars)
}

/// A fully built child-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

/// Builds importer invocations from resolved tokens.
#[derive(Debug, Clone)]
pub struct JavaLauncher {
    settings: LaunchSettings,
    classpath: Vec<PathBuf>,
}

impl JavaLauncher {
    /// Scan the client directory once; fails before any job runs.
    pub fn new(settings: LaunchSettings) -> Result<Self> {
        let classpath = build_classpath(&settings.client_dir)?;
        debug!(
            client_dir = %settings.client_dir.display(),
            jars = classpath.len(),
            "built classpath"
        );
        Ok(Self {
            settings,
            classpath,
        })
    }

    #[must_use]
    pub fn with_classpath(settings: LaunchSettings, classpath: Vec<PathBuf>) -> Self {
        Self {
            settings,
            classpath,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    /// JVM arguments placed before the main class.
    #[must_use]
    pub fn jvm_args(&self, depth: u32) -> Vec<String> {
        let classpath = self
            .classpath
            .iter()
            .map(|jar| jar.to_string_lossy())
            .collect::<Vec<_>>()
            .join(CLASSPATH_SEPARATOR);
        vec![
            format!(
                "-Dlogback.configurationFile={}",
                self.settings.logback.display()
            ),
            format!("-Xmx{}", self.settings.max_heap),
            "-cp".to_string(),
            classpath,
            format!("-Domero.import.depth={depth}"),
        ]
    }

    /// Assemble the invocation for one job.
    ///
    /// Relative redirect targets resolve against `working_dir`.
    #[must_use]
    pub fn invocation(
        &self,
        job: &JobConfig,
        tokens: Vec<String>,
        working_dir: Option<&Path>,
    ) -> Invocation {
        let mut args = self.jvm_args(job.depth);
        args.push(self.settings.main_class.class_name().to_string());
        args.extend(tokens);
        let anchor = |target: PathBuf| match working_dir {
            Some(dir) if target.is_relative() => dir.join(target),
            _ => target,
        };
        Invocation {
            program: self.settings.java.clone(),
            args,
            working_dir: working_dir.map(Path::to_path_buf),
            stdout: job.redirect.stdout_target().map(anchor),
            stderr: job.redirect.stderr_target().map(anchor),
        }
    }
}

/// Runs an invocation to completion and reports its exit code.
pub trait JobExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<i32>;
}

/// Executor that spawns a real child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl JobExecutor for ProcessExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<i32> {
        // The log handles move into the command and are closed when it drops,
        // whether or not the child ever starts.
        let stdout = open_log(invocation.stdout.as_deref())?;
        let stderr = open_log(invocation.stderr.as_deref())?;

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        if let Some(file) = stdout {
            command.stdout(Stdio::from(file));
        }
        if let Some(file) = stderr {
            command.stderr(Stdio::from(file));
        }

        info!(program = %invocation.program, "launching importer");
        let status = command.status().map_err(|source| ImportError::Launch {
            program: invocation.program.clone(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

/// Create the target's parent directory if needed and open it for writing.
pub fn open_log(target: Option<&Path>) -> Result<Option<File>> {
    let Some(path) = target else {
        return Ok(None);
    };
    let open_error = |source| ImportError::LogOpen {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(open_error)?;
    }
    File::create(path).map(Some).map_err(open_error)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Redirect;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> LaunchSettings {
        LaunchSettings {
            logback: PathBuf::from("/opt/omero/etc/logback-cli.xml"),
            ..LaunchSettings::for_install(dir)
        }
    }

    #[test]
    fn classpath_lists_only_jars() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("b.jar"), b"").expect("write");
        fs::write(dir.path().join("a.JAR"), b"").expect("write");
        fs::write(dir.path().join("readme.txt"), b"").expect("write");

        let jars = build_classpath(dir.path()).expect("classpath");
        let names: Vec<_> = jars
            .iter()
            .filter_map(|jar| jar.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(names, vec!["a.JAR", "b.jar"]);
        assert!(jars.iter().all(|jar| jar.is_absolute()));
    }

    #[test]
    fn empty_client_dir_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let err = build_classpath(dir.path()).expect_err("no jars");
        assert_eq!(err.exit_code(), 103);
    }

    #[test]
    fn missing_client_dir_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let err = build_classpath(&dir.path().join("absent")).expect_err("unreadable");
        assert_eq!(err.exit_code(), 102);
    }

    #[test]
    fn invocation_places_jvm_args_before_main_class() {
        let launcher = JavaLauncher::with_classpath(
            settings(Path::new("/opt/omero")),
            vec![PathBuf::from("/opt/omero/lib/client/a.jar")],
        );
        let mut job = JobConfig::new();
        job.depth = 2;
        let invocation = launcher.invocation(&job, vec!["/a.tif".to_string()], None);
        assert_eq!(invocation.program, "java");
        assert_eq!(
            invocation.args,
            vec![
                "-Dlogback.configurationFile=/opt/omero/etc/logback-cli.xml",
                "-Xmx1024M",
                "-cp",
                "/opt/omero/lib/client/a.jar",
                "-Domero.import.depth=2",
                IMPORTER_CLASS,
                "/a.tif",
            ]
        );
    }

    #[test]
    fn relative_redirects_anchor_to_working_dir() {
        let launcher = JavaLauncher::with_classpath(
            settings(Path::new("/opt/omero")),
            vec![PathBuf::from("a.jar")],
        );
        let mut job = JobConfig::new();
        job.redirect = Redirect {
            stdout: Some(PathBuf::from("out.yml")),
            stderr: Some(PathBuf::from("/var/log/err.log")),
            prefix: None,
        };
        let invocation = launcher.invocation(&job, Vec::new(), Some(Path::new("/bulk")));
        assert_eq!(invocation.stdout, Some(PathBuf::from("/bulk/out.yml")));
        assert_eq!(invocation.stderr, Some(PathBuf::from("/var/log/err.log")));
    }

    #[test]
    fn open_log_creates_missing_directories() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("logs").join("run1").join("out.log");
        let file = open_log(Some(&target)).expect("open");
        assert!(file.is_some());
        assert!(target.exists());
        assert!(open_log(None).expect("none").is_none());
    }
}
