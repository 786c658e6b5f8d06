//! Translation of a job into importer command-line tokens.

use crate::error::{ImportError, Result};
use crate::job::{FlagShape, FlagValue, JAVA_FLAGS, JobConfig, SkipStep};

/// Connection parameters handed to the importer when login is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    /// Session key of an already established login.
    pub session: String,
}

/// Flags emitted for the selected skip steps, in importer order.
#[must_use]
pub fn skip_arguments(job: &JobConfig) -> Vec<&'static str> {
    let all = job.skip.contains(&SkipStep::All);
    let wants = |step| all || job.skip.contains(&step);
    let mut args = Vec::new();
    if wants(SkipStep::Checksum) {
        args.push("--checksum-algorithm=File-Size-64");
    }
    if wants(SkipStep::Thumbnails) {
        args.push("--no-thumbnails");
    }
    if wants(SkipStep::Minmax) {
        args.push("--no-stats-info");
    }
    if wants(SkipStep::Upgrade) {
        args.push("--no-upgrade-check");
    }
    args
}

/// Resolve a job into the importer's argument tokens.
///
/// Order: `-h`, login, skip flags, table flags, pass-through tokens, paths.
/// Pure with respect to `job`; resolving twice yields the same tokens.
pub fn resolve(job: &JobConfig, connection: Option<&Connection>) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    if job.java_help {
        tokens.push("-h".to_string());
    }

    if job.login_required() {
        let connection = connection.ok_or(ImportError::MissingConnection)?;
        tokens.extend([
            "-s".to_string(),
            connection.host.clone(),
            "-p".to_string(),
            connection.port.to_string(),
            "-k".to_string(),
            connection.session.clone(),
        ]);
    }

    tokens.extend(skip_arguments(job).into_iter().map(str::to_string));

    for entry in JAVA_FLAGS {
        let Some(value) = job.flag(entry.field) else {
            continue;
        };
        if !value.is_set() {
            continue;
        }
        match (entry.shape, value) {
            (FlagShape::Joined, FlagValue::Text(text)) => {
                tokens.push(format!("{}={text}", entry.flag));
            }
            (FlagShape::Joined, FlagValue::Toggle(on)) => {
                tokens.push(format!("{}={on}", entry.flag));
            }
            (FlagShape::Separate, FlagValue::Text(text)) => {
                tokens.push(entry.flag.to_string());
                tokens.push(text.clone());
            }
            (FlagShape::Separate, FlagValue::Toggle(_)) => {
                tokens.push(entry.flag.to_string());
            }
        }
    }

    tokens.extend(job.passthrough.iter().cloned());
    tokens.extend(job.paths.iter().cloned());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn connection() -> Connection {
        Connection {
            host: "omero.example.org".to_string(),
            port: 4064,
            session: "abc-123".to_string(),
        }
    }

    #[test]
    fn login_flags_come_first() {
        let mut job = JobConfig::new();
        job.paths = vec!["/data/a.tif".to_string()];
        let tokens = resolve(&job, Some(&connection())).expect("resolve");
        assert_eq!(
            tokens,
            vec![
                "-s",
                "omero.example.org",
                "-p",
                "4064",
                "-k",
                "abc-123",
                "/data/a.tif"
            ]
        );
    }

    #[test]
    fn used_files_listing_needs_no_login() {
        let mut job = JobConfig::new();
        job.set_flag("f", FlagValue::Toggle(true));
        job.paths = vec!["a.tif".to_string()];
        let tokens = resolve(&job, None).expect("resolve");
        assert_eq!(tokens, vec!["-f", "a.tif"]);
    }

    #[test]
    fn java_help_suppresses_login() {
        let mut job = JobConfig::new();
        job.java_help = true;
        assert_eq!(resolve(&job, None).expect("resolve"), vec!["-h"]);
    }

    #[test]
    fn missing_connection_is_an_error() {
        let err = resolve(&JobConfig::new(), None).expect_err("needs login");
        assert!(matches!(err, ImportError::MissingConnection));
    }

    #[test]
    fn skip_all_expands_to_every_step() {
        let mut job = JobConfig::new();
        job.skip.insert(SkipStep::All);
        assert_eq!(
            skip_arguments(&job),
            vec![
                "--checksum-algorithm=File-Size-64",
                "--no-thumbnails",
                "--no-stats-info",
                "--no-upgrade-check"
            ]
        );
    }

    #[test]
    fn flag_shapes() {
        let mut job = JobConfig::new();
        job.set_flag("f", FlagValue::Toggle(true));
        job.set_flag("d", FlagValue::Text("51".to_string()));
        job.set_flag("name", FlagValue::Text("ImgA".to_string()));
        job.set_flag("report", FlagValue::Toggle(true));
        job.set_flag("upload", FlagValue::Toggle(false));
        job.set_flag("ns", FlagValue::Text("openmicroscopy.org/x".to_string()));
        let tokens = resolve(&job, None).expect("resolve");
        assert_eq!(
            tokens,
            vec![
                "-f",
                "-d",
                "51",
                "--name=ImgA",
                "--report",
                "--annotation-ns",
                "openmicroscopy.org/x"
            ]
        );
    }

    #[test]
    fn section_order_is_login_skip_flags_passthrough_paths() {
        let mut job = JobConfig::new();
        job.paths = vec!["/a.tif".to_string()];
        job.passthrough = vec!["--debug=ALL".to_string()];
        job.skip.insert(SkipStep::Upgrade);
        job.set_flag("c", FlagValue::Toggle(true));
        let tokens = resolve(&job, Some(&connection())).expect("resolve");
        assert_eq!(
            &tokens[6..],
            &["--no-upgrade-check", "-c", "--debug=ALL", "/a.tif"]
        );
    }

    proptest! {
        #[test]
        fn resolving_is_idempotent(
            name in "[A-Za-z0-9 _-]{0,12}",
            dataset in proptest::option::of(1u32..10_000),
            cont in any::<bool>(),
            listing in any::<bool>(),
            paths in proptest::collection::vec("[a-z/]{1,10}", 0..4),
        ) {
            let mut job = JobConfig::new();
            job.set_flag("name", FlagValue::Text(name));
            if let Some(id) = dataset {
                job.set_flag("d", FlagValue::Text(id.to_string()));
            }
            job.set_flag("c", FlagValue::Toggle(cont));
            job.set_flag("f", FlagValue::Toggle(listing));
            job.paths = paths;

            let first = resolve(&job, Some(&connection())).expect("first");
            let second = resolve(&job, Some(&connection())).expect("second");
            prop_assert_eq!(first, second);
        }
    }
}
