//! Subprocess adapters for the slicer and the sanity checker.
//!
//! Both tools are checked for execute permission when the adapter is built.
//! Standard output is logged at info, standard error at warn; a non-zero exit
//! carries the captured stderr.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tapemig_core::{CoreError, CoreResult, SanityChecker, Slicer};
use tokio::process::Command;
use tracing::{info, warn};

const SLICER: &str = "slicer";
const SANITY_CHECKER: &str = "sanity_checker";

/// Runs the external slicer as `<exe> <tape> <output_dir> <log_file>`.
#[derive(Debug, Clone)]
pub struct CommandSlicer {
    executable: PathBuf,
}

impl CommandSlicer {
    /// Build the adapter after checking that `executable` can be run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotExecutable`] when the path is missing, not a
    /// regular file or lacks execute permission.
    pub fn new(executable: impl Into<PathBuf>) -> CoreResult<Self> {
        let executable = executable.into();
        ensure_executable(SLICER, &executable)?;
        Ok(Self { executable })
    }

    /// Configured slicer binary.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl Slicer for CommandSlicer {
    async fn slice(
        &self,
        tape_location: &Path,
        output_directory: &Path,
        log_file: &Path,
    ) -> CoreResult<()> {
        create_dir(output_directory).await?;
        if let Some(parent) = log_file.parent() {
            create_dir(parent).await?;
        }

        let mut command = Command::new(&self.executable);
        command
            .arg(tape_location)
            .arg(output_directory)
            .arg(log_file)
            .current_dir(output_directory);
        run_tool(SLICER, &self.executable, command).await?;
        Ok(())
    }
}

/// Runs the external sanity checker as `<exe> <tape_name> <slicer_log> <slicer_output_dir>`.
///
/// The tool's captured output is written to the checker log.
#[derive(Debug, Clone)]
pub struct CommandSanityChecker {
    executable: PathBuf,
}

impl CommandSanityChecker {
    /// Build the adapter after checking that `executable` can be run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotExecutable`] when the path cannot be executed.
    pub fn new(executable: impl Into<PathBuf>) -> CoreResult<Self> {
        let executable = executable.into();
        ensure_executable(SANITY_CHECKER, &executable)?;
        Ok(Self { executable })
    }

    /// Configured sanity-checker binary.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl SanityChecker for CommandSanityChecker {
    async fn check(
        &self,
        tape_name: &str,
        slicer_log: &Path,
        slicer_output_directory: &Path,
        checker_log: &Path,
    ) -> CoreResult<()> {
        if let Some(parent) = checker_log.parent() {
            create_dir(parent).await?;
        }
        let slicer_log_present = tokio::fs::metadata(slicer_log)
            .await
            .is_ok_and(|meta| meta.is_file());
        if !slicer_log_present {
            return Err(CoreError::Precondition {
                reason: "slicer_log_missing",
                path: slicer_log.to_path_buf(),
            });
        }

        let mut command = Command::new(&self.executable);
        command
            .arg(tape_name)
            .arg(slicer_log)
            .arg(slicer_output_directory)
            .current_dir(slicer_output_directory);
        let output = run_tool(SANITY_CHECKER, &self.executable, command).await;

        let captured = match &output {
            Ok(output) => [output.stdout.as_slice(), output.stderr.as_slice()].concat(),
            Err(CoreError::ToolFailed { stderr, .. }) => stderr.clone().into_bytes(),
            Err(_) => Vec::new(),
        };
        if let Err(err) = tokio::fs::write(checker_log, captured).await {
            warn!(
                path = %checker_log.display(),
                error = %err,
                "failed to write sanity checker log"
            );
        }
        output.map(|_| ())
    }
}

fn ensure_executable(tool: &'static str, executable: &Path) -> CoreResult<()> {
    let not_executable = || CoreError::NotExecutable {
        tool,
        executable: executable.to_path_buf(),
    };
    let metadata = std::fs::metadata(executable).map_err(|_| not_executable())?;
    if !metadata.is_file() {
        return Err(not_executable());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(not_executable());
        }
    }
    Ok(())
}

async fn create_dir(path: &Path) -> CoreResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| CoreError::io("tool.create_dir", path, source))
}

/// Run `command` to completion, logging its output.
pub(crate) async fn run_tool(
    tool: &'static str,
    executable: &Path,
    mut command: Command,
) -> CoreResult<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    info!(tool, command = ?command.as_std(), "executing external tool");

    let output = command
        .output()
        .await
        .map_err(|source| CoreError::ToolSpawn {
            tool,
            executable: executable.to_path_buf(),
            source,
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        info!(tool, output = line, "tool stdout");
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    for line in stderr.lines() {
        warn!(tool, output = line, "tool stderr");
    }

    if output.status.success() {
        info!(tool, "external tool finished");
        Ok(output)
    } else {
        Err(CoreError::ToolFailed {
            tool,
            exit_code: output.status.code(),
            stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tapemig_test_support::fixtures::{temp_dir, touch, write_script};

    #[test]
    fn missing_or_plain_files_are_not_executable() -> anyhow::Result<()> {
        let dir = temp_dir()?;
        let plain = dir.path().join("plain");
        touch(&plain)?;

        for path in [dir.path().join("absent"), plain, dir.path().to_path_buf()] {
            let err = CommandSlicer::new(&path).expect_err("must be rejected");
            assert!(matches!(
                err,
                CoreError::NotExecutable { tool: SLICER, executable } if executable == path
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn slicer_receives_positional_arguments() -> anyhow::Result<()> {
        let dir = temp_dir()?;
        let script = write_script(
            dir.path(),
            "slicer.sh",
            "printf '%s\\n' \"$1\" \"$2\" \"$3\" > \"$3\"\ntouch \"$2/AAG.L1.FAAA\"\n",
        )?;
        let slicer = CommandSlicer::new(&script)?;
        let output = dir.path().join("work/slicer");
        let log = dir.path().join("work/log/slicer.log");

        slicer.slice(Path::new("/in/T1"), &output, &log).await?;

        let logged = std::fs::read_to_string(&log)?;
        let expected = format!("/in/T1\n{}\n{}\n", output.display(), log.display());
        assert_eq!(logged, expected);
        assert!(output.join("AAG.L1.FAAA").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() -> anyhow::Result<()> {
        let dir = temp_dir()?;
        let script = write_script(dir.path(), "slicer.sh", "echo 'bad tape' >&2\nexit 3\n")?;
        let slicer = CommandSlicer::new(&script)?;

        let err = slicer
            .slice(
                Path::new("/in/T1"),
                &dir.path().join("out"),
                &dir.path().join("log/slicer.log"),
            )
            .await
            .expect_err("tool fails");
        match err {
            CoreError::ToolFailed {
                tool,
                exit_code,
                stderr,
            } => {
                assert_eq!(tool, SLICER);
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "bad tape");
            }
            other => panic!("unexpected error {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn sanity_checker_requires_slicer_log() -> anyhow::Result<()> {
        let dir = temp_dir()?;
        let script = write_script(dir.path(), "check.sh", "exit 0\n")?;
        let checker = CommandSanityChecker::new(&script)?;
        let checker_log = dir.path().join("log/sanity_checker.log");

        let err = checker
            .check(
                "T1",
                &dir.path().join("log/slicer.log"),
                dir.path(),
                &checker_log,
            )
            .await
            .expect_err("slicer log missing");
        assert!(matches!(
            err,
            CoreError::Precondition {
                reason: "slicer_log_missing",
                ..
            }
        ));
        assert!(checker_log.parent().is_some_and(Path::is_dir));
        Ok(())
    }

    #[tokio::test]
    async fn sanity_checker_writes_its_log() -> anyhow::Result<()> {
        let dir = temp_dir()?;
        let script = write_script(dir.path(), "check.sh", "echo \"checked $1\"\n")?;
        let checker = CommandSanityChecker::new(&script)?;
        let slicer_log = dir.path().join("log/slicer.log");
        touch(&slicer_log)?;
        let checker_log = dir.path().join("log/sanity_checker.log");

        checker
            .check("T1", &slicer_log, dir.path(), &checker_log)
            .await?;
        assert_eq!(std::fs::read_to_string(&checker_log)?, "checked T1\n");
        Ok(())
    }
}
