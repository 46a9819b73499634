use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::error::ExecError;

/// Runs external commands synchronously and reports success or failure.
///
/// Every operation spawns exactly one child, blocks until it terminates,
/// and never leaves a child behind on any return path.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    work_dir: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self { work_dir: None }
    }

    /// Set the working directory commands are launched from.
    pub fn with_work_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Hand the whole command line to the OS shell (`sh -c`, `cmd /C` on
    /// Windows) and wait for it.
    ///
    /// Returns `true` only if the shell could be launched and the command
    /// exited with status 0. No quoting or escaping is applied; `cmd` is
    /// passed through verbatim, so only trusted, fixed strings belong here.
    pub fn run_shell(&self, cmd: &str) -> bool {
        flatten("shell", self.try_run_shell(cmd))
    }

    /// Execute `command[0]` directly, no shell, with `command[1..]` as its
    /// arguments, and wait for it.
    ///
    /// `command[0]` must be an absolute path; no `PATH` lookup is performed.
    /// Returns `true` only if the child exited normally with status 0. An
    /// empty command returns `false` without spawning anything.
    pub fn run_direct<S: AsRef<OsStr>>(&self, command: &[S]) -> bool {
        flatten("direct", self.try_run_direct(command))
    }

    /// Like [`run_direct`](Self::run_direct), but the child's standard
    /// output is redirected into `output_path`.
    ///
    /// The file is created if absent and truncated if present, with mode
    /// 0644. If it cannot be opened the command is never executed. An empty
    /// path is rejected the same way an empty command is.
    pub fn run_direct_with_redirect<P, S>(&self, output_path: P, command: &[S]) -> bool
    where
        P: AsRef<Path>,
        S: AsRef<OsStr>,
    {
        flatten(
            "direct_redirect",
            self.try_run_direct_with_redirect(output_path, command),
        )
    }

    /// Fallible form of [`run_shell`](Self::run_shell); same success set,
    /// but the failure cause is surfaced as an [`ExecError`].
    pub fn try_run_shell(&self, cmd: &str) -> Result<(), ExecError> {
        debug!(cmd = %cmd, "dispatching shell command");

        let mut shell = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        };
        if let Some(dir) = &self.work_dir {
            shell.current_dir(dir);
        }

        self.spawn_and_wait(&mut shell)
    }

    /// Fallible form of [`run_direct`](Self::run_direct).
    pub fn try_run_direct<S: AsRef<OsStr>>(&self, command: &[S]) -> Result<(), ExecError> {
        let mut cmd = self.direct_command(command)?;
        self.spawn_and_wait(&mut cmd)
    }

    /// Fallible form of
    /// [`run_direct_with_redirect`](Self::run_direct_with_redirect).
    pub fn try_run_direct_with_redirect<P, S>(
        &self,
        output_path: P,
        command: &[S],
    ) -> Result<(), ExecError>
    where
        P: AsRef<Path>,
        S: AsRef<OsStr>,
    {
        let output_path = output_path.as_ref();
        if output_path.as_os_str().is_empty() {
            return Err(ExecError::MissingOutputPath);
        }

        let mut cmd = self.direct_command(command)?;

        debug!(output = %output_path.display(), "redirecting child stdout");
        let file = open_redirect(output_path).map_err(ExecError::Redirect)?;
        cmd.stdout(Stdio::from(file));

        // The runner's handle to the file is consumed by the spawn; only the
        // child holds it from here on.
        self.spawn_and_wait(&mut cmd)
    }

    /// Validate the argument vector and build the un-spawned command.
    ///
    /// `command[0]` must be absolute: the platform spawn primitive would
    /// consult `PATH` for a bare name, which this contract forbids, so bare
    /// names are refused before anything is created.
    fn direct_command<S: AsRef<OsStr>>(&self, command: &[S]) -> Result<Command, ExecError> {
        let (program, args) = command.split_first().ok_or(ExecError::EmptyCommand)?;
        let program = Path::new(program.as_ref());
        if !program.is_absolute() {
            return Err(ExecError::ProgramNotAbsolute(
                program.display().to_string(),
            ));
        }

        debug!(
            program = %program.display(),
            args = args.len(),
            "dispatching direct command"
        );

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }

    /// Spawn the child and block until it has fully terminated, then
    /// classify its exit status.
    fn spawn_and_wait(&self, cmd: &mut Command) -> Result<(), ExecError> {
        let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
        let status = child.wait().map_err(ExecError::Wait)?;
        classify(status)
    }
}

/// Collapse a fallible outcome to the boolean contract, logging the cause.
fn flatten(op: &str, result: Result<(), ExecError>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!(op = %op, error = %error, "command failed");
            false
        }
    }
}

/// Run a command line through the OS shell with a default runner.
///
/// See [`CommandRunner::run_shell`].
pub fn run_shell(cmd: &str) -> bool {
    CommandRunner::new().run_shell(cmd)
}

/// Execute a program directly with a default runner.
///
/// See [`CommandRunner::run_direct`].
pub fn run_direct<S: AsRef<OsStr>>(command: &[S]) -> bool {
    CommandRunner::new().run_direct(command)
}

/// Execute a program directly with stdout redirected to a file, using a
/// default runner.
///
/// See [`CommandRunner::run_direct_with_redirect`].
pub fn run_direct_with_redirect<P, S>(output_path: P, command: &[S]) -> bool
where
    P: AsRef<Path>,
    S: AsRef<OsStr>,
{
    CommandRunner::new().run_direct_with_redirect(output_path, command)
}

fn classify(status: ExitStatus) -> Result<(), ExecError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(ExecError::ExitCode(code)),
        // No exit code means the child did not terminate normally.
        None => Err(ExecError::Signaled(termination_signal(status))),
    }
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// Open the redirect target: create if absent, truncate if present, 0644.
fn open_redirect(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    opts.open(path)
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn direct_true_succeeds() {
        assert!(run_direct(&["/bin/true"]));
    }

    #[test]
    fn direct_false_fails() {
        assert!(!run_direct(&["/bin/false"]));
    }

    #[test]
    fn direct_empty_command_fails_without_spawning() {
        let empty: [&str; 0] = [];
        assert!(!run_direct(&empty));
        assert!(matches!(
            CommandRunner::new().try_run_direct(&empty),
            Err(ExecError::EmptyCommand)
        ));
    }

    #[test]
    fn direct_nonexistent_program_fails() {
        assert!(!run_direct(&["/nonexistent/binary"]));
        assert!(matches!(
            CommandRunner::new().try_run_direct(&["/nonexistent/binary"]),
            Err(ExecError::Spawn(_))
        ));
    }

    #[test]
    fn direct_bare_program_name_is_rejected() {
        assert!(matches!(
            CommandRunner::new().try_run_direct(&["true"]),
            Err(ExecError::ProgramNotAbsolute(_))
        ));
    }

    #[test]
    fn direct_nonzero_exit_reports_code() {
        let result = CommandRunner::new().try_run_direct(&["/bin/sh", "-c", "exit 7"]);
        assert!(matches!(result, Err(ExecError::ExitCode(7))));
    }

    #[test]
    fn direct_signal_death_is_not_success() {
        let result = CommandRunner::new().try_run_direct(&["/bin/sh", "-c", "kill -9 $$"]);
        assert!(matches!(result, Err(ExecError::Signaled(Some(9)))));
    }

    #[test]
    fn redirect_captures_child_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");

        assert!(run_direct_with_redirect(&out, &["/bin/echo", "hello"]));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    fn redirect_truncates_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "previous content that is much longer\n").unwrap();

        assert!(run_direct_with_redirect(&out, &["/bin/echo", "hi"]));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
    }

    #[test]
    fn redirect_open_failure_skips_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let bad_out = dir.path().join("no-such-dir").join("out.txt");
        let script = format!("echo ran > {}", marker.display());

        let result = CommandRunner::new()
            .try_run_direct_with_redirect(&bad_out, &["/bin/sh", "-c", &script]);

        assert!(matches!(result, Err(ExecError::Redirect(_))));
        assert!(!marker.exists(), "command ran despite redirect failure");
    }

    #[test]
    fn redirect_empty_path_is_rejected() {
        assert!(!run_direct_with_redirect("", &["/bin/true"]));
        assert!(matches!(
            CommandRunner::new().try_run_direct_with_redirect("", &["/bin/true"]),
            Err(ExecError::MissingOutputPath)
        ));
    }

    #[test]
    fn shell_exit_codes_map_to_outcome() {
        assert!(run_shell("exit 0"));
        assert!(!run_shell("exit 3"));
        assert!(matches!(
            CommandRunner::new().try_run_shell("exit 3"),
            Err(ExecError::ExitCode(3))
        ));
    }

    #[test]
    fn shell_runs_in_configured_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new().with_work_dir(dir.path());

        assert!(runner.run_shell("echo hi > marker.txt"));
        assert!(dir.path().join("marker.txt").exists());
    }

    #[test]
    fn repeated_invocations_agree() {
        for _ in 0..3 {
            assert!(run_direct(&["/bin/true"]));
            assert!(!run_direct(&["/bin/false"]));
            assert!(run_shell("exit 0"));
        }
    }

    #[test]
    fn boolean_and_fallible_results_agree() {
        let runner = CommandRunner::new();
        let commands: [&[&str]; 3] = [&["/bin/true"], &["/bin/false"], &["/nonexistent/binary"]];
        for command in commands {
            assert_eq!(
                runner.run_direct(command),
                runner.try_run_direct(command).is_ok()
            );
        }
    }
}
