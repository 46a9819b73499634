use thiserror::Error;

/// Why a command failed to come back successful.
///
/// The boolean API collapses every variant into `false`; this enum is the
/// diagnostic view exposed by the `try_` methods.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("missing output path")]
    MissingOutputPath,

    #[error("program path is not absolute: {0}")]
    ProgramNotAbsolute(String),

    #[error("failed to open redirect target: {0}")]
    Redirect(#[source] std::io::Error),

    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to wait for child: {0}")]
    Wait(#[source] std::io::Error),

    #[error("child terminated by signal {0:?}")]
    Signaled(Option<i32>),

    #[error("child exited with code {0}")]
    ExitCode(i32),
}

pub type Result<T> = std::result::Result<T, ExecError>;
