//! Synchronous "run this command and tell me if it worked" primitive.
//!
//! Three operations, all blocking, all spawning exactly one child and
//! reaping it before returning:
//!
//! - [`run_shell`] hands a full command line to the OS shell;
//! - [`run_direct`] executes an absolute program path with an argument
//!   vector, bypassing any shell;
//! - [`run_direct_with_redirect`] does the same with the child's stdout
//!   written to a file.
//!
//! Each returns a plain `bool`: every failure cause, from bad input through
//! spawn errors to a non-zero exit, collapses to `false`. Callers that need
//! diagnostics use the `try_` methods on [`CommandRunner`], which surface
//! the cause as an [`ExecError`] without changing which inputs succeed.
//!
//! ```no_run
//! use runlet::{run_direct, run_direct_with_redirect};
//!
//! assert!(run_direct(&["/bin/true"]));
//! assert!(run_direct_with_redirect("/tmp/out.txt", &["/bin/echo", "hello"]));
//! ```

pub mod error;
pub mod runner;

pub use error::{ExecError, Result};
pub use runner::{run_direct, run_direct_with_redirect, run_shell, CommandRunner};
