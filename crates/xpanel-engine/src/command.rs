//! Bounded child process execution.

use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::trace;

use crate::error::EngineError;

/// Run `program` to completion, killing it after `timeout`.
///
/// A non-zero exit is returned as `Ok`; callers decide what it means.
pub(crate) async fn run<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    timeout: Duration,
) -> Result<Output, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let name = program.to_string_lossy().into_owned();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    trace!(program = %name, "spawning");

    let child = cmd.spawn().map_err(|source| EngineError::Spawn {
        program: name.clone(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(EngineError::Spawn {
            program: name,
            source,
        }),
        Err(_) => Err(EngineError::Timeout {
            program: name,
            timeout,
        }),
    }
}

/// Turn a non-zero exit into [`EngineError::Exit`].
pub(crate) fn check_success(program: &str, output: &Output) -> Result<(), EngineError> {
    if output.status.success() {
        return Ok(());
    }
    Err(EngineError::Exit {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
