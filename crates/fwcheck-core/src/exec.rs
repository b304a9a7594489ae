use std::ffi::OsString;
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::CheckError;

/// One external tool invocation, built as an argument vector.
///
/// No shell is involved anywhere: arguments pass through exactly as
/// given, so paths with spaces or metacharacters cannot alter the
/// command.
#[derive(Debug)]
pub struct ExecSpec {
    /// Short label used in errors and logs ("unpacker", "analyzer").
    pub tool: &'static str,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Redirect stdout into this file instead of inheriting it.
    pub capture_stdout: Option<PathBuf>,
    /// Deadline after which the child is killed.
    pub timeout: Option<Duration>,
}

/// Run the tool to completion and demand a zero exit status.
///
/// Launch failure, non-zero exit, and a blown deadline each map to a
/// distinct error carrying the tool label. stderr is inherited so tool
/// diagnostics stay visible to the operator.
pub fn run(spec: &ExecSpec) -> Result<(), CheckError> {
    let program = spec.program.display().to_string();

    let mut command = Command::new(&spec.program);
    command.args(&spec.args).stdin(Stdio::null());
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    if let Some(capture) = &spec.capture_stdout {
        let file = File::create(capture).map_err(|e| CheckError::io("create", capture, e))?;
        command.stdout(Stdio::from(file));
    }

    tracing::debug!(tool = spec.tool, program = %program, "spawning");
    let mut child = command.spawn().map_err(|source| CheckError::Launch {
        tool: spec.tool,
        program: program.clone(),
        source,
    })?;

    let status = match spec.timeout {
        None => child
            .wait()
            .map_err(|e| CheckError::io("wait", &spec.program, e))?,
        Some(timeout) => {
            let started = Instant::now();
            loop {
                match child
                    .try_wait()
                    .map_err(|e| CheckError::io("wait", &spec.program, e))?
                {
                    Some(status) => break status,
                    None if started.elapsed() > timeout => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CheckError::Timeout {
                            tool: spec.tool,
                            program,
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    None => std::thread::sleep(Duration::from_millis(50)),
                }
            }
        }
    };

    if !status.success() {
        return Err(CheckError::ToolFailed {
            tool: spec.tool,
            program,
            status,
        });
    }

    Ok(())
}
