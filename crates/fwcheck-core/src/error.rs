use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

/// Fatal failure taxonomy for a verification run.
///
/// A target whose analyzer output contains offenders is *not* an
/// error: it becomes a failed verdict and the run continues. Every
/// variant here aborts the run before a report can be produced.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A target has no policy file on disk (fail-fast mode).
    #[error("missing policy file '{}' for target '{target}'", policy.display())]
    MissingPolicy { target: String, policy: PathBuf },

    /// A directory passed as pre-unpacked does not hold a usable
    /// workspace.
    #[error("'{}' is not an unpacked workspace: missing {missing}", path.display())]
    InvalidWorkspace { path: PathBuf, missing: &'static str },

    /// A fresh artifact was given but no unpacker command.
    #[error("an unpacker command is required to unpack a fresh artifact")]
    MissingUnpacker,

    /// An external tool could not be started at all.
    #[error("failed to launch {tool} '{program}': {source}")]
    Launch {
        tool: &'static str,
        program: String,
        source: std::io::Error,
    },

    /// An external tool ran but exited non-zero.
    #[error("{tool} '{program}' failed: {status}")]
    ToolFailed {
        tool: &'static str,
        program: String,
        status: ExitStatus,
    },

    /// An external tool exceeded its deadline and was killed.
    #[error("{tool} '{program}' timed out after {timeout_secs}s")]
    Timeout {
        tool: &'static str,
        program: String,
        timeout_secs: u64,
    },

    /// The target manifest is not a JSON object of name -> image path.
    #[error("can't load targets from '{origin}', check the unpacker script: {source}")]
    BadManifest {
        origin: String,
        source: serde_json::Error,
    },

    /// The analyzer produced output that violates its contract.
    #[error("malformed analyzer output '{}': {source}", path.display())]
    BadVerdict {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("{op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CheckError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
