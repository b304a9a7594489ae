pub mod analyzer;
pub mod check;
pub mod digest;
pub mod error;
pub mod exec;
pub mod filetree;
pub mod report;
pub mod targets;
pub mod unpack;
pub mod verdict;
pub mod workspace;

pub use check::{CheckConfig, CheckOutcome, run_check};
pub use error::CheckError;

pub const TOOL_NAME: &str = "fwcheck";

/// Persisted unpacker manifest, written at the workspace root so a
/// retained workspace can be re-checked without unpacking again.
pub const TARGETS_MANIFEST: &str = "targets.json";

/// Subdirectory of the workspace root that holds unpacked content.
pub const UNPACK_DIR: &str = "unpacked";
