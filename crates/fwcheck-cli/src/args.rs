use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "fwcheck",
    version,
    about = "Firmware filesystem policy verification for release pipelines"
)]
pub struct Args {
    /// Path to the firmware artifact, or to a retained workspace when
    /// --pre-unpacked is set
    pub firmware: PathBuf,

    /// Directory containing one <target>.toml policy file per target
    #[arg(long)]
    pub policy_dir: PathBuf,

    /// Directory with shared policy include files
    #[arg(long)]
    pub include_dir: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Keep the unpack workspace after the run
    #[arg(long)]
    pub keep_unpacked: bool,

    /// Treat the input as a workspace retained by an earlier run
    #[arg(long)]
    pub pre_unpacked: bool,

    /// Check exactly these targets instead of the unpacker manifest
    #[arg(long, num_args = 1..)]
    pub targets: Option<Vec<String>>,

    /// Path to the static analyzer binary
    #[arg(long, default_value = "fwanalyzer")]
    pub analyzer_bin: PathBuf,

    /// Unpacker command, invoked as <unpacker> <firmware> <policy-dir>
    #[arg(long)]
    pub unpacker: Option<PathBuf>,

    /// Extra options passed through to the analyzer
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub analyzer_options: String,

    /// Reaction to a target without a policy file. Defaults to skip
    /// for declared --targets and fail for discovered target sets
    #[arg(long, value_enum)]
    pub missing_policy: Option<MissingPolicy>,

    /// Per-invocation timeout in seconds for external tools
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MissingPolicy {
    Skip,
    Fail,
}
