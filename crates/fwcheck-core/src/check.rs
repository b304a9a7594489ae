use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::analyzer;
use crate::error::CheckError;
use crate::report::{self, Report};
use crate::targets::{self, MissingPolicyMode, Resolution};
use crate::unpack;
use crate::verdict;
use crate::workspace::{Workspace, WorkspaceMode};

/// Everything one verification run needs to know.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Firmware artifact, or the workspace root in pre-unpacked mode.
    pub artifact: PathBuf,
    /// Directory holding one `<target>.toml` policy per target.
    pub policy_dir: PathBuf,
    /// Shared policy include directory passed to every analyzer run.
    pub include_dir: Option<PathBuf>,
    /// Unpacker command, invoked as `<unpacker> <artifact> <policy_dir>`.
    /// Not needed when reusing a pre-unpacked workspace.
    pub unpacker: Option<PathBuf>,
    /// External static analyzer binary.
    pub analyzer_bin: PathBuf,
    /// Pass-through options appended to every analyzer invocation.
    pub analyzer_options: Vec<String>,
    /// Check exactly these targets instead of the manifest keys.
    pub declared_targets: Option<Vec<String>>,
    pub missing_policy: MissingPolicyMode,
    pub workspace_mode: WorkspaceMode,
    /// Retain the workspace after a successful run.
    pub keep_unpacked: bool,
    /// Deadline applied to each external tool invocation.
    pub tool_timeout: Option<Duration>,
}

/// Terminal state of an orchestration that did not error.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Skip mode found a target without a policy file; nothing ran.
    Skipped { target: String, policy: PathBuf },
    /// Every target was analyzed; the report carries pass/fail.
    Completed(Report),
}

/// Run the full check sequence: acquire workspace, unpack, resolve
/// targets, analyze each target, aggregate, release.
///
/// Any error returns early and leaves the workspace un-deleted for
/// debugging. Cleanup runs only on the non-error paths and honors the
/// caller's retention preference; reused workspaces are never deleted.
pub fn run_check(config: &CheckConfig) -> Result<CheckOutcome, CheckError> {
    let workspace = Workspace::acquire(&config.artifact, config.workspace_mode)?;
    tracing::info!(root = %workspace.root().display(), "workspace ready");

    let manifest = unpack::unpack(
        &workspace,
        &config.artifact,
        config.unpacker.as_deref(),
        &config.policy_dir,
        config.tool_timeout,
    )?;

    let resolution = targets::resolve(
        &manifest,
        config.declared_targets.as_deref(),
        workspace.root(),
        &config.policy_dir,
        config.missing_policy,
    )?;
    let resolved = match resolution {
        Resolution::Skipped { target, policy } => {
            tracing::warn!(
                name = %target,
                policy = %policy.display(),
                "policy file missing, nothing to check"
            );
            workspace.release(config.keep_unpacked)?;
            return Ok(CheckOutcome::Skipped { target, policy });
        }
        Resolution::Ready(resolved) => resolved,
    };

    let mut verdicts = BTreeMap::new();
    for target in &resolved {
        let out_path = workspace.root().join(format!("{}_out.json", target.name));
        tracing::info!(
            name = %target.name,
            image = %target.image.display(),
            "analyzing target"
        );
        analyzer::run(
            &config.analyzer_bin,
            &target.image,
            &target.policy,
            config.include_dir.as_deref(),
            &out_path,
            &config.analyzer_options,
            config.tool_timeout,
        )?;
        let verdict = verdict::interpret(&out_path)?;
        if !verdict.passed {
            tracing::warn!(name = %target.name, "analyzer reported offenders");
        }
        verdicts.insert(target.name.clone(), verdict);
    }

    let report = report::aggregate(&config.artifact, verdicts)?;

    if config.keep_unpacked || workspace.reused() {
        tracing::info!(root = %workspace.root().display(), "unpacked data retained");
    }
    workspace.release(config.keep_unpacked)?;

    Ok(CheckOutcome::Completed(report))
}
