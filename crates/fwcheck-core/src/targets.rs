use std::path::{Path, PathBuf};

use crate::UNPACK_DIR;
use crate::error::CheckError;
use crate::unpack::TargetManifest;

/// Reaction to a target whose policy file does not exist.
///
/// Both behaviors exist in release pipelines: a declared target list
/// treats a missing policy as "nothing to check here", while a target
/// set discovered from an unpacker manifest treats it as a
/// configuration error. The choice is explicit per invocation, never
/// implied by the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicyMode {
    /// End the run cleanly without a report.
    Skip,
    /// Abort the run before any analyzer is invoked.
    Fail,
}

/// A target ready for analysis: all paths resolved and the policy file
/// known to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub name: String,
    pub image: PathBuf,
    pub policy: PathBuf,
}

/// Outcome of target resolution.
#[derive(Debug)]
pub enum Resolution {
    Ready(Vec<ResolvedTarget>),
    /// Skip mode hit a missing policy; the run ends without a report.
    Skipped { target: String, policy: PathBuf },
}

/// Map each target to an image and a policy path, then verify every
/// policy file exists before any expensive work begins.
///
/// Target names come from `declared` when given, otherwise from the
/// manifest keys. A declared target absent from the manifest falls
/// back to the conventional image path `unpacked/<name>.img`. Policy
/// paths are always `<policy_dir>/<name>.toml`.
pub fn resolve(
    manifest: &TargetManifest,
    declared: Option<&[String]>,
    workspace_root: &Path,
    policy_dir: &Path,
    missing_policy: MissingPolicyMode,
) -> Result<Resolution, CheckError> {
    let names: Vec<String> = match declared {
        Some(list) => list.to_vec(),
        None => manifest.keys().cloned().collect(),
    };

    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        let image = match manifest.get(&name) {
            Some(rel) => workspace_root.join(rel),
            None => workspace_root.join(UNPACK_DIR).join(format!("{name}.img")),
        };
        let policy = policy_dir.join(format!("{name}.toml"));
        resolved.push(ResolvedTarget {
            name,
            image,
            policy,
        });
    }

    // The whole set is validated up front so a missing policy aborts
    // before the first analyzer invocation, not mid-run.
    for target in &resolved {
        if !target.policy.is_file() {
            return match missing_policy {
                MissingPolicyMode::Skip => Ok(Resolution::Skipped {
                    target: target.name.clone(),
                    policy: target.policy.clone(),
                }),
                MissingPolicyMode::Fail => Err(CheckError::MissingPolicy {
                    target: target.name.clone(),
                    policy: target.policy.clone(),
                }),
            };
        }
        tracing::info!(
            name = %target.name,
            policy = %target.policy.display(),
            "using policy file"
        );
    }

    Ok(Resolution::Ready(resolved))
}
