use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::CheckError;
use crate::exec::{self, ExecSpec};
use crate::workspace::Workspace;

/// Unpacker manifest: target name -> image path relative to the
/// workspace root.
pub type TargetManifest = BTreeMap<String, String>;

/// Produce the target manifest for this run.
///
/// A reused workspace already holds `targets.json`; the unpacker is
/// not invoked again. A fresh workspace runs
/// `<unpacker> <artifact> <policy_dir>` with the unpack directory as
/// its working directory and stdout redirected into `targets.json`,
/// persisting the manifest verbatim as a side effect of the capture.
///
/// Subprocess failure, a missing manifest, or non-JSON output aborts
/// the run. No partial target set is ever used.
pub fn unpack(
    workspace: &Workspace,
    artifact: &Path,
    unpacker: Option<&Path>,
    policy_dir: &Path,
    timeout: Option<Duration>,
) -> Result<TargetManifest, CheckError> {
    let manifest_path = workspace.manifest_path();

    if workspace.reused() {
        tracing::info!(
            manifest = %manifest_path.display(),
            "reloading persisted target manifest"
        );
        return load_manifest(&manifest_path, &manifest_path.display().to_string());
    }

    let unpacker = unpacker.ok_or(CheckError::MissingUnpacker)?;
    exec::run(&ExecSpec {
        tool: "unpacker",
        program: unpacker.to_path_buf(),
        args: vec![
            artifact.as_os_str().to_owned(),
            policy_dir.as_os_str().to_owned(),
        ],
        cwd: Some(workspace.unpack_dir()),
        capture_stdout: Some(manifest_path.clone()),
        timeout,
    })?;

    load_manifest(&manifest_path, &unpacker.display().to_string())
}

fn load_manifest(path: &Path, origin: &str) -> Result<TargetManifest, CheckError> {
    let raw = fs::read_to_string(path).map_err(|e| CheckError::io("read", path, e))?;
    serde_json::from_str(&raw).map_err(|source| CheckError::BadManifest {
        origin: origin.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{Workspace, WorkspaceMode};
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn fresh_unpack_persists_manifest_verbatim() {
        let tools = TempDir::new().unwrap();
        let unpacker = write_script(
            tools.path(),
            "unpack.sh",
            "#!/bin/sh\nprintf '{\"system\": \"unpacked/system.img\"}'\n",
        );

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let manifest =
            unpack(&ws, Path::new("fw.bin"), Some(&unpacker), tools.path(), None).unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest["system"], "unpacked/system.img");
        assert_eq!(
            fs::read_to_string(ws.manifest_path()).unwrap(),
            "{\"system\": \"unpacked/system.img\"}"
        );

        ws.release(false).unwrap();
    }

    #[test]
    fn unpacker_receives_artifact_and_policy_dir() {
        let tools = TempDir::new().unwrap();
        let unpacker = write_script(
            tools.path(),
            "unpack.sh",
            "#!/bin/sh\nprintf '{\"args\": \"%s %s\"}' \"$1\" \"$2\"\n",
        );

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let manifest = unpack(
            &ws,
            Path::new("/firmware/fw.bin"),
            Some(&unpacker),
            Path::new("/policies"),
            None,
        )
        .unwrap();

        assert_eq!(manifest["args"], "/firmware/fw.bin /policies");
        ws.release(false).unwrap();
    }

    #[test]
    fn unpacker_runs_inside_unpack_dir() {
        let tools = TempDir::new().unwrap();
        // Drops a marker into its working directory.
        let unpacker = write_script(
            tools.path(),
            "unpack.sh",
            "#!/bin/sh\ntouch marker\nprintf '{}'\n",
        );

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        unpack(&ws, Path::new("fw.bin"), Some(&unpacker), tools.path(), None).unwrap();

        assert!(ws.unpack_dir().join("marker").is_file());
        ws.release(false).unwrap();
    }

    #[test]
    fn non_json_output_is_bad_manifest() {
        let tools = TempDir::new().unwrap();
        let unpacker = write_script(
            tools.path(),
            "unpack.sh",
            "#!/bin/sh\nprintf 'not json at all'\n",
        );

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let err =
            unpack(&ws, Path::new("fw.bin"), Some(&unpacker), tools.path(), None).unwrap_err();

        assert!(matches!(err, CheckError::BadManifest { .. }));
        assert!(err.to_string().contains("check the unpacker script"));
        ws.release(false).unwrap();
    }

    #[test]
    fn unpacker_failure_is_fatal() {
        let tools = TempDir::new().unwrap();
        let unpacker = write_script(tools.path(), "unpack.sh", "#!/bin/sh\nexit 3\n");

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let err =
            unpack(&ws, Path::new("fw.bin"), Some(&unpacker), tools.path(), None).unwrap_err();

        assert!(matches!(
            err,
            CheckError::ToolFailed {
                tool: "unpacker",
                ..
            }
        ));
        ws.release(false).unwrap();
    }

    #[test]
    fn missing_unpacker_command_is_rejected() {
        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let err = unpack(&ws, Path::new("fw.bin"), None, Path::new("/policies"), None).unwrap_err();

        assert!(matches!(err, CheckError::MissingUnpacker));
        ws.release(false).unwrap();
    }

    #[test]
    fn reused_workspace_skips_the_unpacker() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("unpacked")).unwrap();
        fs::write(
            dir.path().join("targets.json"),
            r#"{"vendor": "unpacked/vendor.img"}"#,
        )
        .unwrap();

        let ws = Workspace::acquire(dir.path(), WorkspaceMode::PreUnpacked).unwrap();
        // An unpacker that would clobber the manifest if it ran.
        let unpacker = write_script(
            dir.path(),
            "unpack.sh",
            "#!/bin/sh\nprintf '{\"clobbered\": \"x\"}'\n",
        );

        let manifest =
            unpack(&ws, dir.path(), Some(&unpacker), Path::new("/policies"), None).unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest["vendor"], "unpacked/vendor.img");
    }

    #[test]
    fn empty_manifest_is_a_valid_empty_target_set() {
        let tools = TempDir::new().unwrap();
        let unpacker = write_script(tools.path(), "unpack.sh", "#!/bin/sh\nprintf '{}'\n");

        let ws = Workspace::acquire(Path::new("fw.bin"), WorkspaceMode::Fresh).unwrap();
        let manifest =
            unpack(&ws, Path::new("fw.bin"), Some(&unpacker), tools.path(), None).unwrap();

        assert!(manifest.is_empty());
        ws.release(false).unwrap();
    }
}
