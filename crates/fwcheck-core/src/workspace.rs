use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CheckError;
use crate::{TARGETS_MANIFEST, UNPACK_DIR};

/// How the input path is treated when acquiring a workspace.
///
/// The mode is an explicit caller decision; it is never inferred from
/// the shape of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceMode {
    /// The input is a firmware artifact to unpack into a fresh
    /// temporary directory.
    Fresh,
    /// The input is a workspace retained by an earlier run.
    PreUnpacked,
}

/// Directory tree holding unpacked artifact contents for one run.
///
/// The `owned` flag is fixed at acquisition and never changes: only a
/// workspace created by this run may ever be deleted. A reused
/// workspace survives the run regardless of the caller's retention
/// preference.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    owned: bool,
}

impl Workspace {
    pub fn acquire(input: &Path, mode: WorkspaceMode) -> Result<Self, CheckError> {
        match mode {
            WorkspaceMode::Fresh => {
                let tmp = std::env::temp_dir();
                let dir = tempfile::Builder::new()
                    .prefix("fwcheck-")
                    .tempdir()
                    .map_err(|e| CheckError::io("create temp dir", &tmp, e))?;
                let root = dir.keep();
                let unpack = root.join(UNPACK_DIR);
                fs::create_dir(&unpack).map_err(|e| CheckError::io("create dir", &unpack, e))?;
                Ok(Self { root, owned: true })
            }
            WorkspaceMode::PreUnpacked => {
                if !input.join(UNPACK_DIR).is_dir() {
                    return Err(CheckError::InvalidWorkspace {
                        path: input.to_path_buf(),
                        missing: "unpacked/",
                    });
                }
                if !input.join(TARGETS_MANIFEST).is_file() {
                    return Err(CheckError::InvalidWorkspace {
                        path: input.to_path_buf(),
                        missing: TARGETS_MANIFEST,
                    });
                }
                tracing::info!(
                    path = %input.display(),
                    "reusing unpacked workspace, retention forced"
                );
                Ok(Self {
                    root: input.to_path_buf(),
                    owned: false,
                })
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unpack_dir(&self) -> PathBuf {
        self.root.join(UNPACK_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(TARGETS_MANIFEST)
    }

    /// True when this run created the workspace and may delete it.
    pub fn owned(&self) -> bool {
        self.owned
    }

    pub fn reused(&self) -> bool {
        !self.owned
    }

    /// Delete the workspace root unless it is retained.
    ///
    /// Reused workspaces are never deleted. A failed deletion is
    /// propagated, not swallowed.
    pub fn release(self, retain: bool) -> Result<(), CheckError> {
        if self.owned && !retain {
            fs::remove_dir_all(&self.root)
                .map_err(|e| CheckError::io("remove dir", &self.root, e))?;
        }
        Ok(())
    }
}
