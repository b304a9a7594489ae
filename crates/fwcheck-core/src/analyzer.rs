use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use crate::error::CheckError;
use crate::exec::{self, ExecSpec};

/// Build the analyzer argument vector.
///
/// Flag layout follows the analyzer contract:
/// `-in <image> [-cfgpath <include>] -cfg <policy> -out <out> <extra...>`
pub fn analyzer_args(
    image: &Path,
    policy: &Path,
    include: Option<&Path>,
    out: &Path,
    extra: &[String],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-in".into(), image.as_os_str().to_owned()];
    if let Some(include) = include {
        args.push("-cfgpath".into());
        args.push(include.as_os_str().to_owned());
    }
    args.push("-cfg".into());
    args.push(policy.as_os_str().to_owned());
    args.push("-out".into());
    args.push(out.as_os_str().to_owned());
    args.extend(extra.iter().map(OsString::from));
    args
}

/// Run the external static analyzer once for a single target.
///
/// A non-zero exit means the analyzer itself could not complete and is
/// fatal to the whole run. Policy violations are reported through the
/// output file, not the exit status, and are handled by the verdict
/// interpreter.
pub fn run(
    bin: &Path,
    image: &Path,
    policy: &Path,
    include: Option<&Path>,
    out: &Path,
    extra: &[String],
    timeout: Option<Duration>,
) -> Result<(), CheckError> {
    exec::run(&ExecSpec {
        tool: "analyzer",
        program: bin.to_path_buf(),
        args: analyzer_args(image, policy, include, out, extra),
        cwd: None,
        capture_stdout: None,
        timeout,
    })
}
