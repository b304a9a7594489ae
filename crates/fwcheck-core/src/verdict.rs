use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CheckError;
use crate::filetree;

/// Key whose presence in analyzer output marks a failed target.
pub const OFFENDERS_KEY: &str = "offenders";

/// Key under which the analyzer may reference a file-tree snapshot.
const FILE_TREE_KEY: &str = "current_file_tree_path";

/// Key for the derived statistics attached to an enriched payload.
const FILE_TREE_ANALYSIS_KEY: &str = "file_tree_analysis";

/// Interpreted result of analyzing one target. Produced exactly once
/// per target per run and read-only thereafter.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// False iff the analyzer reported offenders.
    pub passed: bool,
    /// Full analyzer payload, possibly enriched with
    /// `file_tree_analysis`. Keys serialize in sorted order.
    pub payload: Value,
}

/// Load and classify one analyzer verdict file.
///
/// Output that cannot be parsed is an analyzer-contract violation and
/// aborts the run; it is not a policy failure. When the payload
/// references a file-tree snapshot that exists on disk, derived
/// extension statistics are attached — informational only, they never
/// affect `passed`.
pub fn interpret(out_path: &Path) -> Result<Verdict, CheckError> {
    let raw = fs::read_to_string(out_path).map_err(|e| CheckError::io("read", out_path, e))?;
    let mut payload: Value = serde_json::from_str(&raw).map_err(|source| CheckError::BadVerdict {
        path: out_path.to_path_buf(),
        source,
    })?;

    let passed = !payload
        .as_object()
        .is_some_and(|map| map.contains_key(OFFENDERS_KEY));

    let snapshot = payload
        .get(FILE_TREE_KEY)
        .and_then(Value::as_str)
        .map(PathBuf::from);
    if let Some(snapshot) = snapshot {
        if snapshot.is_file() {
            let stats = filetree::analyze(&snapshot)?;
            if let Some(map) = payload.as_object_mut() {
                map.insert(FILE_TREE_ANALYSIS_KEY.to_string(), stats);
            }
        }
    }

    Ok(Verdict { passed, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn verdict_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn clean_output_passes() {
        let file = verdict_file(r#"{"data": {"version": "1.0"}}"#);
        let verdict = interpret(file.path()).unwrap();

        assert!(verdict.passed);
        assert_eq!(verdict.payload["data"]["version"], "1.0");
    }

    #[test]
    fn offenders_key_fails_the_target() {
        let file = verdict_file(r#"{"offenders": {"/bin/sh": ["suid bit set"]}}"#);
        let verdict = interpret(file.path()).unwrap();

        assert!(!verdict.passed);
        assert!(verdict.payload.get(OFFENDERS_KEY).is_some());
    }

    #[test]
    fn empty_offenders_section_still_fails() {
        // Presence of the key is the signal, not its contents.
        let file = verdict_file(r#"{"offenders": {}}"#);
        assert!(!interpret(file.path()).unwrap().passed);
    }

    #[test]
    fn malformed_output_is_fatal() {
        let file = verdict_file("offenders: yes");
        let err = interpret(file.path()).unwrap_err();

        assert!(matches!(err, CheckError::BadVerdict { .. }));
    }

    #[test]
    fn missing_output_file_is_fatal() {
        let err = interpret(Path::new("/nonexistent/system_out.json")).unwrap_err();
        assert!(matches!(err, CheckError::Io { .. }));
    }

    #[test]
    fn non_object_payload_passes_without_enrichment() {
        let file = verdict_file("[1, 2, 3]");
        let verdict = interpret(file.path()).unwrap();

        assert!(verdict.passed);
        assert_eq!(verdict.payload, json!([1, 2, 3]));
    }

    #[test]
    fn file_tree_reference_attaches_statistics() {
        let snapshot = verdict_file(
            &json!({
                "files": [
                    { "name": "a.so" },
                    { "name": "b.so" },
                    { "name": "init" }
                ]
            })
            .to_string(),
        );
        let file = verdict_file(
            &json!({ "current_file_tree_path": snapshot.path() }).to_string(),
        );

        let verdict = interpret(file.path()).unwrap();

        assert!(verdict.passed);
        let analysis = &verdict.payload["file_tree_analysis"];
        assert_eq!(analysis["total_files"], 3);
        assert_eq!(
            analysis["file_extension_stats"],
            json!([[2, ".so"]])
        );
    }

    #[test]
    fn dangling_file_tree_reference_is_ignored() {
        let file = verdict_file(
            r#"{"current_file_tree_path": "/nonexistent/tree.json"}"#,
        );
        let verdict = interpret(file.path()).unwrap();

        assert!(verdict.passed);
        assert!(verdict.payload.get("file_tree_analysis").is_none());
    }

    #[test]
    fn enrichment_does_not_change_a_failing_verdict() {
        let snapshot = verdict_file(r#"{"files": [{"name": "a.so"}]}"#);
        let file = verdict_file(
            &json!({
                "offenders": { "/etc/shadow": ["world readable"] },
                "current_file_tree_path": snapshot.path()
            })
            .to_string(),
        );

        let verdict = interpret(file.path()).unwrap();

        assert!(!verdict.passed);
        assert!(verdict.payload.get("file_tree_analysis").is_some());
    }
}
