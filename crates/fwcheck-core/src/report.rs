use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value, json};

use crate::digest;
use crate::error::CheckError;
use crate::verdict::Verdict;

/// Aggregate of all per-target verdicts plus artifact metadata.
///
/// This is the stable JSON contract consumed by release tooling.
/// Immutable once constructed; the rendering is deterministic for
/// identical inputs.
#[derive(Debug)]
pub struct Report {
    /// The artifact path exactly as given by the caller.
    pub firmware: String,
    /// Hex SHA-256 of the artifact; absent for directory inputs.
    pub firmware_digest: Option<String>,
    /// AND over all verdicts. An empty target set passes.
    pub passed: bool,
    pub verdicts: BTreeMap<String, Verdict>,
}

/// Combine per-target verdicts into one report.
///
/// The digest is computed only when the artifact is a regular file; a
/// pre-unpacked directory has no meaningful digest and the field is
/// omitted.
pub fn aggregate(
    artifact: &Path,
    verdicts: BTreeMap<String, Verdict>,
) -> Result<Report, CheckError> {
    let mut passed = true;
    for verdict in verdicts.values() {
        if !verdict.passed {
            passed = false;
        }
    }

    let firmware_digest = if artifact.is_file() {
        Some(digest::sha256_hex(artifact)?)
    } else {
        None
    };

    Ok(Report {
        firmware: artifact.display().to_string(),
        firmware_digest,
        passed,
        verdicts,
    })
}

impl Report {
    /// Assemble the report object: one key per target holding its full
    /// verdict payload, plus `firmware`, `firmware_digest` and
    /// `status`. Key order is sorted by construction.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, verdict) in &self.verdicts {
            map.insert(name.clone(), verdict.payload.clone());
        }
        map.insert("firmware".to_string(), json!(self.firmware));
        if let Some(digest) = &self.firmware_digest {
            map.insert("firmware_digest".to_string(), json!(digest));
        }
        map.insert("status".to_string(), json!(self.passed));
        Value::Object(map)
    }

    /// Pretty-printed JSON rendering, byte-identical across runs for
    /// identical inputs.
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json())
    }
}
