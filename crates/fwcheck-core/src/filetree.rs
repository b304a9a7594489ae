use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::CheckError;

#[derive(Debug, Deserialize)]
struct FileTree {
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    name: String,
}

/// Derive file-extension statistics from a file-tree snapshot.
///
/// Output shape:
/// - `total_files`: number of files in the snapshot
/// - `file_extension_stats_inclusion_if_more_than`: the inclusion
///   threshold, one percent of the file count
/// - `file_extension_stats`: `[count, extension]` pairs for every
///   extension held by more than 1% of files, nameless extensions
///   excluded, sorted by descending count
///
/// The statistics are informational only and never influence a
/// verdict.
pub fn analyze(path: &Path) -> Result<Value, CheckError> {
    let raw = fs::read_to_string(path).map_err(|e| CheckError::io("read", path, e))?;
    let tree: FileTree = serde_json::from_str(&raw).map_err(|source| CheckError::BadVerdict {
        path: path.to_path_buf(),
        source,
    })?;

    let total = tree.files.len();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for file in &tree.files {
        *counts.entry(extension(&file.name).to_string()).or_default() += 1;
    }

    let threshold = total as f64 / 100.0;
    let mut stats: Vec<(u64, String)> = counts
        .into_iter()
        .filter(|(ext, count)| !ext.is_empty() && *count as f64 > threshold)
        .map(|(ext, count)| (count, ext))
        .collect();
    stats.sort_by(|a, b| b.cmp(a));

    Ok(json!({
        "total_files": total,
        "file_extension_stats_inclusion_if_more_than": threshold,
        "file_extension_stats": stats,
    }))
}

/// Extension of the final path component, leading dot included.
///
/// Dotfiles carry no extension: `.bashrc` yields `""`, while
/// `lib/a.tar.gz` yields `".gz"`.
fn extension(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    match base.rfind('.') {
        Some(idx) if idx > stem_start => &base[idx..],
        _ => "",
    }
}
