use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::PublishError;

/// Every regular file matching `pattern`, sorted. An empty match is an error.
pub fn resolve_glob(pattern: &str) -> Result<Vec<PathBuf>, PublishError> {
    let paths = glob::glob(pattern)
        .map_err(|e| PublishError::InvalidInput(format!("bad pattern '{}': {}", pattern, e)))?;
    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(PublishError::ArtifactNotFound(pattern.to_string()));
    }
    debug!("{} matched {} file(s)", pattern, files.len());
    Ok(files)
}

pub fn resolve_first(pattern: &str) -> Result<PathBuf, PublishError> {
    let mut files = resolve_glob(pattern)?;
    Ok(files.swap_remove(0))
}

/// Resolves each pattern in turn, keeping the first occurrence of a path.
pub fn resolve_all(patterns: &[String]) -> Result<Vec<PathBuf>, PublishError> {
    let mut out: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        for file in resolve_glob(pattern)? {
            if !out.contains(&file) {
                out.push(file);
            }
        }
    }
    Ok(out)
}

pub fn read_changelog(path: &Path) -> Result<String, PublishError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| PublishError::Changelog {
            path: path.to_path_buf(),
            source,
        })
}

/// Looks for an expansion file for an APK. Any `.obb` in the directory
/// above the APK's wins; otherwise `main.<versionCode>.<package>.obb`
/// next to the APK.
pub fn find_obb(apk: &Path, package_name: &str, version_code: i64) -> Option<PathBuf> {
    let dir = apk.parent()?;
    if let Some(parent) = dir.parent()
        && let Ok(entries) = fs::read_dir(parent)
    {
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_extension(p, &["obb"]))
            .collect();
        candidates.sort();
        if let Some(obb) = candidates.into_iter().next() {
            return Some(obb);
        }
    }
    let named = dir.join(format!("main.{}.{}.obb", version_code, package_name));
    named.is_file().then_some(named)
}

pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}
