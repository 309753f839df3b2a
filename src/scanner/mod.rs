use crate::error::{QcError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const REPORT_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

fn is_report_file(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with("~$"))
        .unwrap_or(false);
    if is_lock_file {
        return false;
    }

    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            REPORT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Finds `.xlsx` / `.xlsm` reports under `folder`, recursively, sorted by path.
pub fn find_reports(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(QcError::FolderNotFound(folder.display().to_string()));
    }

    let mut reports: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_report_file(p))
        .collect();

    reports.sort();
    Ok(reports)
}
