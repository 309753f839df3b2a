//! Filing of reports into `<buyer>/CON-<consignment> (<date>)` folders
//!
//! Reports that cannot be read or lack buyer, supplier or consignment are
//! moved into the error folder instead.

use crate::config::Config;
use crate::error::Result;
use crate::report::ReportReader;
use qc_automation_common::Destination;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Moves `from` to `to`, copying and deleting when a rename is not possible
/// (e.g. across file systems).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)?;
    Ok(())
}

/// Removes empty folders beneath `root`, deepest first. `root` itself stays.
pub fn cleanup_empty_dirs(root: &Path) {
    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    for dir in dirs {
        // Fails while the folder still has entries
        if std::fs::remove_dir(&dir).is_ok() {
            info!("   -> Cleaned up empty folder: {}", dir.display());
        }
    }
}

/// Task 3: file organisation.
pub struct FileOrganizer<'a> {
    config: &'a Config,
}

impl<'a> FileOrganizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn output_dir(&self) -> &Path {
        &self.config.paths.ongoing_work
    }

    pub fn run(&self, files: &[PathBuf]) -> usize {
        info!("{}", "=".repeat(50));
        info!("TASK 3: Starting File Organization...");
        info!("{}", "=".repeat(50));

        let error_dir = self.config.paths.error_reports_dir();
        for dir in [error_dir.as_path(), self.output_dir()] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!("Could not create folder '{}': {}", dir.display(), e);
            }
        }

        if files.is_empty() {
            warn!("No files to organize.");
            return 0;
        }

        let reader = ReportReader::new(self.config);
        let mut organized = 0;
        for file in files {
            if !file.exists() {
                continue;
            }
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            info!("[*] Organizing file: {}", name);

            match self.organize(&reader, file) {
                Ok(target) => {
                    let shown = self
                        .output_dir()
                        .parent()
                        .and_then(|p| target.strip_prefix(p).ok())
                        .unwrap_or(&target);
                    info!("   [OK] Successfully MOVED to '{}'.", shown.display());
                    organized += 1;
                }
                Err(e) => {
                    error!("   [X] Error organizing '{}': {}", name, e);
                    if let Err(move_error) = move_file(file, &error_dir.join(&name)) {
                        error!("Could not even move to Error folder: {}", move_error);
                    }
                }
            }
        }

        info!("Cleaning up empty source folders...");
        cleanup_empty_dirs(&self.config.paths.pending_reports);
        info!("File organization completed.");
        organized
    }

    fn organize(&self, reader: &ReportReader<'_>, file: &Path) -> Result<PathBuf> {
        let report = reader.read(file)?;
        let extension = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let destination = Destination::plan(&report.filing_fields(), &extension)?;

        let folder = self.output_dir().join(destination.folder());
        std::fs::create_dir_all(&folder)?;
        let target = folder.join(&destination.file_name);
        move_file(file, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_move_file() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.xlsx");
        let to = dir.path().join("b.xlsx");
        std::fs::write(&from, b"x").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"x");
    }

    #[test]
    fn test_cleanup_keeps_root_and_non_empty_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("pending");
        std::fs::create_dir_all(root.join("a/b/c")).unwrap();
        std::fs::create_dir_all(root.join("keep")).unwrap();
        std::fs::write(root.join("keep/report.xlsx"), b"x").unwrap();

        cleanup_empty_dirs(&root);

        assert!(root.exists());
        assert!(!root.join("a").exists());
        assert!(root.join("keep/report.xlsx").exists());
    }
}
