//! Interactive menu driving the three tasks

use crate::cli::{FolderChoice, MenuChoice};
use crate::config::Config;
use crate::error::{QcError, Result};
use crate::ledger::LedgerWriter;
use crate::mail::Emailer;
use crate::organizer::FileOrganizer;
use crate::scanner::find_reports;
use dialoguer::Input;
use std::path::{Path, PathBuf};
use tracing::error;

const RULE_WIDTH: usize = 60;

/// Totals of a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub initial_files: usize,
    pub rows_entered: usize,
    pub drafts_created: usize,
    pub reviewed: usize,
    pub organized: usize,
}

impl ActionSummary {
    pub fn render(&self) -> String {
        let title = " ACTION SUMMARY ";
        let side = "-".repeat(25);
        [
            format!("{}{}{}", side, title, side),
            format!("  - Initial Files Found: {}", self.initial_files),
            format!("  - Rows Entered: {}", self.rows_entered),
            format!("  - Email Drafts Created: {}", self.drafts_created),
            format!("  - Files Copied to Review: {}", self.reviewed),
            format!("  - Files Organized: {}", self.organized),
            "-".repeat(side.len() * 2 + title.len()),
        ]
        .join("\n")
    }
}

fn prompt(text: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(text)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| QcError::Prompt(e.to_string()))
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Report files of a folder; a missing or empty folder logs an error.
fn reports_in(folder: &Path) -> Option<Vec<PathBuf>> {
    match find_reports(folder) {
        Ok(files) if !files.is_empty() => Some(files),
        Ok(_) => {
            error!("No Excel files found in the '{}' folder.", folder_name(folder));
            None
        }
        Err(e) => {
            error!("{}", e);
            None
        }
    }
}

pub struct AutomationSystem<'a> {
    config: &'a Config,
}

impl<'a> AutomationSystem<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn display_menu(&self) {
        println!("\n{}", "=".repeat(RULE_WIDTH));
        println!("    Quality Automation System");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("Which task would you like to perform? Please enter a number:");
        println!("  1. Run Full Process (Data Entry -> Email -> Organize)");
        println!("  2. Only Data Entry");
        println!("  3. Only Create Email Drafts");
        println!("  4. Only Organize Files");
        println!("  0. Exit Program");
        println!("{}", "=".repeat(RULE_WIDTH));
    }

    fn files_for_task(&self, task_name: &str) -> Result<Option<Vec<PathBuf>>> {
        println!("\nFor the '{}' task, which folder do you want to use?", task_name);
        println!("  1. Pending Reports");
        println!("  2. Ongoing Work");

        let folder = match prompt("Your choice (1 or 2)")?.parse::<FolderChoice>() {
            Ok(FolderChoice::Pending) => &self.config.paths.pending_reports,
            Ok(FolderChoice::Ongoing) => &self.config.paths.ongoing_work,
            Err(message) => {
                println!("{}", message);
                return Ok(None);
            }
        };
        Ok(reports_in(folder))
    }

    /// Entry, email and filing over the pending folder.
    pub fn run_full_process(&self) -> Option<ActionSummary> {
        let pending = &self.config.paths.pending_reports;
        let files = match find_reports(pending) {
            Ok(files) if !files.is_empty() => files,
            _ => {
                error!(
                    "Cannot run the full process because the '{}' folder is empty.",
                    folder_name(pending)
                );
                return None;
            }
        };

        let rows_entered = LedgerWriter::new(self.config).run(&files);
        let (drafts_created, reviewed) = Emailer::new(self.config).run(&files);
        let organized = FileOrganizer::new(self.config).run(&files);

        Some(ActionSummary {
            initial_files: files.len(),
            rows_entered,
            drafts_created,
            reviewed,
            organized,
        })
    }

    /// Menu loop; returns when the user picks 0.
    pub fn run(&self) -> Result<()> {
        loop {
            self.display_menu();
            let choice = match prompt("Your choice")?.parse::<MenuChoice>() {
                Ok(choice) => choice,
                Err(message) => {
                    println!("{}", message);
                    self.pause()?;
                    continue;
                }
            };

            match choice {
                MenuChoice::FullProcess => {
                    if let Some(summary) = self.run_full_process() {
                        println!("\n{}", summary.render());
                    }
                }
                MenuChoice::DataEntry => {
                    if let Some(files) = self.files_for_task("Data Entry")? {
                        let rows = LedgerWriter::new(self.config).run(&files);
                        println!("\nSUMMARY: {} row(s) were entered into the main workbook.", rows);
                    }
                }
                MenuChoice::EmailDrafts => {
                    if let Some(files) = self.files_for_task("Email Drafts")? {
                        let (drafts, reviewed) = Emailer::new(self.config).run(&files);
                        println!("\nSUMMARY: {} email draft(s) were created.", drafts);
                        println!("         {} file(s) were copied to the Manual Review folder.", reviewed);
                    }
                }
                MenuChoice::OrganizeFiles => {
                    if let Some(files) = self.files_for_task("File Organization")? {
                        let organized = FileOrganizer::new(self.config).run(&files);
                        println!("\nSUMMARY: {} file(s) were organized.", organized);
                    }
                }
                MenuChoice::Exit => {
                    println!("Exiting program. Goodbye!");
                    return Ok(());
                }
            }
            self.pause()?;
        }
    }

    fn pause(&self) -> Result<()> {
        prompt("\nPress Enter to return to the main menu...").map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_render() {
        let summary = ActionSummary {
            initial_files: 5,
            rows_entered: 4,
            drafts_created: 2,
            reviewed: 1,
            organized: 5,
        };
        let text = summary.render();
        assert!(text.starts_with("------------------------- ACTION SUMMARY -------------------------"));
        assert!(text.contains("  - Rows Entered: 4"));
        assert!(text.contains("  - Files Copied to Review: 1"));
        assert!(text.lines().last().unwrap().chars().all(|c| c == '-'));
    }
}
