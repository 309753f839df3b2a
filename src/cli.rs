use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::logging::DEFAULT_LOG_FILE;

#[derive(Parser)]
#[command(name = "qc-automation")]
#[command(about = "Fabric inspection report ledger entry, email drafting and filing", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log file (overwritten on every run)
    #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

/// Main menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    FullProcess,
    DataEntry,
    EmailDrafts,
    OrganizeFiles,
    Exit,
}

impl std::str::FromStr for MenuChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuChoice::FullProcess),
            "2" => Ok(MenuChoice::DataEntry),
            "3" => Ok(MenuChoice::EmailDrafts),
            "4" => Ok(MenuChoice::OrganizeFiles),
            "0" => Ok(MenuChoice::Exit),
            _ => Err("Invalid input. Please enter a number between 0 and 4.".to_string()),
        }
    }
}

/// Source folder for a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderChoice {
    Pending,
    Ongoing,
}

impl std::str::FromStr for FolderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(FolderChoice::Pending),
            "2" => Ok(FolderChoice::Ongoing),
            _ => Err("Invalid choice. Please enter 1 or 2.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!("1".parse::<MenuChoice>(), Ok(MenuChoice::FullProcess));
        assert_eq!(" 4 ".parse::<MenuChoice>(), Ok(MenuChoice::OrganizeFiles));
        assert_eq!("0".parse::<MenuChoice>(), Ok(MenuChoice::Exit));
        assert!("5".parse::<MenuChoice>().is_err());
        assert!("".parse::<MenuChoice>().is_err());
    }

    #[test]
    fn test_folder_choice_parse() {
        assert_eq!("1".parse::<FolderChoice>(), Ok(FolderChoice::Pending));
        assert_eq!("2".parse::<FolderChoice>(), Ok(FolderChoice::Ongoing));
        assert!("3".parse::<FolderChoice>().is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["qc-automation"]);
        assert_eq!(cli.config, PathBuf::from("master.json"));
        assert_eq!(cli.log_file, PathBuf::from("automation_log.txt"));
    }
}
