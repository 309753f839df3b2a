use crate::error::{QcError, Result};
use qc_automation_common::{CellRef, PassReportTriggers};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "master.json";

/// Organisation fields every report must map.
const REQUIRED_FIELDS: &[&str] = &["buyer", "supplier", "consignment", "result", "rolls"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub mappings_data_entry: DataEntryMappings,
    pub cell_map_organization: CellMap,
    pub email_settings: EmailSettings,
    #[serde(default)]
    pub email_filter_rules: EmailFilterRules,
    #[serde(skip)]
    raw: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub main_workbook: PathBuf,
    pub main_workbook_backup: PathBuf,
    pub pending_reports: PathBuf,
    pub ongoing_work: PathBuf,
    pub manual_review: PathBuf,
    #[serde(default)]
    pub error_reports: Option<PathBuf>,
    #[serde(default)]
    pub email_drafts: Option<PathBuf>,
}

impl PathsConfig {
    /// `paths.error_reports`, or "Error Reports" next to the pending folder.
    pub fn error_reports_dir(&self) -> PathBuf {
        match &self.error_reports {
            Some(dir) => dir.clone(),
            None => self
                .pending_reports
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("Error Reports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataEntryMappings {
    /// Summary sheet cell -> ledger column
    pub summary_mapping: BTreeMap<String, String>,
    /// Defect row label -> ledger column
    pub defect_mapping: BTreeMap<String, String>,
    pub target_table_name: String,
    pub target_sheet_name: String,
    pub summary_sheet_name: String,
    pub unmatched_defect_column: String,
    pub serial_column: String,
    pub invoice_column: String,
    pub min_start_row: u32,
}

impl Default for DataEntryMappings {
    fn default() -> Self {
        Self {
            summary_mapping: BTreeMap::new(),
            defect_mapping: BTreeMap::new(),
            target_table_name: "Table13".into(),
            target_sheet_name: "Data Analysis report".into(),
            summary_sheet_name: "Summary".into(),
            unmatched_defect_column: "AK".into(),
            serial_column: "C".into(),
            invoice_column: "F".into(),
            min_start_row: 181,
        }
    }
}

/// `cell_map_organization`: sheet name plus field -> cell address.
#[derive(Debug, Clone, Deserialize)]
pub struct CellMap {
    pub sheet_name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl CellMap {
    pub fn address(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub primary_recipient: String,
    pub secondary_recipient: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

fn default_sender_name() -> String {
    "QED Department".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailFilterRules {
    pub pass_report_triggers: PassReportTriggers,
}

impl Config {
    /// Loads `path`; when it is the default file name and missing from the
    /// working directory, the per-user config directory is tried as well.
    pub fn load(path: &Path) -> Result<Self> {
        let resolved = Self::resolve_path(path);
        let content = match std::fs::read_to_string(&resolved) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QcError::ConfigNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        let mut config: Config =
            serde_json::from_value(raw.clone()).map_err(|e| QcError::Config(e.to_string()))?;
        config.raw = raw;
        config.validate()?;
        Ok(config)
    }

    fn resolve_path(path: &Path) -> PathBuf {
        if path.exists() || path != Path::new(DEFAULT_CONFIG_FILE) {
            return path.to_path_buf();
        }
        dirs::config_dir()
            .map(|dir| dir.join("qc-automation").join(DEFAULT_CONFIG_FILE))
            .filter(|p| p.exists())
            .unwrap_or_else(|| path.to_path_buf())
    }

    fn validate(&self) -> Result<()> {
        let map = &self.cell_map_organization;
        if map.sheet_name.trim().is_empty() {
            return Err(QcError::Config(
                "cell_map_organization.sheet_name is empty".into(),
            ));
        }
        for field in REQUIRED_FIELDS {
            if map.address(field).is_none() {
                return Err(QcError::Config(format!(
                    "missing key cell_map_organization.{}",
                    field
                )));
            }
        }
        for (field, addr) in &map.fields {
            CellRef::parse(addr).map_err(|_| {
                QcError::Config(format!(
                    "cell_map_organization.{} has invalid address '{}'",
                    field, addr
                ))
            })?;
        }
        for source in self.mappings_data_entry.summary_mapping.keys() {
            CellRef::parse(source).map_err(|_| {
                QcError::Config(format!(
                    "mappings_data_entry.summary_mapping has invalid address '{}'",
                    source
                ))
            })?;
        }
        Ok(())
    }

    pub fn triggers(&self) -> &PassReportTriggers {
        &self.email_filter_rules.pass_report_triggers
    }

    /// Dotted-path lookup into the raw document
    /// (`"email_settings.primary_recipient"`).
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.raw, |value, part| value.as_object()?.get(part))
    }
}

#[cfg(test)]
const SAMPLE_CONFIG: &str = r#"{
    "paths": {
        "main_workbook": "ledger/Main.xlsx",
        "main_workbook_backup": "ledger/backup",
        "pending_reports": "work/Pending Reports",
        "ongoing_work": "work/Ongoing Work",
        "manual_review": "work/Manual Review"
    },
    "mappings_data_entry": {
        "summary_mapping": { "C4": "F", "C5": "G" },
        "defect_mapping": { "Slub": "X", "Hole": "Y" },
        "target_table_name": "Table13"
    },
    "cell_map_organization": {
        "sheet_name": "Summary",
        "buyer": "C2",
        "supplier": "C3",
        "consignment": "C4",
        "result": "C5",
        "rolls": "C6"
    },
    "email_settings": {
        "primary_recipient": "qa-lead@example.com",
        "secondary_recipient": "qa-team@example.com"
    },
    "email_filter_rules": {
        "pass_report_triggers": { "avg_point_threshold": 12 }
    }
}"#;
