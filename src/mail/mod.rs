//! Email drafting and manual-review copies
//!
//! Reports routed to REVIEW are copied into the review folder; SEND reports
//! become one draft per (buyer, supplier) group.

pub mod eml;

pub use eml::EmlDraftFolder;

use crate::config::{Config, EmailSettings};
use crate::error::Result;
use crate::report::{read_all, Report, ReportReader};
use qc_automation_common::email::{group_in_order, has_fail_report};
use qc_automation_common::{compose_html_body, compose_subject, DraftLine, Route};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<PathBuf>,
}

/// Somewhere drafts can be saved without being sent.
pub trait MailClient {
    /// Returns where the draft was stored.
    fn save_draft(&mut self, draft: &Draft) -> Result<PathBuf>;
}

/// One draft per (buyer, supplier) group, groups in encounter order.
pub fn build_drafts(reports: &[&Report], settings: &EmailSettings) -> Vec<Draft> {
    let groups = group_in_order(reports.iter().copied(), |r| {
        (r.field("buyer"), r.field("supplier"))
    });

    groups
        .into_iter()
        .map(|((buyer, supplier), members)| {
            let lines: Vec<DraftLine> = members.iter().map(|r| r.draft_line()).collect();
            let to = if has_fail_report(&lines) {
                settings.primary_recipient.clone()
            } else {
                settings.secondary_recipient.clone()
            };
            Draft {
                to,
                subject: compose_subject(&buyer, &lines),
                html_body: compose_html_body(&buyer, &supplier, &lines, &settings.sender_name),
                attachments: members.iter().map(|r| r.path.clone()).collect(),
            }
        })
        .collect()
}

/// Task 2: email drafts.
pub struct Emailer<'a> {
    config: &'a Config,
}

impl<'a> Emailer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Runs against the configured drafts folder. Returns (drafts created,
    /// files copied to review).
    pub fn run(&self, files: &[PathBuf]) -> (usize, usize) {
        let drafts_dir = self.config.paths.email_drafts.clone();
        self.run_with(files, move || {
            let folder = EmlDraftFolder::new(drafts_dir.as_deref())?;
            Ok(Box::new(folder) as Box<dyn MailClient>)
        })
    }

    /// Like [`run`](Self::run); `connect` is only called when there is
    /// something to send.
    pub fn run_with<F>(&self, files: &[PathBuf], connect: F) -> (usize, usize)
    where
        F: FnOnce() -> Result<Box<dyn MailClient>>,
    {
        info!("{}", "=".repeat(50));
        info!("TASK 2: Starting Email Automation...");
        info!("{}", "=".repeat(50));

        if files.is_empty() {
            warn!("No files found to email.");
            return (0, 0);
        }

        let reader = ReportReader::new(self.config);
        let reports = read_all(&reader, files);
        info!(
            "Found a total of {} reports. Starting advanced filtering...",
            reports.len()
        );

        let triggers = self.config.triggers();
        let mut to_send = Vec::new();
        let mut to_review = Vec::new();
        for report in &reports {
            let decision = report.classify(triggers);
            match decision.route {
                Route::Send => {
                    info!("   - '{}' will be sent. Reason: {}.", report.file_name(), decision.reason);
                    to_send.push(report);
                }
                Route::Review => {
                    info!(
                        "   - '{}' goes to manual review. Reason: {}.",
                        report.file_name(),
                        decision.reason
                    );
                    to_review.push(report);
                }
            }
        }

        let reviewed = copy_for_review(&to_review, &self.config.paths.manual_review);
        if reviewed > 0 {
            info!("{} report(s) were COPIED to Manual Review.", reviewed);
        }

        if to_send.is_empty() {
            info!("Filtering complete. No critical reports found to be sent via email.");
            return (0, reviewed);
        }

        let drafts = build_drafts(&to_send, &self.config.email_settings);
        info!("Filtering complete. {} email drafts will be created.", drafts.len());

        let mut client = match connect() {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to save email drafts: {}", e);
                error!("Please set paths.email_drafts to a writable folder.");
                return (0, reviewed);
            }
        };

        let mut created = 0;
        for draft in &drafts {
            match client.save_draft(draft) {
                Ok(location) => {
                    created += 1;
                    info!(
                        "Successfully saved email draft for '{}' with {} attachment(s) at '{}'.",
                        draft.to,
                        draft.attachments.len(),
                        location.display()
                    );
                }
                Err(e) => {
                    error!("Failed to save email draft: {}", e);
                    break;
                }
            }
        }
        (created, reviewed)
    }
}

/// Copies each report into `review_dir`, returning how many were copied.
fn copy_for_review(reports: &[&Report], review_dir: &Path) -> usize {
    if reports.is_empty() {
        return 0;
    }
    if let Err(e) = std::fs::create_dir_all(review_dir) {
        error!("Could not create review folder '{}': {}", review_dir.display(), e);
        return 0;
    }

    let mut copied = 0;
    for report in reports {
        let target = review_dir.join(report.file_name());
        match std::fs::copy(&report.path, &target) {
            Ok(_) => copied += 1,
            Err(e) => error!("Failed to COPY '{}' to review folder: {}", report.file_name(), e),
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_automation_common::{CellValue, SortKey};
    use std::collections::BTreeMap;

    fn report(path: &str, fields: &[(&str, &str)]) -> Report {
        Report {
            path: PathBuf::from(path),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
                .collect::<BTreeMap<_, _>>(),
            figures: Ok(Default::default()),
            entry: Ok(BTreeMap::new()),
            sort_key: SortKey::new("", 0, "", 0),
        }
    }

    fn settings() -> EmailSettings {
        EmailSettings {
            primary_recipient: "primary@example.com".into(),
            secondary_recipient: "secondary@example.com".into(),
            sender_name: "QED Department".into(),
        }
    }

    #[test]
    fn test_build_drafts_groups_and_recipients() {
        let a = report("a.xlsx", &[("buyer", "Acme"), ("supplier", "Mill"), ("result", "Pass"), ("consignment", "9")]);
        let b = report("b.xlsx", &[("buyer", "Zen"), ("supplier", "Mill"), ("result", "Pass"), ("consignment", "3")]);
        let c = report("c.xlsx", &[("buyer", "Acme"), ("supplier", "Mill"), ("result", "Rejected"), ("consignment", "12")]);

        let drafts = build_drafts(&[&a, &b, &c], &settings());
        assert_eq!(drafts.len(), 2);

        assert_eq!(drafts[0].to, "primary@example.com");
        assert_eq!(
            drafts[0].subject,
            "Acme # 12, 9 Rolls consignment Fabric Inspection Status"
        );
        assert_eq!(
            drafts[0].attachments,
            vec![PathBuf::from("a.xlsx"), PathBuf::from("c.xlsx")]
        );

        assert_eq!(drafts[1].to, "secondary@example.com");
        assert_eq!(drafts[1].attachments, vec![PathBuf::from("b.xlsx")]);
    }
}
