//! Drafts saved as `.eml` files
//!
//! Each draft is a `multipart/mixed` message marked `X-Unsent: 1`, which mail
//! clients open as an editable draft rather than a received message.

use super::{Draft, MailClient};
use crate::error::{QcError, Result};
use base64::Engine;
use chrono::Local;
use qc_automation_common::sanitize_component;
use std::path::{Path, PathBuf};

const LINE_WIDTH: usize = 76;
/// Byte limit for a draft file stem; leaves room for ` (n).eml` under the
/// usual 255-byte file name limit.
const MAX_STEM_BYTES: usize = 150;
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLSM_MIME: &str = "application/vnd.ms-excel.sheet.macroEnabled.12";

pub struct EmlDraftFolder {
    dir: PathBuf,
    sequence: u32,
}

impl EmlDraftFolder {
    /// Opens the drafts folder, creating it when needed.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        let dir = dir.ok_or_else(|| {
            QcError::MailClientUnavailable("paths.email_drafts is not configured".into())
        })?;
        std::fs::create_dir_all(dir).map_err(|e| {
            QcError::MailClientUnavailable(format!("cannot open '{}': {}", dir.display(), e))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            sequence: 0,
        })
    }

    fn unique_path(&self, subject: &str) -> PathBuf {
        let mut stem = truncate_stem(&sanitize_component(subject));
        if stem.is_empty() {
            stem = "draft".into();
        }
        let mut path = self.dir.join(format!("{}.eml", stem));
        let mut n = 2;
        while path.exists() {
            path = self.dir.join(format!("{} ({}).eml", stem, n));
            n += 1;
        }
        path
    }
}

impl MailClient for EmlDraftFolder {
    fn save_draft(&mut self, draft: &Draft) -> Result<PathBuf> {
        self.sequence += 1;
        let boundary = format!(
            "----=_QcPart_{}_{:04}",
            Local::now().format("%Y%m%d%H%M%S"),
            self.sequence
        );
        let message = render(draft, &boundary)?;
        let path = self.unique_path(&draft.subject);
        std::fs::write(&path, message)?;
        Ok(path)
    }
}

fn truncate_stem(stem: &str) -> String {
    let mut end = 0;
    for (i, ch) in stem.char_indices() {
        if i + ch.len_utf8() > MAX_STEM_BYTES {
            break;
        }
        end = i + ch.len_utf8();
    }
    stem[..end].trim_end().to_string()
}

fn wrap_base64(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// RFC 2047 encoded word for non-ASCII header text.
fn header_text(text: &str) -> String {
    if text.is_ascii() {
        text.to_string()
    } else {
        format!(
            "=?UTF-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
        )
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("xlsx") => XLSX_MIME,
        Some("xlsm") => XLSM_MIME,
        _ => "application/octet-stream",
    }
}

/// Full RFC 5322 message text of a draft.
pub fn render(draft: &Draft, boundary: &str) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("To: {}\r\n", draft.to));
    out.push_str(&format!("Subject: {}\r\n", header_text(&draft.subject)));
    out.push_str(&format!("Date: {}\r\n", Local::now().to_rfc2822()));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("X-Unsent: 1\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str("Content-Type: text/html; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&wrap_base64(draft.html_body.as_bytes()));

    for attachment in &draft.attachments {
        let data = std::fs::read(attachment)?;
        let name = header_text(
            &attachment
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            content_type_for(attachment),
            name
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            name
        ));
        out.push_str(&wrap_base64(&data));
    }

    out.push_str(&format!("--{}--\r\n", boundary));
    Ok(out)
}
