//! Email draft composition
//!
//! Subject and HTML body for one (buyer, supplier) group of reports.

use crate::classifier::is_fail_result;
use std::collections::BTreeSet;

/// One report line in the email body.
#[derive(Debug, Clone, Default)]
pub struct DraftLine {
    pub style: String,
    pub color: String,
    pub rolls: String,
    pub result: String,
    pub comment: String,
    pub consignment: String,
}

/// Groups items by key, keeping the order in which keys first appear.
pub fn group_in_order<K, T, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `"<buyer> # <consignments> Rolls consignment Fabric Inspection Status"`,
/// consignments unique, sorted and comma separated.
pub fn compose_subject(buyer: &str, lines: &[DraftLine]) -> String {
    let consignments: BTreeSet<&str> = lines
        .iter()
        .map(|l| l.consignment.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    let joined: Vec<&str> = consignments.into_iter().collect();
    format!(
        "{} # {} Rolls consignment Fabric Inspection Status",
        buyer,
        joined.join(", ")
    )
}

/// Whether any line of the group failed or was rejected.
pub fn has_fail_report(lines: &[DraftLine]) -> bool {
    lines.iter().any(|l| is_fail_result(&l.result))
}

/// HTML body listing the group's reports by style.
pub fn compose_html_body(buyer: &str, supplier: &str, lines: &[DraftLine], sender_name: &str) -> String {
    let mut body = String::from(
        r#"<html><head><style>
body { font-family: Calibri, sans-serif; font-size: 11pt; }
.fail-text { color: red; font-weight: bold; }
.pass-text { color: green; }
.container { margin-bottom: 8px; }
.icon { font-size: 1.1em; }
</style></head><body>
<p>Dear Concern,</p>
<p>Please find the attached Fabric Inspection Report(s). The summary is mentioned below:</p>
"#,
    );
    body.push_str(&format!(
        "<p style=\"margin: 0;\"><b>Buyer:</b> {}</p>\n",
        escape_html(or_na(buyer))
    ));
    body.push_str(&format!(
        "<p style=\"margin: 10px 0;\"><b>Supplier:</b> {}</p><hr>\n",
        escape_html(or_na(supplier))
    ));

    for (style, style_lines) in group_in_order(lines, |l| or_na(&l.style).to_string()) {
        body.push_str(&format!(
            "<p style=\"margin-top: 15px; margin-bottom: 5px;\"><b>Style:</b> {}</p>\n",
            escape_html(&style)
        ));
        body.push_str("<div style=\"margin-top: 5px; padding-left: 25px;\">\n");
        for line in style_lines {
            let result_class = if is_fail_result(&line.result) {
                "fail-text"
            } else {
                "pass-text"
            };
            let reason = if line.comment.trim().is_empty() {
                String::new()
            } else {
                format!(" Due to: {}", escape_html(line.comment.trim()))
            };
            body.push_str(&format!(
                "<div class=\"container\"><span class=\"icon\">&#10146;</span> <b>{}</b> ({} Rolls): <span class=\"{}\">{}</span>{}</div>\n",
                escape_html(or_na(&line.color)),
                escape_html(or_na(&line.rolls)),
                result_class,
                escape_html(&or_na(&line.result).to_uppercase()),
                reason
            ));
        }
        body.push_str("</div>\n");
    }

    body.push_str(&format!(
        "<br><p>Thanks.</p><p>Best Regards,<br>{}</p></body></html>",
        escape_html(sender_name)
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(style: &str, color: &str, result: &str, consignment: &str) -> DraftLine {
        DraftLine {
            style: style.into(),
            color: color.into(),
            rolls: "10".into(),
            result: result.into(),
            comment: String::new(),
            consignment: consignment.into(),
        }
    }

    #[test]
    fn test_group_in_order_keeps_first_appearance() {
        let groups = group_in_order(vec![("b", 1), ("a", 2), ("b", 3)], |(k, _)| *k);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "b");
        assert_eq!(groups[0].1, vec![("b", 1), ("b", 3)]);
        assert_eq!(groups[1].0, "a");
    }

    #[test]
    fn test_subject_sorted_unique_consignments() {
        let lines = vec![
            line("S1", "Red", "Pass", "7"),
            line("S1", "Blue", "Fail", "12"),
            line("S2", "Red", "Fail", "7"),
            line("S2", "Red", "Fail", ""),
        ];
        assert_eq!(
            compose_subject("Acme", &lines),
            "Acme # 12, 7 Rolls consignment Fabric Inspection Status"
        );
    }

    #[test]
    fn test_has_fail_report() {
        assert!(has_fail_report(&[line("S1", "Red", "Pass", "1"), line("S1", "Red", "REJECTED", "1")]));
        assert!(!has_fail_report(&[line("S1", "Red", "Pass", "1")]));
    }

    #[test]
    fn test_body_groups_by_style() {
        let mut failing = line("S2", "Navy", "fail", "3");
        failing.comment = "Shading".into();
        let lines = vec![line("S1", "Red", "pass", "3"), failing, line("S1", "Blue", "pass", "3")];
        let body = compose_html_body("Acme", "Mill", &lines, "QED Department");

        let s1 = body.find("<b>Style:</b> S1").unwrap();
        let s2 = body.find("<b>Style:</b> S2").unwrap();
        let blue = body.find("<b>Blue</b>").unwrap();
        assert!(s1 < blue && blue < s2);
        assert!(body.contains("<span class=\"fail-text\">FAIL</span> Due to: Shading"));
        assert!(body.contains("<span class=\"pass-text\">PASS</span>"));
        assert!(body.contains("Best Regards,<br>QED Department"));
    }

    #[test]
    fn test_body_escapes_html() {
        let lines = vec![line("A<B", "Red & Blue", "pass", "1")];
        let body = compose_html_body("Acme", "", &lines, "QED");
        assert!(body.contains("A&lt;B"));
        assert!(body.contains("Red &amp; Blue"));
        assert!(body.contains("<b>Supplier:</b> N/A"));
    }
}
