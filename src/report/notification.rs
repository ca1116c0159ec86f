//! Summary notification content
//!
//! Shared by every publisher: the decision whether to notify, the subject
//! line, the HTML summary table and the RFC 822 message sent per recipient.

use serde::Serialize;
use tracing::info;

use super::{PublishError, PublishResult};
use crate::scheduler::{AggregateReport, SectionSummary};

const SUMMARY_TEMPLATE_NAME: &str = "summary.html";

const SUMMARY_TEMPLATE: &str = r#"<html>
<body>
{{ subject }}
<br/><br/>
<table border="1" width="95%" style="border-collapse:collapse;">
    <tr>
{%- if not combined %}
        <th align="left">Customer Id</th>
        <th align="left">Account Id</th>
        <th align="left">Account Number</th>
        <th align="left">Account Name</th>
{%- endif %}
        <th align="center"># of Campaigns</th>
        <th align="center">Full Report</th>
    </tr>
{%- for line in lines %}
    <tr>
{%- if not combined %}
        <td align="left">{{ line.summary.customer_id }}</td>
        <td align="left">{{ line.summary.account_id }}</td>
        <td align="left">{{ line.summary.account_number }}</td>
        <td align="left">{{ line.summary.account_name }}</td>
{%- endif %}
        <td align="center">{{ line.summary.row_count }}</td>
        <td align="center"><a href="{{ document_url|safe }}#gid={{ line.section_id }}">Show Details</a></td>
    </tr>
{%- endfor %}
</table>
<br/>
Checked: {{ checked|safe }}
</body>
</html>
"#;

/// One summary table line: a section and where it lives in the document
#[derive(Debug, Clone, Serialize)]
pub struct SummaryLine {
    /// Section summary
    pub summary: SectionSummary,
    /// Section identifier inside the published document (sheet id, file stem)
    pub section_id: String,
}

/// Subject line for a run that found `total` rows
pub fn subject(total: usize, threshold: u32) -> String {
    format!("MSA: Found {total} campaigns(s) whose spend exceeds {threshold}% of budget")
}

/// Whether a notification should go out for `report`
///
/// Nothing is sent without sections; an all-empty report is sent only when
/// `always_notify` is set.
pub fn should_notify(report: &AggregateReport, always_notify: bool) -> bool {
    if report.sections.is_empty() {
        return false;
    }
    if report.total_rows() == 0 && !always_notify {
        info!("Skipping email notification since no rows were found");
        return false;
    }
    true
}

/// Render the HTML summary body
pub fn render_summary_html(
    subject: &str,
    combined: bool,
    lines: &[SummaryLine],
    document_url: &str,
    checked: &str,
) -> PublishResult<String> {
    let mut env = minijinja::Environment::new();
    env.add_template(SUMMARY_TEMPLATE_NAME, SUMMARY_TEMPLATE)
        .map_err(|e| PublishError::Template(e.to_string()))?;
    let template = env
        .get_template(SUMMARY_TEMPLATE_NAME)
        .map_err(|e| PublishError::Template(e.to_string()))?;

    template
        .render(minijinja::context! {
            subject => subject,
            combined => combined,
            lines => lines,
            document_url => document_url,
            checked => checked,
        })
        .map_err(|e| PublishError::Template(e.to_string()))
}

/// RFC 822 HTML message for one recipient
pub fn compose_message(to: &str, subject: &str, html: &str) -> String {
    format!("To: {to}\r\nSubject: {subject}\r\nContent-Type: text/html; charset=\"utf-8\"\r\n\r\n{html}")
}
