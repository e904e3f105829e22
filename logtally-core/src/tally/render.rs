use crate::tally::types::ServiceSummary;
use std::fmt::Write;

/// `<service>: <LEVEL1> <count1>, <LEVEL2> <count2>, ...` with a trailing newline.
pub fn render_summary(levels: &[String], summary: &ServiceSummary) -> String {
    let mut out = String::new();
    out.push_str(&summary.service);
    out.push(':');

    for (idx, level) in levels.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        let count = summary.counts.get(idx).copied().unwrap_or(0);
        let _ = write!(out, " {level} {count}");
    }

    out.push('\n');
    out
}

/// All service lines of one tick, in the order the summaries were produced.
pub fn render_report(levels: &[String], summaries: &[ServiceSummary]) -> String {
    summaries
        .iter()
        .map(|summary| render_summary(levels, summary))
        .collect()
}
