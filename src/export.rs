//! Render match results and the flattened corpus for output.
//!
//! Three formats: a human-readable text listing, pretty-printed JSON, and
//! CSV. Similarity is rounded to three decimals here and nowhere else;
//! [`MatchResult`] keeps full precision.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::flatten::{Level, ReferenceStatement, StatementKind};
use crate::rank::MatchResult;

/// Printed in text mode when nothing clears the threshold.
pub const NO_MATCHES: &str = "No matches above the threshold found.";

const CSV_HEADER: [&str; 8] = [
    "rank",
    "level",
    "goal_id",
    "target_no",
    "indicator_no",
    "title",
    "text",
    "similarity",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
}

/// Flat, serializable view of one [`MatchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub rank: usize,
    pub level: Level,
    pub goal_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub similarity: f64,
}

impl From<&MatchResult> for MatchRecord {
    fn from(r: &MatchResult) -> Self {
        let s = &r.statement;
        let (target_no, indicator_no, title) = identifiers(s);
        Self {
            rank: r.rank,
            level: s.level(),
            goal_id: s.goal_id(),
            target_no,
            indicator_no,
            title,
            text: s.text().to_string(),
            similarity: round3(r.similarity),
        }
    }
}

/// Serializable view of one corpus statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRecord {
    pub level: Level,
    pub goal_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

impl From<&ReferenceStatement> for StatementRecord {
    fn from(s: &ReferenceStatement) -> Self {
        let (target_no, indicator_no, title) = identifiers(s);
        Self {
            level: s.level(),
            goal_id: s.goal_id(),
            target_no,
            indicator_no,
            title,
            text: s.text().to_string(),
        }
    }
}

/// `(target_no, indicator_no, title)`; exactly one is set.
fn identifiers(s: &ReferenceStatement) -> (Option<String>, Option<String>, Option<String>) {
    match s.kind() {
        StatementKind::Goal { title } => (None, None, Some(title.clone())),
        StatementKind::SubTarget { target_no } => (Some(target_no.clone()), None, None),
        StatementKind::SubIndicator { indicator_no } => (None, Some(indicator_no.clone()), None),
    }
}

pub fn records(results: &[MatchResult]) -> Vec<MatchRecord> {
    results.iter().map(MatchRecord::from).collect()
}

fn round3(x: f32) -> f64 {
    (x as f64 * 1000.0).round() / 1000.0
}

/// Render `results` in `format`. The output always ends with a newline.
pub fn render(results: &[MatchResult], format: ExportFormat) -> Result<String> {
    let records = records(results);
    match format {
        ExportFormat::Text => Ok(render_text(&records)),
        ExportFormat::Json => render_json(&records),
        ExportFormat::Csv => Ok(render_csv(&records)),
    }
}

pub fn render_json(records: &[MatchRecord]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(records)?;
    out.push('\n');
    Ok(out)
}

pub fn render_csv(records: &[MatchRecord]) -> String {
    let mut out = String::new();
    push_csv_row(&mut out, CSV_HEADER.iter().copied());

    for r in records {
        let rank = r.rank.to_string();
        let goal_id = r.goal_id.to_string();
        let similarity = r.similarity.to_string();
        push_csv_row(
            &mut out,
            [
                rank.as_str(),
                r.level.as_str(),
                goal_id.as_str(),
                r.target_no.as_deref().unwrap_or(""),
                r.indicator_no.as_deref().unwrap_or(""),
                r.title.as_deref().unwrap_or(""),
                r.text.as_str(),
                similarity.as_str(),
            ],
        );
    }
    out
}

fn push_csv_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(field));
    }
    out.push_str("\r\n");
}

/// Quote a field when it contains a comma, quote, or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_text(records: &[MatchRecord]) -> String {
    if records.is_empty() {
        return format!("{}\n", NO_MATCHES);
    }

    let mut out = String::new();
    for r in records {
        let mut heading = format!("{}. {}: SDG {}", r.rank, r.level.label(), r.goal_id);
        if let Some(t) = &r.target_no {
            heading.push_str(&format!(" Target {}", t));
        }
        if let Some(i) = &r.indicator_no {
            heading.push_str(&format!(" Indicator {}", i));
        }
        if let Some(title) = &r.title {
            heading.push_str(&format!(" / {}", title));
        }
        out.push_str(&heading);
        out.push('\n');
        out.push_str(&format!("   Similarity: {:.3}\n", r.similarity));
        out.push_str(&format!("   Text: {}\n", r.text));
        out.push('\n');
    }
    out
}

/// Render the flattened corpus. CSV is not offered for statements.
pub fn render_statements(statements: &[ReferenceStatement], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            let records: Vec<StatementRecord> =
                statements.iter().map(StatementRecord::from).collect();
            let mut out = serde_json::to_string_pretty(&records)?;
            out.push('\n');
            Ok(out)
        }
        ExportFormat::Text => {
            let mut out = String::new();
            for s in statements {
                out.push_str(&format!("[{}] {}\n", s.level().as_str(), s.text()));
            }
            Ok(out)
        }
        ExportFormat::Csv => anyhow::bail!("CSV output is only available for match results"),
    }
}

/// Write `content` to `output`, or to stdout when `output` is `None`.
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, content)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
