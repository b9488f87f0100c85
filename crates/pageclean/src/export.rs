//! Export file naming and writing

use crate::types::{ExplorationMode, ExtractReport};
use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Timestamp format used in export file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Domain part of an export file name
///
/// Host and explicit port, dots replaced by underscores. Credentials in the
/// URL never reach the file name.
pub fn export_domain(url: &str) -> String {
    let authority = match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        },
        Err(_) => {
            let rest = url.split_once("//").map(|(_, rest)| rest).unwrap_or(url);
            let authority = rest.split('/').next().unwrap_or_default();
            authority.rsplit('@').next().unwrap_or_default().to_string()
        }
    };
    sanitize(&authority.replace('.', "_"))
}

/// `<domain>_<timestamp>[_<label>].txt`
pub fn export_file_name(url: &str, label: Option<&str>, at: &DateTime<Local>) -> String {
    let mut name = format!("{}_{}", export_domain(url), at.format(TIMESTAMP_FORMAT));
    if let Some(label) = label {
        name.push('_');
        name.push_str(&sanitize(&label.replace(' ', "_")));
    }
    name.push_str(".txt");
    name
}

/// File name for one page of a report
///
/// Single-page reports omit the label.
pub fn page_file_name(report: &ExtractReport, label: &str, at: &DateTime<Local>) -> String {
    let label = (report.mode != ExplorationMode::Single).then_some(label);
    export_file_name(&report.url, label, at)
}

/// Write `content` to `dir/name`, creating `dir` if needed
pub fn write_export(dir: &Path, name: &str, content: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Exported page");
    Ok(path)
}

/// Replace characters that are unsafe in file names
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
