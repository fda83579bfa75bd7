//! The browser error log.
//!
//! Instrumented pages post their errors to the collector, which appends one
//! JSON object per line to `browser-errors.jsonl` in the output directory.
//! Entries older than [`MAX_AGE_HOURS`] are dropped and at most
//! [`MAX_ENTRIES`] are kept.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ERROR_LOG_FILE: &str = "browser-errors.jsonl";
pub const MAX_ENTRIES: usize = 1000;
pub const MAX_AGE_HOURS: i64 = 24;

/// Lines whose `timestamp` is within the last [`MAX_AGE_HOURS`], at most the
/// newest [`MAX_ENTRIES`]. Unparseable lines are dropped.
pub fn prune(content: &str, now: DateTime<Utc>) -> Vec<&str> {
    let cutoff = now - Duration::hours(MAX_AGE_HOURS);

    let recent: Vec<&str> = content
        .lines()
        .filter(|line| {
            serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|entry| entry["timestamp"].as_str().map(str::to_string))
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|ts| ts.with_timezone(&Utc) > cutoff)
                .unwrap_or(false)
        })
        .collect();

    let skip = recent.len().saturating_sub(MAX_ENTRIES);
    recent.into_iter().skip(skip).collect()
}

fn rewrite(path: &Path, lines: &[&str]) -> std::io::Result<()> {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    std::fs::write(path, out)
}

/// Append `record`, then rewrite the log with only what [`prune`] keeps.
/// Returns the number of entries left.
pub fn append_and_prune(path: &Path, record: &Value, now: DateTime<Utc>) -> std::io::Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{record}")?;
    drop(file);

    let content = std::fs::read_to_string(path)?;
    let kept = prune(&content, now);
    rewrite(path, &kept)?;
    Ok(kept.len())
}

/// Prune the log in place. A missing log stays missing.
pub fn prune_file(path: &Path, now: DateTime<Utc>) -> std::io::Result<usize> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let kept = prune(&content, now);
    rewrite(path, &kept)?;
    Ok(kept.len())
}

/// Which logged entries to report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorFilter {
    /// Page file name, e.g. `app.html`
    pub page: Option<String>,
    /// `error`, `warning`, `log` or `network`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Only the newest N after filtering; 0 means all
    pub last_n: Option<usize>,
}

impl ErrorFilter {
    fn matches(&self, entry: &Value) -> bool {
        self.page.as_deref().is_none_or(|page| entry["page"] == page)
            && self.kind.as_deref().is_none_or(|kind| entry["type"] == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub pages: Vec<String>,
    pub errors: Vec<Value>,
}

/// Parse the log, apply `filter` and count what is left by type and page.
pub fn summarize(content: &str, filter: &ErrorFilter) -> ErrorSummary {
    let mut errors: Vec<Value> = content
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(|entry| entry.is_object() && filter.matches(entry))
        .collect();

    if let Some(n) = filter.last_n.filter(|n| *n > 0) {
        let skip = errors.len().saturating_sub(n);
        errors.drain(..skip);
    }

    let mut by_type = BTreeMap::new();
    let mut pages: Vec<String> = Vec::new();
    for entry in &errors {
        let kind = entry["type"].as_str().unwrap_or("unknown");
        *by_type.entry(kind.to_string()).or_insert(0) += 1;
        if let Some(page) = entry["page"].as_str() {
            if !pages.iter().any(|p| p == page) {
                pages.push(page.to_string());
            }
        }
    }

    ErrorSummary {
        total: errors.len(),
        by_type,
        pages,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(ts: DateTime<Utc>, n: usize) -> String {
        json!({ "type": "error", "message": format!("m{n}"), "timestamp": ts.to_rfc3339() })
            .to_string()
    }

    #[test]
    fn test_prune_drops_old_and_garbage() {
        let now = Utc::now();
        let content = [
            entry(now - Duration::hours(25), 0),
            "not json".to_string(),
            entry(now - Duration::hours(1), 1),
            json!({ "message": "no timestamp" }).to_string(),
        ]
        .join("\n");

        let kept = prune(&content, now);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].contains("m1"));
    }

    #[test]
    fn test_prune_keeps_newest_entries() {
        let now = Utc::now();
        let content = (0..MAX_ENTRIES + 5)
            .map(|n| entry(now, n))
            .collect::<Vec<_>>()
            .join("\n");

        let kept = prune(&content, now);
        assert_eq!(kept.len(), MAX_ENTRIES);
        assert!(kept[0].contains("\"m5\""));
    }

    #[test]
    fn test_append_and_prune() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join(ERROR_LOG_FILE);
        let now = Utc::now();
        std::fs::write(&log, format!("{}\n", entry(now - Duration::hours(30), 0))).unwrap();

        let record = json!({ "type": "warning", "timestamp": now.to_rfc3339() });
        assert_eq!(append_and_prune(&log, &record, now).unwrap(), 1);

        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"warning\""));
    }

    #[test]
    fn test_prune_file_leaves_missing_log_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join(ERROR_LOG_FILE);
        assert_eq!(prune_file(&log, Utc::now()).unwrap(), 0);
        assert!(!log.exists());
    }

    #[test]
    fn test_summarize_counts_types_and_pages() {
        let content = [
            json!({ "type": "error", "page": "app.html" }).to_string(),
            json!({ "type": "network", "page": "login.html" }).to_string(),
            "garbage".to_string(),
            json!({ "type": "error", "page": "app.html" }).to_string(),
        ]
        .join("\n");

        let summary = summarize(&content, &ErrorFilter::default());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type["error"], 2);
        assert_eq!(summary.by_type["network"], 1);
        assert_eq!(summary.pages, vec!["app.html", "login.html"]);
    }
}
