//! Project completion state on disk

use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

/// Artifact whose presence marks a project as already initialized
pub const FEATURE_LIST_FILE: &str = "feature_list.json";
/// Session log appended after every turn
pub const PROGRESS_LOG_FILE: &str = "claude-progress.txt";

const PROGRESS_LOG_HEADER: &str =
    "# Claude Progress Log\n\nAutomatically generated after each session.\n";

/// Aggregate pass counts from the feature list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCounts {
    pub passing: usize,
    pub total: usize,
}

impl ProgressCounts {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passing as f64 / self.total as f64 * 100.0
        }
    }

    /// One-line progress description for summaries and the session log
    pub fn describe(&self) -> String {
        if self.total > 0 {
            format!(
                "{}/{} tests passing ({:.1}%)",
                self.passing,
                self.total,
                self.percent()
            )
        } else {
            format!("{} not yet created", FEATURE_LIST_FILE)
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureRecord {
    #[serde(default)]
    passes: bool,
}

/// Whether the progress artifact exists. Absence means a fresh project.
pub fn has_feature_list(project_dir: &Path) -> bool {
    project_dir.join(FEATURE_LIST_FILE).exists()
}

/// Count passing and total feature records.
///
/// A missing or undecodable file counts as zero of zero; the agent may not
/// have written it yet.
pub fn count_passing(project_dir: &Path) -> ProgressCounts {
    let path = project_dir.join(FEATURE_LIST_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return ProgressCounts::default(),
    };
    match serde_json::from_str::<Vec<FeatureRecord>>(&raw) {
        Ok(records) => ProgressCounts {
            passing: records.iter().filter(|r| r.passes).count(),
            total: records.len(),
        },
        Err(err) => {
            warn!("Unreadable {}: {}", FEATURE_LIST_FILE, err);
            ProgressCounts::default()
        }
    }
}

/// Append a dated entry for a finished session to the progress log.
///
/// The log is advisory; it records what happened even when the agent wrote
/// nothing itself.
pub fn append_session_log(
    project_dir: &Path,
    session: u32,
    initializer: bool,
) -> std::io::Result<()> {
    let path = project_dir.join(PROGRESS_LOG_FILE);
    let agent_kind = if initializer {
        "Initializer"
    } else {
        "Coding Agent"
    };
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M");
    let progress = count_passing(project_dir).describe();

    let entry = format!(
        "\n=== Session {}: {} ===\nDate: {}\n\nProgress: {}\n\n---\n",
        session, agent_kind, stamp, progress
    );

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    if file.metadata()?.len() == 0 {
        file.write_all(PROGRESS_LOG_HEADER.as_bytes())?;
    }
    file.write_all(entry.as_bytes())?;
    debug!("Updated {}", PROGRESS_LOG_FILE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_counts_zero() {
        let dir = TempDir::new().unwrap();
        assert!(!has_feature_list(dir.path()));
        assert_eq!(count_passing(dir.path()), ProgressCounts::default());
    }

    #[test]
    fn test_counts_passing_records() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(FEATURE_LIST_FILE),
            r#"[
                {"description": "login", "passes": true},
                {"description": "logout", "passes": false},
                {"description": "signup"}
            ]"#,
        )
        .unwrap();

        assert!(has_feature_list(dir.path()));
        let counts = count_passing(dir.path());
        assert_eq!(
            counts,
            ProgressCounts {
                passing: 1,
                total: 3
            }
        );
        assert_eq!(counts.describe(), "1/3 tests passing (33.3%)");
    }

    #[test]
    fn test_malformed_file_counts_zero() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FEATURE_LIST_FILE), "{ nope").unwrap();
        assert_eq!(count_passing(dir.path()), ProgressCounts::default());
    }

    #[test]
    fn test_describe_without_file() {
        assert_eq!(
            ProgressCounts::default().describe(),
            "feature_list.json not yet created"
        );
    }

    #[test]
    fn test_session_log_appends() {
        let dir = TempDir::new().unwrap();
        append_session_log(dir.path(), 1, true).unwrap();
        append_session_log(dir.path(), 2, false).unwrap();

        let log = std::fs::read_to_string(dir.path().join(PROGRESS_LOG_FILE)).unwrap();
        assert!(log.starts_with("# Claude Progress Log"));
        assert!(log.contains("=== Session 1: Initializer ==="));
        assert!(log.contains("=== Session 2: Coding Agent ==="));
        assert!(log.contains("feature_list.json not yet created"));
    }
}
