//! The allowlist: a hot-reloaded YAML file of suppressions for known false
//! positives. Readers take a cheap copy-on-write `Arc` snapshot; the
//! watcher swaps the `Arc` behind a mutex on reload and never blocks a
//! reader mid-request.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawEntry {
    TextContains { text_contains: String, reason: Option<String> },
    Regex { regex: String, reason: Option<String> },
    RuleId { rule_id: String, reason: Option<String> },
}

#[derive(Clone, Debug)]
pub enum AllowlistEntry {
    TextContains(String),
    Regex(Regex),
    RuleId(String),
}

impl AllowlistEntry {
    pub fn matches(&self, rule_id: &str, excerpt: &str) -> bool {
        match self {
            AllowlistEntry::TextContains(needle) => excerpt.contains(needle.as_str()),
            AllowlistEntry::Regex(re) => re.is_match(excerpt),
            AllowlistEntry::RuleId(id) => id == rule_id,
        }
    }
}

fn parse(contents: &str) -> anyhow::Result<Vec<AllowlistEntry>> {
    let raw: Vec<RawEntry> = serde_yaml::from_str(contents)?;
    raw.into_iter()
        .map(|r| match r {
            RawEntry::TextContains { text_contains, .. } => Ok(AllowlistEntry::TextContains(text_contains)),
            RawEntry::Regex { regex, .. } => Ok(AllowlistEntry::Regex(Regex::new(&regex)?)),
            RawEntry::RuleId { rule_id, .. } => Ok(AllowlistEntry::RuleId(rule_id)),
        })
        .collect()
}

/// The shared, mutable singleton. Holds an `Arc<Vec<AllowlistEntry>>` so
/// `snapshot()` is a cheap clone of the pointer, never the data.
pub struct Allowlist {
    path: PathBuf,
    current: Arc<Mutex<Arc<Vec<AllowlistEntry>>>>,
    _watcher: Option<RecommendedWatcher>,
}

impl Allowlist {
    /// Loads `path` if it exists (an absent file means an empty allowlist,
    /// not an error) and starts a file watcher that reloads on change.
    /// Parse errors on reload leave the previously loaded set in force and
    /// log a warning.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let entries = load_entries(path)?;
        let current = Arc::new(Mutex::new(Arc::new(entries)));
        let watcher = start_watcher(path, Arc::clone(&current))?;
        Ok(Allowlist { path: path.to_path_buf(), current, _watcher: Some(watcher) })
    }

    pub fn snapshot(&self) -> Arc<Vec<AllowlistEntry>> {
        Arc::clone(&self.current.lock().unwrap())
    }

    /// Returns the first matching entry's reason, if any match is found.
    pub fn check(&self, rule_id: &str, excerpt: &str) -> Option<AllowlistEntry> {
        self.snapshot().iter().find(|e| e.matches(rule_id, excerpt)).cloned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_entries(path: &Path) -> anyhow::Result<Vec<AllowlistEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

fn start_watcher(path: &Path, current: Arc<Mutex<Arc<Vec<AllowlistEntry>>>>) -> anyhow::Result<RecommendedWatcher> {
    let watched_path = path.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "allowlist watcher error");
                return;
            }
        };
        if !event.kind.is_modify() && !event.kind.is_create() {
            return;
        }
        match load_entries(&watched_path) {
            Ok(entries) => {
                *current.lock().unwrap() = Arc::new(entries);
                tracing::info!(path = %watched_path.display(), "allowlist reloaded");
            }
            Err(err) => {
                tracing::warn!(error = %err, "allowlist reload failed, keeping previous set");
            }
        }
    })?;
    if let Some(parent) = path.parent().filter(|p| p.exists()) {
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_variants() {
        let yaml = "- text_contains: \"rm -rf /tmp/build\"\n- regex: \"foo[0-9]+\"\n- rule_id: SHELL_RM_RF_ROOT\n";
        let entries = parse(yaml).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn text_contains_suppresses_matching_excerpt() {
        let entry = AllowlistEntry::TextContains("rm -rf /tmp/build".to_string());
        assert!(entry.matches("SHELL_RM_RF_ROOT", "our cleanup step is: rm -rf /tmp/build"));
    }

    #[test]
    fn rule_id_entry_matches_only_that_rule() {
        let entry = AllowlistEntry::RuleId("SHELL_RM_RF_ROOT".to_string());
        assert!(entry.matches("SHELL_RM_RF_ROOT", "anything"));
        assert!(!entry.matches("CRED_OPENAI_KEY", "anything"));
    }

    #[test]
    fn missing_file_loads_as_empty_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let allowlist = Allowlist::load(&dir.path().join("allowlist.yaml")).unwrap();
        assert!(allowlist.snapshot().is_empty());
    }

    #[test]
    fn loaded_file_is_checkable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowlist.yaml");
        std::fs::write(&path, "- text_contains: \"rm -rf /tmp/build\"\n").unwrap();
        let allowlist = Allowlist::load(&path).unwrap();
        assert!(allowlist.check("SHELL_RM_RF_ROOT", "our cleanup step is: rm -rf /tmp/build").is_some());
        assert!(allowlist.check("SHELL_RM_RF_ROOT", "totally fine text").is_none());
    }
}
