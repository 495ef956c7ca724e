//! Result spreadsheet discovery.
//!
//! Three selection policies live here and are deliberately not shared:
//! - [`ResultLocator::discover`]: first glob match per category, used when a job finishes.
//! - [`ResultLocator::latest`]: newest modification time, used by the download endpoint.
//! - [`ResultLocator::latest_since`]: newest dated file written during a run, used
//!   for running-job progress.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use glob::Pattern;
use tracing::{debug, info, warn};

/// Category of a result spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Success,
    Fail,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result files found for a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredResults {
    pub success: Option<PathBuf>,
    pub fail: Option<PathBuf>,
}

impl DiscoveredResults {
    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.fail.is_none()
    }
}

/// Glob `pattern` against file names in `directory`.
///
/// The directory part is escaped so paths containing glob metacharacters are
/// matched literally. Unreadable entries are skipped.
pub fn find(directory: &Path, pattern: &str) -> Vec<PathBuf> {
    let escaped = Pattern::escape(&directory.to_string_lossy());
    let full = format!("{}/{}", escaped.trim_end_matches('/'), pattern);

    match glob::glob(&full) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            warn!("Invalid result glob {}: {}", full, e);
            Vec::new()
        }
    }
}

/// Locates worker output under the canonical results directory.
#[derive(Debug, Clone)]
pub struct ResultLocator {
    results_dir: PathBuf,
    /// Searched at finalization when the results directory has nothing.
    /// `None` means the process's current directory.
    fallback_dir: Option<PathBuf>,
}

impl ResultLocator {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            fallback_dir: None,
        }
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    /// Finalization discovery: results directory first, then the fallback
    /// directory for workers that still write next to themselves.
    pub fn discover(&self) -> DiscoveredResults {
        info!(
            "Searching for result files in: {}",
            self.results_dir.display()
        );
        let found = discover_in(&self.results_dir);
        if !found.is_empty() {
            return found;
        }

        let fallback = match &self.fallback_dir {
            Some(dir) => dir.clone(),
            None => match std::env::current_dir() {
                Ok(cwd) => cwd,
                Err(e) => {
                    warn!("Cannot resolve current directory: {}", e);
                    return DiscoveredResults::default();
                }
            },
        };
        info!(
            "No result files found in {}, trying {}",
            self.results_dir.display(),
            fallback.display()
        );
        discover_in(&fallback)
    }

    /// Newest file named `<kind>_*` by modification time.
    pub fn latest(&self, kind: ResultKind) -> Option<PathBuf> {
        newest(find(&self.results_dir, &format!("{}_*", kind)), None)
    }

    /// Newest `<kind>_<YYYYMMDD>*.xlsx` file modified at or after `since`.
    pub fn latest_since(
        &self,
        kind: ResultKind,
        date: NaiveDate,
        since: SystemTime,
    ) -> Option<PathBuf> {
        let pattern = format!("{}_{}*.xlsx", kind, date.format("%Y%m%d"));
        newest(find(&self.results_dir, &pattern), Some(since))
    }
}

/// First glob-ordered match per category; a name containing `success` is never
/// also counted as a fail file.
pub fn discover_in(directory: &Path) -> DiscoveredResults {
    let candidates = find(directory, "*.xlsx");
    debug!(
        "Found {} possible result files in {}",
        candidates.len(),
        directory.display()
    );

    let mut found = DiscoveredResults::default();
    for path in candidates {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        if name.contains(ResultKind::Success.as_str()) {
            if found.success.is_none() {
                info!("Found success file: {}", path.display());
                found.success = Some(path);
            }
        } else if name.contains(ResultKind::Fail.as_str()) && found.fail.is_none() {
            info!("Found fail file: {}", path.display());
            found.fail = Some(path);
        }
    }
    found
}

fn newest(paths: Vec<PathBuf>, since: Option<SystemTime>) -> Option<PathBuf> {
    let mut latest: Option<(PathBuf, SystemTime)> = None;

    for path in paths {
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if since.is_some_and(|since| modified < since) {
            continue;
        }

        match &latest {
            Some((_, best)) if modified <= *best => {}
            _ => latest = Some((path, modified)),
        }
    }

    latest.map(|(path, _)| path)
}
