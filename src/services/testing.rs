//! Shared fixtures for service tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::JobSnapshot;
use crate::services::launcher::WorkerLauncher;
use crate::services::locator::ResultLocator;
use crate::services::registry::ProcessRegistry;
use crate::services::spreadsheet::{SheetError, SpreadsheetReader};

/// Serves canned rows by path; unknown paths behave like an empty workbook.
#[derive(Default)]
pub(crate) struct MemoryReader {
    sheets: Mutex<HashMap<PathBuf, Vec<Vec<String>>>>,
}

impl MemoryReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, path: &Path, rows: Vec<Vec<String>>) {
        self.sheets.lock().insert(path.to_path_buf(), rows);
    }
}

impl SpreadsheetReader for MemoryReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
        self.sheets
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| SheetError::NoSheets(path.to_path_buf()))
    }
}

pub(crate) fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

/// Registry whose worker is `/bin/sh`, so the "input spreadsheet" is a script.
/// Result discovery never leaves `results_dir`.
pub(crate) fn sh_registry(results_dir: &Path, reader: MemoryReader) -> ProcessRegistry {
    ProcessRegistry::new(
        WorkerLauncher::new("/bin/sh"),
        ResultLocator::new(results_dir).with_fallback_dir(results_dir),
        Arc::new(reader),
    )
}

/// Poll until `pred` holds for the job, or panic after five seconds.
pub(crate) async fn wait_for(
    registry: &ProcessRegistry,
    id: &str,
    pred: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    for _ in 0..250 {
        let job = registry.get(id).unwrap();
        if pred(&job) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {}", id);
}
