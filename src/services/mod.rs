//! Business logic services.

pub mod estimator;
pub mod launcher;
pub mod locator;
pub mod registry;
pub mod spreadsheet;
pub mod upload;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use estimator::{Estimate, ProgressEstimator};
pub use launcher::WorkerLauncher;
pub use locator::{ResultKind, ResultLocator};
pub use registry::{ProcessRegistry, RegistryError};
pub use spreadsheet::{SpreadsheetReader, XlsxReader};
