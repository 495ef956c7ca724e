//! Spreadsheet access for input and result workbooks.
//!
//! Only the first sheet of a workbook is ever consulted. Cells are handed out
//! as display strings with trailing empty cells trimmed, so a row's length is
//! its number of populated columns. Rows and columns are numbered from A1 even
//! when the sheet's used range starts further in.

use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::{debug, info};

use crate::models::Account;
use crate::services::locator::ResultKind;

/// Minimum populated cells for a success row: username, balance, last deposit, deposit time.
const SUCCESS_ROW_CELLS: usize = 4;

/// Minimum populated cells for a fail row: username, password, reason.
const FAIL_ROW_CELLS: usize = 3;

/// Spreadsheet read errors. Callers log these and degrade to "no data".
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("no sheets found in {}", .0.display())]
    NoSheets(PathBuf),

    #[error("failed to read rows from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

/// Reads the rows of a workbook's first sheet.
pub trait SpreadsheetReader: Send + Sync {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError>;
}

/// `.xlsx`/`.xls` reader backed by calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReader;

impl SpreadsheetReader for XlsxReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
        let mut workbook = open_workbook_auto(path).map_err(|source| SheetError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SheetError::NoSheets(path.to_path_buf()))?
            .map_err(|source| SheetError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(rows_from_a1(&range))
    }
}

/// Rows of `range` positioned from A1: blank leading rows and columns that
/// calamine leaves out of the used range are restored as empty cells.
fn rows_from_a1(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row as usize];
    rows.extend(range.rows().map(|row| {
        let mut cells = row_to_strings(row);
        if !cells.is_empty() {
            cells.splice(0..0, std::iter::repeat_n(String::new(), first_col as usize));
        }
        cells
    }));
    rows
}

fn row_to_strings(row: &[Data]) -> Vec<String> {
    let mut cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

/// Count checkable accounts in an input sheet.
///
/// Skips the header row and counts rows whose 2nd and 3rd cells (username and
/// password) are both filled in.
pub fn count_accounts(reader: &dyn SpreadsheetReader, path: &Path) -> Result<usize, SheetError> {
    let rows = reader.read_rows(path)?;
    let count = rows
        .iter()
        .skip(1)
        .filter(|row| row.len() >= 3 && !row[1].is_empty() && !row[2].is_empty())
        .count();

    info!("Counted {} valid accounts in {}", count, path.display());
    Ok(count)
}

/// Number of rows below the header, regardless of content.
pub fn count_data_rows(reader: &dyn SpreadsheetReader, path: &Path) -> Result<usize, SheetError> {
    let rows = reader.read_rows(path)?;
    Ok(rows.len().saturating_sub(1))
}

/// Read the account records from a result spreadsheet.
pub fn read_accounts(
    reader: &dyn SpreadsheetReader,
    path: &Path,
    kind: ResultKind,
) -> Result<Vec<Account>, SheetError> {
    let rows = reader.read_rows(path)?;
    let accounts = match kind {
        ResultKind::Success => parse_success_rows(&rows),
        ResultKind::Fail => parse_fail_rows(&rows),
    };

    debug!(
        "Read {} {} accounts from {}",
        accounts.len(),
        kind,
        path.display()
    );
    Ok(accounts)
}

/// Parse success rows, skipping the header and any row with too few cells.
pub fn parse_success_rows(rows: &[Vec<String>]) -> Vec<Account> {
    rows.iter()
        .skip(1)
        .filter(|row| row.len() >= SUCCESS_ROW_CELLS)
        .map(|row| {
            Account::succeeded(
                row[0].clone(),
                parse_decimal(&row[1]),
                parse_decimal(&row[2]),
                row[3].clone(),
            )
        })
        .collect()
}

/// Parse fail rows, skipping the header and any row with too few cells.
pub fn parse_fail_rows(rows: &[Vec<String>]) -> Vec<Account> {
    rows.iter()
        .skip(1)
        .filter(|row| row.len() >= FAIL_ROW_CELLS)
        .map(|row| Account::failed(row[0].clone(), row[1].clone(), row[2].clone()))
        .collect()
}

/// Parse a money cell such as `1,234.50`. Anything unparsable is zero.
pub fn parse_decimal(cell: &str) -> f64 {
    cell.replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
