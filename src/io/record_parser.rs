//! Record parser for raw multi-line input
//!
//! Splits operator input on line boundaries, trims each line and drops the
//! ones left empty. The surviving lines are kept in input order and are never
//! inspected for structure.

use crate::types::{Record, RunnerError};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Split raw text into an ordered list of records
///
/// Handles `\n` and `\r\n` line endings. Returns an empty vector when nothing
/// but whitespace was supplied; see [`parse_non_empty`] for the variant that
/// rejects that case.
pub fn parse_records(raw: &str) -> Vec<Record> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Record::from)
        .collect()
}

/// Split raw text into records, rejecting input without any
///
/// # Returns
///
/// * `Ok(Vec<Record>)` - At least one record, in input order
/// * `Err(RunnerError::NoRecords)` - The input held only blank lines
pub fn parse_non_empty(raw: &str) -> Result<Vec<Record>, RunnerError> {
    let records = parse_records(raw);
    if records.is_empty() {
        return Err(RunnerError::NoRecords);
    }
    Ok(records)
}

/// Read an entire async source and parse it into records
///
/// Used by the binary for both file and stdin input.
pub async fn read_records<R: AsyncRead + Unpin>(mut reader: R) -> Result<Vec<Record>, RunnerError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw).await?;
    parse_non_empty(&raw)
}
