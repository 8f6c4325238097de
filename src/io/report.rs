//! CSV report of session results
//!
//! Writes result entries with columns:
//! `sequence_id, record, gateway, status, response, admitted_at, completed_at, charged`.
//! Entries are sorted by sequence id for deterministic output, whatever order
//! they completed in.

use crate::types::{ResultEntry, RunnerError, SequenceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Timestamp layout used in reports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names, written even when there are no rows
pub const REPORT_HEADER: [&str; 8] = [
    "sequence_id",
    "record",
    "gateway",
    "status",
    "response",
    "admitted_at",
    "completed_at",
    "charged",
];

/// One output row
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    sequence_id: SequenceId,
    record: &'a str,
    gateway: &'a str,
    status: &'static str,
    response: &'a str,
    admitted_at: String,
    completed_at: String,
    charged: bool,
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

impl<'a> From<&'a ResultEntry> for ReportRow<'a> {
    fn from(entry: &'a ResultEntry) -> Self {
        ReportRow {
            sequence_id: entry.sequence_id,
            record: entry.record.as_str(),
            gateway: &entry.gateway,
            status: entry.status.label(),
            response: &entry.response,
            admitted_at: format_timestamp(&entry.admitted_at),
            completed_at: entry
                .completed_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            charged: entry.charged,
        }
    }
}

/// Write result entries to CSV format
///
/// # Arguments
///
/// * `entries` - Entries to write, typically a filtered snapshot
/// * `output` - Writer receiving the CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(RunnerError::ReportError)` if serialization or the writer failed
pub fn write_results_csv(entries: &[ResultEntry], output: &mut dyn Write) -> Result<(), RunnerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    // Write header
    writer
        .write_record(REPORT_HEADER)
        .map_err(|e| RunnerError::ReportError {
            message: format!("Failed to write CSV header: {}", e),
        })?;

    let mut sorted: Vec<&ResultEntry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.sequence_id);

    for entry in sorted {
        writer.serialize(ReportRow::from(entry))?;
    }

    writer.flush().map_err(|e| RunnerError::ReportError {
        message: format!("Failed to flush CSV output: {}", e),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryStatus, Record};
    use chrono::TimeZone;

    fn entry(id: SequenceId, status: EntryStatus, response: &str) -> ResultEntry {
        let mut entry = ResultEntry::admitted(id, Record::from(format!("rec-{}", id).as_str()), "Gateway");
        entry.admitted_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        entry.status = status;
        entry.response = response.to_string();
        if status.is_final() {
            entry.completed_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap());
        }
        entry
    }

    #[test]
    fn test_write_results_csv_header_and_rows() {
        let entries = vec![
            entry(1, EntryStatus::Declined, "CARD_DECLINED"),
            entry(2, EntryStatus::Processing, "Processing..."),
        ];
        let mut output = Vec::new();

        write_results_csv(&entries, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "sequence_id,record,gateway,status,response,admitted_at,completed_at,charged"
        );
        assert_eq!(
            lines[1],
            "1,rec-1,Gateway,DECLINED,CARD_DECLINED,2024-05-01 12:00:00,2024-05-01 12:00:03,false"
        );
        assert_eq!(
            lines[2],
            "2,rec-2,Gateway,PROCESSING,Processing...,2024-05-01 12:00:00,,false"
        );
    }

    #[test]
    fn test_write_results_csv_sorts_by_sequence_id() {
        let entries = vec![
            entry(3, EntryStatus::Declined, "DECLINED"),
            entry(1, EntryStatus::Declined, "DECLINED"),
            entry(2, EntryStatus::Approved, "Order confirmed"),
        ];
        let mut output = Vec::new();

        write_results_csv(&entries, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let ids: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_write_results_csv_quotes_commas_in_records() {
        let mut e = entry(1, EntryStatus::Declined, "DECLINED");
        e.record = Record::from("a,b");
        let mut output = Vec::new();

        write_results_csv(&[e], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"a,b\""));
    }

    #[test]
    fn test_write_results_csv_empty_still_has_header() {
        let mut output = Vec::new();
        write_results_csv(&[], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "sequence_id,record,gateway,status,response,admitted_at,completed_at,charged\n"
        );
    }
}
