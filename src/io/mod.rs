//! I/O module
//!
//! Handles record input and report output.
//!
//! # Components
//!
//! - `record_parser` - Raw multi-line text to an ordered record list
//! - `report` - CSV serialization of result entries

pub mod record_parser;
pub mod report;

pub use record_parser::{parse_non_empty, parse_records, read_records};
pub use report::write_results_csv;
