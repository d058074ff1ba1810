// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Raw CSV tables.
//!
//! Rows are kept as text; numeric parsing is left to the sequence builder so
//! that a bad cell costs one row, not the whole file.

use csv::{ReaderBuilder, Trim};
use std::io::Read;
use std::path::Path;

/// A CSV file held in memory as header names plus text rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV file from disk.
    pub fn from_path(path: &Path) -> Result<Self, csv::Error> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;
        Self::collect(reader)
    }

    /// Read CSV from any reader (headers in the first record).
    pub fn from_reader<R: Read>(input: R) -> Result<Self, csv::Error> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);
        Self::collect(reader)
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_headers_and_rows() {
        let csv = "ts,pos_x,pos_y,pos_z\n1.5, 1,2,3\n2.5,4,5,6\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["ts", "pos_x", "pos_y", "pos_z"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["1.5", "1", "2", "3"]);
    }

    #[test]
    fn test_short_rows_allowed() {
        let csv = "ts,pos_x,pos_y,pos_z\n1.5,1\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let table = Table::from_reader("".as_bytes()).unwrap();
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_header_only() {
        let table = Table::from_reader("ts,pos_x\n".as_bytes()).unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.is_empty());
    }
}
