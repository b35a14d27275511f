//! VCF file access
//!
//! [`FileIndex`] maps the columns of the `#CHROM` header line to their
//! positions; [`VcfReader`] turns every data line into a [`Record`] keyed by
//! those column names.
//!
//! [`Record`]: adn_common::Record

pub mod reader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use reader::VcfReader;

pub const CHROM_COL_NAME: &str = "#CHROM";
pub const FILTER_COL_NAME: &str = "FILTER";
pub const INFO_COL_NAME: &str = "INFO";
pub const FORMAT_COL_NAME: &str = "FORMAT";

#[derive(Error, Debug)]
pub enum VcfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no {CHROM_COL_NAME} header line found")]
    MissingHeader,

    #[error("line {line} has {found} columns, header defines {expected}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Column positions of a VCF header line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndex {
    pub by_name: BTreeMap<String, usize>,
    pub by_index: BTreeMap<usize, String>,
}

impl FileIndex {
    /// Build from a tab-separated `#CHROM` header line
    pub fn from_header(header_line: &str) -> Self {
        let mut index = Self::default();

        for (idx, name) in header_line.trim_end().split('\t').enumerate() {
            index.by_name.insert(name.to_string(), idx);
            index.by_index.insert(idx, name.to_string());
        }

        index
    }

    pub fn get_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_index(&self, idx: usize) -> Option<&str> {
        self.by_index.get(&idx).map(String::as_str)
    }

    /// Column names in file order
    pub fn headers(&self) -> Vec<String> {
        self.by_index.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        let index = FileIndex::from_header("#CHROM\tPOS\tID\tREF\tALT\n");

        assert_eq!(index.len(), 5);
        assert_eq!(index.get_by_name("#CHROM"), Some(0));
        assert_eq!(index.get_by_name("ALT"), Some(4));
        assert_eq!(index.get_by_index(1), Some("POS"));
        assert_eq!(index.get_by_index(9), None);
        assert_eq!(index.headers(), vec!["#CHROM", "POS", "ID", "REF", "ALT"]);
    }

    #[test]
    fn test_serializes_headers_by_name() {
        let index = FileIndex::from_header("#CHROM\tPOS");
        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(value["by_name"]["POS"], 1);
        assert_eq!(value["by_index"]["0"], "#CHROM");
    }
}
