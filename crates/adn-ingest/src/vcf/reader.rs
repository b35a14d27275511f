//! Streaming VCF reader
//!
//! Accepts plain text and gzip/bgzip input (bgzip files are concatenated gzip
//! members, hence `MultiGzDecoder`). Compression is detected from the magic
//! bytes, not the file name.

use adn_common::Record;
use flate2::read::MultiGzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use super::{FileIndex, VcfError, CHROM_COL_NAME};
use crate::source::{RecordSource, SourceRecord};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Yields one record per data line, with a one-line lookahead so the final
/// record is flagged as last.
pub struct VcfReader {
    lines: Box<dyn BufRead + Send>,
    index: FileIndex,
    line_number: usize,
    lookahead: Option<(usize, String)>,
}

impl std::fmt::Debug for VcfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcfReader")
            .field("index", &self.index)
            .field("line_number", &self.line_number)
            .finish_non_exhaustive()
    }
}

impl VcfReader {
    /// Open a VCF file, reading up to and including the `#CHROM` header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path)?);
        let compressed = file.fill_buf()?.starts_with(&GZIP_MAGIC);

        debug!(path = %path.display(), compressed, "Opening VCF file");

        let lines: Box<dyn BufRead + Send> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(file)
        };

        Self::from_reader(lines)
    }

    /// Read VCF text from any buffered reader
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Result<Self, VcfError> {
        let mut vcf = Self {
            lines: Box::new(reader),
            index: FileIndex::default(),
            line_number: 0,
            lookahead: None,
        };

        let mut header = None;
        while let Some(line) = vcf.read_line()? {
            if line.starts_with(CHROM_COL_NAME) {
                header = Some(line);
            } else if !line.starts_with('#') {
                vcf.lookahead = Some((vcf.line_number, line));
                break;
            }
        }

        vcf.index = FileIndex::from_header(&header.ok_or(VcfError::MissingHeader)?);
        Ok(vcf)
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn headers(&self) -> Vec<String> {
        self.index.headers()
    }

    /// Next non-blank line without its line terminator
    fn read_line(&mut self) -> Result<Option<String>, VcfError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.lines.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = buf.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    fn parse_line(&self, line_number: usize, line: &str) -> Result<Record, VcfError> {
        let mut record = Record::new();

        for (col, value) in line.trim().split('\t').enumerate() {
            let name = self
                .index
                .get_by_index(col)
                .ok_or_else(|| VcfError::ColumnCount {
                    line: line_number,
                    expected: self.index.len(),
                    found: line.trim().split('\t').count(),
                })?;
            record.insert(name.to_string(), Value::String(value.to_string()));
        }

        Ok(record)
    }
}

impl RecordSource for VcfReader {
    type Error = VcfError;

    fn next_record(&mut self) -> Result<Option<SourceRecord>, VcfError> {
        let Some((line_number, line)) = self.lookahead.take() else {
            return Ok(None);
        };

        let record = self.parse_line(line_number, &line)?;

        let next = self.read_line()?;
        self.lookahead = next.map(|l| (self.line_number, l));

        Ok(Some(SourceRecord {
            record,
            is_last: self.lookahead.is_none(),
        }))
    }
}

impl Iterator for VcfReader {
    type Item = Result<SourceRecord, VcfError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
