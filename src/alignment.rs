//! Tabular aligner output (BLAST outfmt 6 style).
//!
//! # Columns used
//! ```text
//! Col  Description
//! 0    Read (query) identifier
//! 1    Target identifier: `<...>__<subsystem pk>__<...>__<function name>`
//! 2    Identity (percent; MMseqs2 reports a 0..1 fraction)
//! 3    Alignment length
//! 10   E-value
//! ```
//! RAPSearch2 writes a fixed preamble of comment lines which is skipped.

use std::io::BufRead;
use std::path::Path;

use crate::config::AlignerKind;
use crate::error::{FocusError, Result};
use crate::fastq::open_text;
use crate::subsystems::SubsystemTranslation;

/// Minimum number of tab-separated columns in a hit line.
pub const MIN_HIT_FIELDS: usize = 11;

/// One candidate alignment of a read against the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    pub read_id: String,
    pub target: String,
    /// Percent identity, already rescaled for fractional aligners.
    pub identity: f64,
    pub alignment_length: f64,
    pub evalue: f64,
    /// The e-value column verbatim, for output.
    pub evalue_text: String,
}

impl HitRecord {
    /// Parses one hit line, applying the aligner's identity convention.
    pub fn parse_line(line: &str, aligner: AlignerKind) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < MIN_HIT_FIELDS {
            return Err(format!(
                "expected at least {MIN_HIT_FIELDS} columns, found {}",
                fields.len()
            ));
        }

        let mut identity: f64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| format!("invalid identity '{}'", fields[2]))?;
        if aligner.reports_fractional_identity() && (0.0..=1.0).contains(&identity) {
            identity *= 100.0;
        }
        let alignment_length: f64 = fields[3]
            .trim()
            .parse()
            .map_err(|_| format!("invalid alignment length '{}'", fields[3]))?;
        let evalue_text = fields[10].trim().to_string();
        let evalue: f64 = evalue_text
            .parse()
            .map_err(|_| format!("invalid e-value '{}'", fields[10]))?;

        let target = fields[1].to_string();
        if target.split("__").count() < 3 {
            return Err(format!(
                "target '{target}' is not of the form <id>__<subsystem>__..__<function>"
            ));
        }

        Ok(Self {
            read_id: fields[0].to_string(),
            target,
            identity,
            alignment_length,
            evalue,
            evalue_text,
        })
    }

    /// Subsystem primary key encoded in the target identifier.
    pub fn subsystem_pk(&self) -> &str {
        self.target.split("__").nth(1).unwrap_or("")
    }

    /// Function name: the last `__` field of the target identifier.
    pub fn function_name(&self) -> &str {
        self.target
            .rsplit("__")
            .next()
            .unwrap_or("")
            .trim_end_matches(['\r', '\n'])
    }

    /// `level1\tlevel2\tlevel3\tfunction`, or `None` for an unknown subsystem.
    pub fn classification(&self, translation: &SubsystemTranslation) -> Option<String> {
        translation
            .get(self.subsystem_pk())
            .map(|levels| format!("{levels}\t{}", self.function_name()))
    }
}

/// Streams `HitRecord`s out of one alignment table.
pub struct AlignmentReader<R: BufRead> {
    reader: R,
    aligner: AlignerKind,
    source: String,
    line_no: usize,
    line: String,
}

impl AlignmentReader<Box<dyn BufRead>> {
    /// Opens an alignment file (optionally gzipped).
    ///
    /// A missing or empty file means the aligner produced nothing, which is
    /// reported as an `ExternalToolFailure` for the sample.
    pub fn open<P: AsRef<Path>>(path: P, aligner: AlignerKind, sample: &str) -> Result<Self> {
        let path = path.as_ref();
        let empty = match std::fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if empty {
            return Err(FocusError::ExternalToolFailure {
                tool: aligner.to_string(),
                sample: sample.to_string(),
                message: format!("alignment {} is missing or empty", path.display()),
            });
        }
        AlignmentReader::new(open_text(path)?, aligner, &path.display().to_string())
    }
}

impl<R: BufRead> AlignmentReader<R> {
    pub fn new(reader: R, aligner: AlignerKind, source: &str) -> Result<Self> {
        let mut this = Self {
            reader,
            aligner,
            source: source.to_string(),
            line_no: 0,
            line: String::new(),
        };
        for _ in 0..aligner.preamble_lines() {
            if !this.next_line()? {
                break;
            }
        }
        Ok(this)
    }

    fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| FocusError::io(&self.source, e))?;
        self.line_no += 1;
        Ok(n > 0)
    }

    /// Next hit, or `None` at end of input. Blank lines are skipped.
    pub fn read_next(&mut self) -> Result<Option<HitRecord>> {
        loop {
            if !self.next_line()? {
                return Ok(None);
            }
            if self.line.trim().is_empty() {
                continue;
            }
            return HitRecord::parse_line(&self.line, self.aligner)
                .map(Some)
                .map_err(|message| {
                    FocusError::invalid_input(format!("{} line {}", self.source, self.line_no), message)
                });
        }
    }
}

impl<R: BufRead> Iterator for AlignmentReader<R> {
    type Item = Result<HitRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
