//src/reference.rs

use std::io::BufRead;
use std::path::Path;

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{FocusError, Result};
use crate::fastq::open_text;
use crate::normalize::normalize;
use crate::types::TAXONOMY_FIELDS;

/// Reference organism profiles for one k.
///
/// The file is tab-separated:
/// ```text
/// <8 taxonomy columns>\t<kmer_1>\t<kmer_2>...      (header)
/// Kingdom\t...\tStrain\t<count_1>\t<count_2>...    (one row per organism)
/// ```
/// Every organism's counts are normalized to sum to 1 and stored as a
/// column, giving a `kmers x organisms` design matrix.
#[derive(Debug, Clone)]
pub struct ReferenceMatrix {
    kmers: Vec<String>,
    labels: Vec<String>,
    matrix: Array2<f64>,
}

impl ReferenceMatrix {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading reference {}", path.display());
        let reader = open_text(path)?;
        Self::from_reader(reader, &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line.map_err(|e| FocusError::io(source, e))?,
            None => return Err(FocusError::invalid_input(source, "reference is empty")),
        };
        let kmers = parse_vocabulary(&header, source)?;

        // Keep line numbers for error messages; the header is line 1.
        let mut raw_rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line.map_err(|e| FocusError::io(source, e))?;
            if line.trim().is_empty() {
                continue;
            }
            raw_rows.push((idx + 2, line));
        }
        if raw_rows.is_empty() {
            return Err(FocusError::invalid_input(source, "reference has no organisms"));
        }

        let rows: Vec<(String, Vec<f64>)> = raw_rows
            .par_iter()
            .map(|(line_no, line)| parse_row(line, kmers.len(), source, *line_no))
            .collect::<Result<_>>()?;

        let n_kmers = kmers.len();
        let n_orgs = rows.len();
        let matrix = Array2::from_shape_fn((n_kmers, n_orgs), |(i, j)| rows[j].1[i]);
        let labels = rows.into_iter().map(|(label, _)| label).collect();

        log::info!("Reference was loaded with {} genomes over {} k-mers", n_orgs, n_kmers);
        Ok(Self {
            kmers,
            labels,
            matrix,
        })
    }

    /// K-mer vocabulary in column order.
    pub fn kmers(&self) -> &[String] {
        &self.kmers
    }

    /// Tab-joined 8-field taxonomy labels, one per organism.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// `kmers x organisms`, each column summing to 1.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn num_organisms(&self) -> usize {
        self.labels.len()
    }

    /// Taxonomy field `level` (0 = Kingdom) of organism `organism`.
    pub fn label_field(&self, organism: usize, level: usize) -> &str {
        self.labels[organism].split('\t').nth(level).unwrap_or("")
    }
}

/// K-mer vocabulary from the header: columns 9 onward.
pub fn parse_vocabulary(header: &str, source: &str) -> Result<Vec<String>> {
    let fields: Vec<&str> = header.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() <= TAXONOMY_FIELDS {
        return Err(FocusError::invalid_input(
            source,
            format!(
                "header has {} columns; expected {} taxonomy columns followed by k-mers",
                fields.len(),
                TAXONOMY_FIELDS
            ),
        ));
    }
    Ok(fields[TAXONOMY_FIELDS..].iter().map(|s| s.to_string()).collect())
}

fn parse_row(line: &str, n_kmers: usize, source: &str, line_no: usize) -> Result<(String, Vec<f64>)> {
    let context = format!("{source} line {line_no}");
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != TAXONOMY_FIELDS + n_kmers {
        return Err(FocusError::invalid_input(
            context,
            format!(
                "expected {} columns, found {}",
                TAXONOMY_FIELDS + n_kmers,
                fields.len()
            ),
        ));
    }

    let label = fields[..TAXONOMY_FIELDS].join("\t");
    let mut counts = Vec::with_capacity(n_kmers);
    for raw in &fields[TAXONOMY_FIELDS..] {
        let count: u64 = raw.trim().parse().map_err(|_| {
            FocusError::invalid_input(context.clone(), format!("'{raw}' is not a k-mer count"))
        })?;
        counts.push(count as f64);
    }
    let normalized = normalize(&counts, &context)?;
    Ok((label, normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TAX_HEADER: &str = "Kingdom\tPhylum\tClass\tOrder\tFamily\tGenus\tSpecies\tStrain";

    fn reference_text(rows: &[&str]) -> String {
        let mut text = format!("{TAX_HEADER}\tAAAA\tAAAC\tAAAG\tAAAT\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_load_two_organisms() {
        let text = reference_text(&[
            "Bacteria\tP1\tC1\tO1\tF1\tG1\tS1\tT1\t1\t1\t0\t0",
            "Bacteria\tP2\tC2\tO2\tF2\tG2\tS2\tT2\t0\t0\t3\t3",
        ]);
        let reference = ReferenceMatrix::from_reader(Cursor::new(text), "test").unwrap();

        assert_eq!(reference.kmers(), &["AAAA", "AAAC", "AAAG", "AAAT"]);
        assert_eq!(reference.num_organisms(), 2);
        assert_eq!(reference.matrix().shape(), &[4, 2]);
        assert_eq!(reference.matrix()[[0, 0]], 0.5);
        assert_eq!(reference.matrix()[[2, 1]], 0.5);
        for col in reference.matrix().columns() {
            assert!((col.sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(reference.label_field(1, 1), "P2");
        assert_eq!(reference.label_field(0, 6), "S1");
    }

    #[test]
    fn test_duplicate_labels_are_kept() {
        let row = "Bacteria\tP\tC\tO\tF\tG\tS\tT\t1\t2\t3\t4";
        let text = reference_text(&[row, row]);
        let reference = ReferenceMatrix::from_reader(Cursor::new(text), "test").unwrap();
        assert_eq!(reference.num_organisms(), 2);
    }

    #[test]
    fn test_wrong_column_count() {
        let text = reference_text(&["Bacteria\tP\tC\tO\tF\tG\tS\tT\t1\t2\t3"]);
        let err = ReferenceMatrix::from_reader(Cursor::new(text), "ref").unwrap_err();
        match err {
            FocusError::InvalidInput { context, .. } => assert_eq!(context, "ref line 2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_row_and_bad_count() {
        let text = reference_text(&["Bacteria\tP\tC\tO\tF\tG\tS\tT\t0\t0\t0\t0"]);
        assert!(ReferenceMatrix::from_reader(Cursor::new(text), "ref").is_err());

        let text = reference_text(&["Bacteria\tP\tC\tO\tF\tG\tS\tT\t1\tx\t0\t0"]);
        assert!(ReferenceMatrix::from_reader(Cursor::new(text), "ref").is_err());
    }

    #[test]
    fn test_header_without_kmers() {
        let err = ReferenceMatrix::from_reader(Cursor::new(format!("{TAX_HEADER}\n")), "ref");
        assert!(matches!(err, Err(FocusError::InvalidInput { .. })));
        assert!(ReferenceMatrix::from_reader(Cursor::new(""), "ref").is_err());
    }
}
