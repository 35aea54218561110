use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;

use crate::error::{FocusError, Result};
use crate::fastq::open_text;
use crate::normalize::{counts_to_f64, normalize};

/// Raw k-mer -> count mapping produced by the external counter.
pub type KmerCounts = AHashMap<String, u64>;

/// Parse counter output in `jellyfish dump -c` form (`<kmer> <count>` per line).
pub fn parse_kmer_counts<R: BufRead>(reader: R, source: &str) -> Result<KmerCounts> {
    let mut counts = KmerCounts::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| FocusError::io(source, e))?;
        let mut parts = line.split_whitespace();
        let (kmer, raw_count) = match (parts.next(), parts.next()) {
            (None, _) => continue,
            (Some(kmer), Some(count)) => (kmer, count),
            (Some(_), None) => {
                return Err(FocusError::invalid_input(
                    format!("{source} line {}", idx + 1),
                    "expected '<kmer> <count>'",
                ))
            }
        };
        let count: u64 = raw_count.parse().map_err(|_| {
            FocusError::invalid_input(
                format!("{source} line {}", idx + 1),
                format!("'{raw_count}' is not a count"),
            )
        })?;
        *counts.entry(kmer.to_string()).or_insert(0) += count;
    }
    Ok(counts)
}

pub fn read_kmer_counts<P: AsRef<Path>>(path: P) -> Result<KmerCounts> {
    let path = path.as_ref();
    parse_kmer_counts(open_text(path)?, &path.display().to_string())
}

/// Re-project raw counts onto the reference vocabulary order; absent k-mers are 0.
pub fn project_counts(vocabulary: &[String], counts: &KmerCounts) -> Vec<u64> {
    let projected: Vec<u64> = vocabulary
        .iter()
        .map(|kmer| counts.get(kmer).copied().unwrap_or(0))
        .collect();

    let matched = vocabulary.iter().filter(|kmer| counts.contains_key(*kmer)).count();
    let unknown = counts.len().saturating_sub(matched);
    if unknown > 0 {
        log::debug!("{unknown} counted k-mers are not in the reference vocabulary");
    }
    projected
}

/// Normalized query profile in reference column order.
pub fn build_profile(vocabulary: &[String], counts: &KmerCounts, query: &str) -> Result<Vec<f64>> {
    let projected = project_counts(vocabulary, counts);
    normalize(&counts_to_f64(&projected), &format!("query profile for {query}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn vocab() -> Vec<String> {
        ["AAAA", "AAAC", "AAAG", "AAAT"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_dump() {
        let counts = parse_kmer_counts(Cursor::new("AAAA 3\n\nAAAT\t5\nAAAA 1\n"), "dump").unwrap();
        assert_eq!(counts.get("AAAA"), Some(&4));
        assert_eq!(counts.get("AAAT"), Some(&5));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_parse_dump_malformed() {
        assert!(parse_kmer_counts(Cursor::new("AAAA\n"), "dump").is_err());
        assert!(parse_kmer_counts(Cursor::new("AAAA x\n"), "dump").is_err());
    }

    #[test]
    fn test_project_fills_missing_with_zero() {
        let mut counts = KmerCounts::new();
        counts.insert("AAAT".to_string(), 2);
        counts.insert("AAAA".to_string(), 6);
        counts.insert("CCCC".to_string(), 9);
        assert_eq!(project_counts(&vocab(), &counts), vec![6, 0, 0, 2]);
    }

    #[test]
    fn test_build_profile_normalizes() {
        let mut counts = KmerCounts::new();
        for kmer in vocab() {
            counts.insert(kmer, 1);
        }
        let profile = build_profile(&vocab(), &counts, "q").unwrap();
        assert_eq!(profile, vec![0.25; 4]);
    }

    #[test]
    fn test_build_profile_without_overlap_is_invalid() {
        let mut counts = KmerCounts::new();
        counts.insert("GGGG".to_string(), 10);
        assert!(matches!(
            build_profile(&vocab(), &counts, "q"),
            Err(FocusError::InvalidInput { .. })
        ));
    }
}
