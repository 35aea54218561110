use std::io::BufRead;

use crate::alignment::AlignmentReader;
use crate::best_hit::{BestHitSelector, FinishedRead};
use crate::binning::{BinningRecords, SampleBinning};
use crate::config::SuperFocusConfig;
use crate::error::Result;
use crate::results::ResultsMatrix;
use crate::subsystems::SubsystemTranslation;

/// What one sample's alignment table contributed, kept apart from the
/// batch totals until the whole file parsed cleanly.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub sample_index: usize,
    pub matrix: ResultsMatrix,
    pub binning: SampleBinning,
    /// Distinct reads seen in the table.
    pub reads: usize,
    /// Reads with at least one qualifying best hit.
    pub classified_reads: usize,
    pub unknown_subsystems: usize,
}

impl SampleResult {
    fn new(sample_index: usize, num_samples: usize, sample: &str) -> Self {
        Self {
            sample_index,
            matrix: ResultsMatrix::new(num_samples),
            binning: SampleBinning::new(sample),
            reads: 0,
            classified_reads: 0,
            unknown_subsystems: 0,
        }
    }

    fn add_read(&mut self, read: FinishedRead, config: &SuperFocusConfig) {
        self.reads += 1;
        if read.labels.is_empty() {
            return;
        }
        self.classified_reads += 1;
        self.matrix
            .add_read(self.sample_index, &read.labels, config.normalise_output);
        if config.collect_binning {
            self.binning.push_read(&read.read_id, read.entries);
        }
    }
}

/// Run best-hit selection over one sample's hits.
///
/// Any malformed line aborts this sample; nothing reaches the batch totals
/// unless the whole table parsed.
pub fn parse_alignments<R: BufRead>(
    reader: AlignmentReader<R>,
    sample_index: usize,
    num_samples: usize,
    sample: &str,
    config: &SuperFocusConfig,
    translation: &SubsystemTranslation,
) -> Result<SampleResult> {
    let mut result = SampleResult::new(sample_index, num_samples, sample);
    let mut selector = BestHitSelector::new(config.filter, translation);

    for hit in reader {
        let hit = hit?;
        if let Some(read) = selector.push(&hit) {
            result.add_read(read, config);
        }
    }
    // last group of reads
    if let Some(read) = selector.flush() {
        result.add_read(read, config);
    }

    result.unknown_subsystems = selector.unknown_subsystems();
    if result.unknown_subsystems > 0 {
        log::warn!(
            "{}: {} best hits point at subsystems missing from the translation table",
            sample,
            result.unknown_subsystems
        );
    }
    log::info!(
        "{}: {} of {} reads classified",
        sample,
        result.classified_reads,
        result.reads
    );
    Ok(result)
}

/// Fold a finished sample into the batch totals.
pub fn merge_sample(
    results: &mut ResultsMatrix,
    binning: &mut BinningRecords,
    sample: SampleResult,
) {
    results.merge(sample.matrix);
    if !sample.binning.is_empty() {
        binning.push(sample.binning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlignerKind;
    use std::io::Cursor;

    fn translation() -> SubsystemTranslation {
        [
            ("1".to_string(), "A\tB\tC".to_string()),
            ("2".to_string(), "D\tE\tF".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn line(read: &str, pk: &str, function: &str, identity: f64, evalue: &str) -> String {
        format!("{read}\tfig__{pk}__x__{function}\t{identity}\t30\t0\t0\t1\t90\t1\t30\t{evalue}\t50\n")
    }

    fn reader(text: String) -> AlignmentReader<Cursor<String>> {
        AlignmentReader::new(Cursor::new(text), AlignerKind::Diamond, "test").unwrap()
    }

    #[test]
    fn test_sample_counts_and_binning() {
        let text = [
            line("R1", "1", "f1", 70.0, "1e-10"),
            line("R1", "2", "f2", 65.0, "1e-10"),
            line("R1", "1", "f3", 90.0, "1e-5"),
            line("R2", "1", "f1", 99.0, "1e-20"),
            line("R3", "1", "f1", 10.0, "1e-20"),
        ]
        .concat();
        let config = SuperFocusConfig::default();
        let result = parse_alignments(reader(text), 1, 2, "s2", &config, &translation()).unwrap();

        assert_eq!(result.reads, 3);
        assert_eq!(result.classified_reads, 2);
        assert_eq!(result.matrix.get("A\tB\tC\tf1"), Some(&[0.0, 1.5][..]));
        assert_eq!(result.matrix.get("D\tE\tF\tf2"), Some(&[0.0, 0.5][..]));
        assert_eq!(result.matrix.get("A\tB\tC\tf3"), None);
        assert_eq!(result.binning.len(), 2);
    }

    #[test]
    fn test_without_normalisation_or_binning() {
        let text = [
            line("R1", "1", "f1", 70.0, "1e-10"),
            line("R1", "2", "f2", 65.0, "1e-10"),
        ]
        .concat();
        let config = SuperFocusConfig {
            normalise_output: false,
            collect_binning: false,
            ..SuperFocusConfig::default()
        };
        let result = parse_alignments(reader(text), 0, 1, "s1", &config, &translation()).unwrap();
        assert_eq!(result.matrix.get("A\tB\tC\tf1"), Some(&[1.0][..]));
        assert_eq!(result.matrix.get("D\tE\tF\tf2"), Some(&[1.0][..]));
        assert!(result.binning.is_empty());
    }

    #[test]
    fn test_malformed_sample_leaves_totals_untouched() {
        let text = format!("{}not a hit\n", line("R1", "1", "f1", 70.0, "1e-10"));
        let config = SuperFocusConfig::default();
        let mut totals = ResultsMatrix::new(1);
        let mut binning = BinningRecords::default();

        let parsed = parse_alignments(reader(text), 0, 1, "s1", &config, &translation());
        assert!(parsed.is_err());
        if let Ok(sample) = parsed {
            merge_sample(&mut totals, &mut binning, sample);
        }
        assert!(totals.is_empty());
        assert!(binning.samples.is_empty());
    }

    #[test]
    fn test_two_samples_merge_by_position() {
        let config = SuperFocusConfig::default();
        let table = translation();
        let mut totals = ResultsMatrix::new(2);
        let mut binning = BinningRecords::default();

        // Second sample processed first.
        let s2 = parse_alignments(reader(line("R9", "2", "f2", 80.0, "1e-3")), 1, 2, "s2", &config, &table).unwrap();
        merge_sample(&mut totals, &mut binning, s2);
        let s1 = parse_alignments(reader(line("R1", "2", "f2", 80.0, "1e-3")), 0, 2, "s1", &config, &table).unwrap();
        merge_sample(&mut totals, &mut binning, s1);

        assert_eq!(totals.get("D\tE\tF\tf2"), Some(&[1.0, 1.0][..]));
        assert_eq!(binning.samples.len(), 2);
    }
}
