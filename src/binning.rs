// src/binning.rs

use crate::types::BinningEntry;

/// Per-read best hits of one sample, in read order.
#[derive(Debug, Clone, Default)]
pub struct SampleBinning {
    pub sample: String,
    pub reads: Vec<(String, Vec<BinningEntry>)>,
}

impl SampleBinning {
    pub fn new(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            reads: Vec::new(),
        }
    }

    /// Record a read's qualifying hits; consecutive duplicates are collapsed.
    pub fn push_read(&mut self, read_id: &str, mut entries: Vec<BinningEntry>) {
        if entries.is_empty() {
            return;
        }
        entries.dedup();
        self.reads.push((read_id.to_string(), entries));
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

/// Binning for every sample of a batch, in batch order.
#[derive(Debug, Clone, Default)]
pub struct BinningRecords {
    pub samples: Vec<SampleBinning>,
}

impl BinningRecords {
    pub fn push(&mut self, sample: SampleBinning) {
        self.samples.push(sample);
    }

    /// Flattened `(sample, read, entry)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, &BinningEntry)> {
        self.samples.iter().flat_map(|sample| {
            sample.reads.iter().flat_map(move |(read, entries)| {
                entries
                    .iter()
                    .map(move |entry| (sample.sample.as_str(), read.as_str(), entry))
            })
        })
    }
}
