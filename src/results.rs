// src/results.rs

use ahash::AHashMap;

/// Credit each distinct label of one read receives.
///
/// With `normalise` on and more than one label, credit is split equally;
/// otherwise every label gets a full count.
pub fn read_credits(labels: &[String], normalise: bool) -> Vec<(&str, f64)> {
    let credit = if normalise && labels.len() > 1 {
        1.0 / labels.len() as f64
    } else {
        1.0
    };
    labels.iter().map(|label| (label.as_str(), credit)).collect()
}

/// Per-label, per-sample counts for one multi-sample run.
///
/// Every row has exactly `num_samples` columns; column `i` belongs to the
/// sample at position `i` of the batch regardless of processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsMatrix {
    num_samples: usize,
    rows: AHashMap<String, Vec<f64>>,
}

impl ResultsMatrix {
    pub fn new(num_samples: usize) -> Self {
        Self {
            num_samples,
            rows: AHashMap::new(),
        }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&[f64]> {
        self.rows.get(label).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<f64>)> {
        self.rows.iter()
    }

    /// Add `amount` to `label` in column `sample_index`, creating a zero row first if needed.
    pub fn add(&mut self, label: &str, sample_index: usize, amount: f64) {
        assert!(
            sample_index < self.num_samples,
            "sample index {sample_index} out of range for {} samples",
            self.num_samples
        );
        let num_samples = self.num_samples;
        let row = self
            .rows
            .entry(label.to_string())
            .or_insert_with(|| vec![0.0; num_samples]);
        row[sample_index] += amount;
    }

    /// Accumulate one read's qualifying labels into `sample_index`.
    pub fn add_read(&mut self, sample_index: usize, labels: &[String], normalise: bool) {
        for (label, credit) in read_credits(labels, normalise) {
            self.add(label, sample_index, credit);
        }
    }

    /// Fold another matrix of the same batch into this one.
    pub fn merge(&mut self, other: ResultsMatrix) {
        assert_eq!(self.num_samples, other.num_samples, "merging matrices of different batches");
        for (label, counts) in other.rows {
            match self.rows.get_mut(&label) {
                Some(row) => {
                    for (dst, src) in row.iter_mut().zip(counts) {
                        *dst += src;
                    }
                }
                None => {
                    self.rows.insert(label, counts);
                }
            }
        }
    }

    /// Per-sample column sums over every leaf label.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.num_samples];
        for counts in self.rows.values() {
            for (sum, value) in sums.iter_mut().zip(counts) {
                *sum += value;
            }
        }
        sums
    }

    /// Labels in lexical order.
    pub fn sorted_labels(&self) -> Vec<&String> {
        let mut labels: Vec<&String> = self.rows.keys().collect();
        labels.sort();
        labels
    }
}

impl FromIterator<(String, Vec<f64>)> for ResultsMatrix {
    /// Build from explicit rows; the sample count is taken from the widest row.
    fn from_iter<I: IntoIterator<Item = (String, Vec<f64>)>>(iter: I) -> Self {
        let rows: AHashMap<String, Vec<f64>> = iter.into_iter().collect();
        let num_samples = rows.values().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|(label, mut counts)| {
                counts.resize(num_samples, 0.0);
                (label, counts)
            })
            .collect();
        Self { num_samples, rows }
    }
}
