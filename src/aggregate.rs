// src/aggregate.rs

use crate::results::ResultsMatrix;

/// Where in the classification hierarchy to roll counts up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyLevel {
    /// One of the three coarse subsystem levels, 0-based.
    Subsystem(usize),
    /// The full `level1\tlevel2\tlevel3\tfunction` label.
    Function,
}

impl HierarchyLevel {
    pub const SUBSYSTEMS: [HierarchyLevel; 3] = [
        HierarchyLevel::Subsystem(0),
        HierarchyLevel::Subsystem(1),
        HierarchyLevel::Subsystem(2),
    ];

    /// Aggregation key of `label` at this level.
    pub fn key<'a>(&self, label: &'a str) -> &'a str {
        match self {
            HierarchyLevel::Subsystem(position) => label.split('\t').nth(*position).unwrap_or(""),
            HierarchyLevel::Function => label,
        }
    }
}

/// Relative-abundance denominators: column sums of the leaf matrix.
///
/// Computed once so every level's percentages share the same basis.
pub fn denominators(results: &ResultsMatrix) -> Vec<f64> {
    results.column_sums()
}

/// Sum rows sharing the same key at `level`.
pub fn aggregate_counts(results: &ResultsMatrix, level: HierarchyLevel) -> ResultsMatrix {
    let mut aggregated = ResultsMatrix::new(results.num_samples());
    for (label, counts) in results.iter() {
        let key = level.key(label);
        for (sample_index, &count) in counts.iter().enumerate() {
            aggregated.add(key, sample_index, count);
        }
    }
    aggregated
}

/// `count / denominator * 100` per column; a zero denominator yields 0.
pub fn relative_abundance(counts: &[f64], denominators: &[f64]) -> Vec<f64> {
    counts
        .iter()
        .zip(denominators)
        .map(|(&count, &denominator)| {
            if denominator != 0.0 {
                count / denominator * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// One output line: raw counts followed by relative abundances.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRow {
    pub label: String,
    pub counts: Vec<f64>,
    pub relative: Vec<f64>,
}

impl LevelRow {
    /// Counts and percentages concatenated, as written to the report.
    pub fn values(&self) -> Vec<f64> {
        self.counts.iter().chain(&self.relative).copied().collect()
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }
}

/// Aggregate to `level` and attach relative abundances; rows sorted by label.
pub fn aggregate_level(
    results: &ResultsMatrix,
    level: HierarchyLevel,
    denominators: &[f64],
) -> Vec<LevelRow> {
    let aggregated = aggregate_counts(results, level);
    aggregated
        .sorted_labels()
        .into_iter()
        .filter_map(|label| {
            aggregated.get(label).map(|counts| LevelRow {
                label: label.clone(),
                counts: counts.to_vec(),
                relative: relative_abundance(counts, denominators),
            })
        })
        .collect()
}
