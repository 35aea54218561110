// src/focus_report.rs

use ahash::AHashMap;
use std::cmp::Ordering;

use crate::composition::Composition;
use crate::reference::ReferenceMatrix;
use crate::types::{FocusReportRow, LevelReport, TaxonomyLevel};

/// Sum organism weights per distinct label at `level`, as percentages.
///
/// The result is ordered by descending percentage, ties broken by label so
/// the output never depends on hash iteration order.
pub fn abundance_by_label(
    reference: &ReferenceMatrix,
    composition: &Composition,
    level: TaxonomyLevel,
) -> Vec<(f64, String)> {
    let mut totals: AHashMap<&str, f64> = AHashMap::new();
    for (organism, &weight) in composition.weights.iter().enumerate() {
        let label = reference.label_field(organism, level.index());
        *totals.entry(label).or_insert(0.0) += weight;
    }

    let mut ranked: Vec<(f64, String)> = totals
        .into_iter()
        .map(|(label, weight)| (weight * 100.0, label.to_string()))
        .collect();
    ranked.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });
    ranked
}

/// Label of the synthetic row collecting everything below the cutoff.
pub fn others_label(minimum_abundance: f64) -> String {
    format!("Others (abundance < {minimum_abundance}%)")
}

/// Ranked report for one level with the minimum-abundance cutoff applied.
pub fn build_level_report(
    reference: &ReferenceMatrix,
    composition: &Composition,
    level: TaxonomyLevel,
    minimum_abundance: f64,
) -> LevelReport {
    if composition.degenerate {
        return LevelReport {
            level,
            rows: Vec::new(),
        };
    }
    let ranked = abundance_by_label(reference, composition, level);

    let mut rows = Vec::new();
    let mut others = 0.0;
    for (pct, label) in ranked {
        if pct >= minimum_abundance {
            rows.push(FocusReportRow {
                rank: Some(rows.len() + 1),
                label,
                pct,
            });
        } else {
            others += pct;
        }
    }

    if minimum_abundance > 0.0 && others > 0.0 {
        rows.push(FocusReportRow {
            rank: None,
            label: others_label(minimum_abundance),
            pct: others,
        });
    }

    LevelReport { level, rows }
}

/// Reports for Kingdom through Species.
pub fn build_focus_report(
    reference: &ReferenceMatrix,
    composition: &Composition,
    minimum_abundance: f64,
) -> Vec<LevelReport> {
    TaxonomyLevel::ALL
        .iter()
        .map(|&level| build_level_report(reference, composition, level, minimum_abundance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reference() -> ReferenceMatrix {
        let text = "K\tP\tC\tO\tF\tG\tS\tT\tAA\tAC\n\
                    Bacteria\tFirmicutes\tC1\tO1\tF1\tG1\tS1\tT1\t1\t0\n\
                    Bacteria\tProteobacteria\tC2\tO2\tF2\tG2\tS2\tT2\t1\t0\n\
                    Bacteria\tFirmicutes\tC3\tO3\tF3\tG3\tS3\tT3\t0\t1\n\
                    Archaea\tEuryarchaeota\tC4\tO4\tF4\tG4\tS4\tT4\t0\t1\n";
        ReferenceMatrix::from_reader(Cursor::new(text), "test").unwrap()
    }

    fn composition(weights: &[f64]) -> Composition {
        Composition {
            weights: weights.to_vec(),
            degenerate: false,
        }
    }

    #[test]
    fn test_degenerate_composition_reports_nothing() {
        let degenerate = Composition {
            weights: vec![0.0; 4],
            degenerate: true,
        };
        for cutoff in [0.0, 1.0] {
            let report = build_level_report(&reference(), &degenerate, TaxonomyLevel::Species, cutoff);
            assert!(report.rows.is_empty());
        }
    }

    #[test]
    fn test_weights_are_summed_per_label() {
        let ranked = abundance_by_label(
            &reference(),
            &composition(&[0.2, 0.3, 0.4, 0.1]),
            TaxonomyLevel::Phylum,
        );
        assert_eq!(ranked[0].1, "Firmicutes");
        assert!((ranked[0].0 - 60.0).abs() < 1e-9);
        assert_eq!(ranked[1].1, "Proteobacteria");
        assert_eq!(ranked[2].1, "Euryarchaeota");
    }

    #[test]
    fn test_ties_sorted_by_label() {
        let ranked = abundance_by_label(
            &reference(),
            &composition(&[0.25, 0.25, 0.25, 0.25]),
            TaxonomyLevel::Species,
        );
        let labels: Vec<&str> = ranked.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn test_cutoff_buckets_others() {
        let report = build_level_report(
            &reference(),
            &composition(&[0.7, 0.25, 0.04, 0.01]),
            TaxonomyLevel::Species,
            10.0,
        );
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].rank, Some(1));
        assert_eq!(report.rows[0].label, "S1");
        assert_eq!(report.rows[1].rank, Some(2));
        let others = &report.rows[2];
        assert_eq!(others.rank, None);
        assert_eq!(others.label, "Others (abundance < 10%)");
        assert!((others.pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_others_with_zero_threshold() {
        let report = build_level_report(
            &reference(),
            &composition(&[0.7, 0.25, 0.04, 0.01]),
            TaxonomyLevel::Species,
            0.0,
        );
        assert_eq!(report.rows.len(), 4);
        assert!(report.rows.iter().all(|r| r.rank.is_some()));
    }

    #[test]
    fn test_full_report_has_every_level() {
        let reports = build_focus_report(&reference(), &composition(&[0.25; 4]), 1.0);
        assert_eq!(reports.len(), 7);
        assert_eq!(reports[0].level, TaxonomyLevel::Kingdom);
        assert_eq!(reports[0].rows[0].label, "Bacteria");
        assert!((reports[0].rows[0].pct - 75.0).abs() < 1e-9);
    }
}
