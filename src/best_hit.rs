// src/best_hit.rs

use crate::alignment::HitRecord;
use crate::config::HitFilter;
use crate::subsystems::SubsystemTranslation;
use crate::types::BinningEntry;

/// Everything the selector kept for one read once its group closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinishedRead {
    pub read_id: String,
    /// Distinct classification labels tied at the best e-value, in first-seen order.
    pub labels: Vec<String>,
    /// Every qualifying hit, for the binning output.
    pub entries: Vec<BinningEntry>,
}

#[derive(Debug)]
struct ReadGroup {
    read_id: String,
    best_evalue: f64,
    pending: FinishedRead,
}

/// Streaming best-hit selection over hits grouped by read.
///
/// Hits for one read must be contiguous and the first hit of each read must
/// carry that read's lowest e-value (best-hit-first aligner output). A hit
/// is kept when it passes the identity and length thresholds and its
/// e-value equals the read's best one exactly.
pub struct BestHitSelector<'a> {
    filter: HitFilter,
    translation: &'a SubsystemTranslation,
    current: Option<ReadGroup>,
    unknown_subsystems: usize,
}

impl<'a> BestHitSelector<'a> {
    pub fn new(filter: HitFilter, translation: &'a SubsystemTranslation) -> Self {
        Self {
            filter,
            translation,
            current: None,
            unknown_subsystems: 0,
        }
    }

    /// Feed one hit. Returns the previous read when this hit starts a new one.
    pub fn push(&mut self, hit: &HitRecord) -> Option<FinishedRead> {
        let same_read = matches!(&self.current, Some(group) if group.read_id == hit.read_id);
        let flushed = if same_read {
            None
        } else {
            // Sorted input: the first hit of a read carries its best e-value.
            let previous = self.flush();
            self.current = Some(ReadGroup {
                read_id: hit.read_id.clone(),
                best_evalue: hit.evalue,
                pending: FinishedRead {
                    read_id: hit.read_id.clone(),
                    ..FinishedRead::default()
                },
            });
            previous
        };

        if self.accepts(hit) {
            match hit.classification(self.translation) {
                Some(label) => {
                    if let Some(group) = self.current.as_mut() {
                        group.pending.entries.push(BinningEntry {
                            identity: hit.identity,
                            alignment_length: hit.alignment_length,
                            evalue: hit.evalue,
                            evalue_text: hit.evalue_text.clone(),
                            label: label.clone(),
                        });
                        if !group.pending.labels.contains(&label) {
                            group.pending.labels.push(label);
                        }
                    }
                }
                None => self.unknown_subsystems += 1,
            }
        }

        flushed
    }

    fn accepts(&self, hit: &HitRecord) -> bool {
        let best = match &self.current {
            Some(group) => group.best_evalue,
            None => return false,
        };
        hit.identity >= self.filter.minimum_identity
            && hit.alignment_length >= self.filter.minimum_alignment
            && hit.evalue == best
    }

    /// Close the current read group, if any.
    pub fn flush(&mut self) -> Option<FinishedRead> {
        self.current.take().map(|group| group.pending)
    }

    /// Best hits whose subsystem key was not in the translation table.
    pub fn unknown_subsystems(&self) -> usize {
        self.unknown_subsystems
    }
}
