//src/types.rs

/// Fixed taxonomy depth of a reference row label (Kingdom .. Strain).
pub const TAXONOMY_FIELDS: usize = 8;

/// Number of coarse subsystem levels in front of the function name.
pub const SUBSYSTEM_LEVELS: usize = 3;

/// Taxonomy levels reported by the composition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaxonomyLevel {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl TaxonomyLevel {
    pub const ALL: [TaxonomyLevel; 7] = [
        TaxonomyLevel::Kingdom,
        TaxonomyLevel::Phylum,
        TaxonomyLevel::Class,
        TaxonomyLevel::Order,
        TaxonomyLevel::Family,
        TaxonomyLevel::Genus,
        TaxonomyLevel::Species,
    ];

    /// Column of this level inside the 8-field taxonomy label.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TaxonomyLevel::Kingdom => "Kingdom",
            TaxonomyLevel::Phylum => "Phylum",
            TaxonomyLevel::Class => "Class",
            TaxonomyLevel::Order => "Order",
            TaxonomyLevel::Family => "Family",
            TaxonomyLevel::Genus => "Genus",
            TaxonomyLevel::Species => "Species",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One ranked row of a per-level composition report.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusReportRow {
    /// 1-based position; `None` for the synthetic "Others" bucket.
    pub rank: Option<usize>,
    pub label: String,
    /// Estimated abundance in percent (weight * 100).
    pub pct: f64,
}

/// The ranked report for a single taxonomy level.
#[derive(Debug, Clone)]
pub struct LevelReport {
    pub level: TaxonomyLevel,
    pub rows: Vec<FocusReportRow>,
}

/// One qualifying best hit kept for the per-read binning output.
#[derive(Debug, Clone, PartialEq)]
pub struct BinningEntry {
    pub identity: f64,
    pub alignment_length: f64,
    pub evalue: f64,
    /// E-value exactly as the aligner printed it.
    pub evalue_text: String,
    /// Tab-joined `level1\tlevel2\tlevel3\tfunction`.
    pub label: String,
}
