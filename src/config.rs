// src/config.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{FocusError, Result};

/// Supported k-mer sizes of the composition reference.
pub const VALID_K: [usize; 3] = [6, 7, 8];

/// Supported clustered protein database identities.
pub const VALID_DATABASES: [&str; 4] = ["DB_90", "DB_95", "DB_98", "DB_100"];

/// Aligners whose tabular output the selector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignerKind {
    Rapsearch,
    Diamond,
    Blast,
    Mmseqs,
}

impl AlignerKind {
    /// Non-data lines at the top of the aligner's tabular output.
    pub fn preamble_lines(self) -> usize {
        match self {
            AlignerKind::Rapsearch => 5,
            _ => 0,
        }
    }

    /// MMseqs2 reports identity as a 0..1 fraction.
    pub fn reports_fractional_identity(self) -> bool {
        matches!(self, AlignerKind::Mmseqs)
    }

    /// Directory name under `db/static/` holding this aligner's database.
    pub fn database_dir(self) -> &'static str {
        match self {
            AlignerKind::Rapsearch => "rapsearch2",
            AlignerKind::Diamond => "diamond",
            AlignerKind::Blast => "blast",
            AlignerKind::Mmseqs => "mmseqs2",
        }
    }
}

impl fmt::Display for AlignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignerKind::Rapsearch => "rapsearch",
            AlignerKind::Diamond => "diamond",
            AlignerKind::Blast => "blast",
            AlignerKind::Mmseqs => "mmseqs",
        };
        f.write_str(name)
    }
}

impl FromStr for AlignerKind {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rapsearch" | "rapsearch2" => Ok(AlignerKind::Rapsearch),
            "diamond" => Ok(AlignerKind::Diamond),
            "blast" => Ok(AlignerKind::Blast),
            "mmseqs" | "mmseqs2" => Ok(AlignerKind::Mmseqs),
            other => Err(FocusError::Configuration(format!(
                "{other} is not a valid aligner; choose among diamond, blast, rapsearch, or mmseqs2"
            ))),
        }
    }
}

/// Parameters for one composition (FOCUS) run.
#[derive(Debug, Clone)]
pub struct FocusConfig {
    pub query: PathBuf,
    /// Tab-separated reference table for the chosen `k`.
    pub reference: PathBuf,
    pub k: usize,
    /// Minimum abundance (percent) for a label to be reported on its own.
    pub minimum_abundance: f64,
}

impl FocusConfig {
    pub fn validate(&self) -> Result<()> {
        if !VALID_K.contains(&self.k) {
            return Err(FocusError::Configuration(format!(
                "k has to be 6, 7, or 8 (got {})",
                self.k
            )));
        }
        if !self.minimum_abundance.is_finite() || self.minimum_abundance < 0.0 {
            return Err(FocusError::Configuration(format!(
                "minimum abundance must be a non-negative number (got {})",
                self.minimum_abundance
            )));
        }
        if !self.reference.is_file() {
            return Err(FocusError::Configuration(format!(
                "reference {} does not exist",
                self.reference.display()
            )));
        }
        Ok(())
    }
}

/// Thresholds the best-hit selector applies to every hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitFilter {
    /// Minimum percent identity.
    pub minimum_identity: f64,
    /// Minimum alignment length (amino acids).
    pub minimum_alignment: f64,
}

impl Default for HitFilter {
    fn default() -> Self {
        Self {
            minimum_identity: 60.0,
            minimum_alignment: 15.0,
        }
    }
}

/// Parameters for one multi-sample alignment aggregation (SUPER-FOCUS) run.
#[derive(Debug, Clone)]
pub struct SuperFocusConfig {
    pub queries: Vec<PathBuf>,
    pub output_directory: PathBuf,
    pub output_prefix: String,
    /// Root holding `db/static/<aligner>/` and `db/database_PKs.txt`.
    pub database_directory: PathBuf,
    pub database: String,
    pub aligner: AlignerKind,
    pub filter: HitFilter,
    pub evalue: f64,
    pub threads: usize,
    pub fast_mode: bool,
    pub amino_acid: bool,
    /// Split a read's credit equally across its distinct best-hit labels.
    pub normalise_output: bool,
    pub collect_binning: bool,
    pub delete_alignments: bool,
    pub subsample: Option<usize>,
    pub temp_directory: Option<PathBuf>,
}

impl Default for SuperFocusConfig {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            output_directory: PathBuf::from("."),
            output_prefix: "output_".to_string(),
            database_directory: PathBuf::from("."),
            database: "DB_90".to_string(),
            aligner: AlignerKind::Rapsearch,
            filter: HitFilter::default(),
            evalue: 0.00001,
            threads: 4,
            fast_mode: true,
            amino_acid: false,
            normalise_output: true,
            collect_binning: true,
            delete_alignments: false,
            subsample: None,
            temp_directory: None,
        }
    }
}

impl SuperFocusConfig {
    pub fn translation_path(&self) -> PathBuf {
        self.database_directory.join("db").join("database_PKs.txt")
    }

    pub fn validate(&self) -> Result<()> {
        if self.queries.is_empty() {
            return Err(FocusError::Configuration("no query files given".to_string()));
        }
        check_non_negative("minimum identity", self.filter.minimum_identity)?;
        check_non_negative("minimum alignment", self.filter.minimum_alignment)?;
        check_non_negative("e-value", self.evalue)?;
        if self.threads == 0 {
            return Err(FocusError::Configuration(
                "threads must be at least 1".to_string(),
            ));
        }
        if !VALID_DATABASES.contains(&self.database.as_str()) {
            return Err(FocusError::Configuration(format!(
                "database {} not valid; choose DB_90, DB_95, DB_98, or DB_100",
                self.database
            )));
        }
        let translation = self.translation_path();
        if !translation.is_file() {
            return Err(FocusError::Configuration(format!(
                "subsystem translation {} does not exist",
                translation.display()
            )));
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FocusError::Configuration(format!(
            "{name} must be a non-negative number (got {value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_aligner_names() {
        assert_eq!("mmseqs2".parse::<AlignerKind>().unwrap(), AlignerKind::Mmseqs);
        assert_eq!("DIAMOND".parse::<AlignerKind>().unwrap(), AlignerKind::Diamond);
        assert!(matches!(
            "bowtie".parse::<AlignerKind>(),
            Err(FocusError::Configuration(_))
        ));
        assert_eq!(AlignerKind::Rapsearch.preamble_lines(), 5);
        assert_eq!(AlignerKind::Diamond.preamble_lines(), 0);
    }

    #[test]
    fn test_focus_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("k6");
        fs::write(&reference, "header\n").unwrap();

        let mut config = FocusConfig {
            query: dir.path().join("q.fasta"),
            reference,
            k: 6,
            minimum_abundance: 1.0,
        };
        assert!(config.validate().is_ok());

        config.k = 5;
        assert!(config.validate().is_err());
        config.k = 7;
        config.minimum_abundance = -1.0;
        assert!(config.validate().is_err());
        config.minimum_abundance = 0.0;
        config.reference = dir.path().join("missing");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_superfocus_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("db")).unwrap();
        fs::write(dir.path().join("db").join("database_PKs.txt"), "pk\tl1\tl2\tl3\n").unwrap();

        let mut config = SuperFocusConfig {
            queries: vec![dir.path().join("a.fasta")],
            database_directory: dir.path().to_path_buf(),
            ..SuperFocusConfig::default()
        };
        assert!(config.validate().is_ok());

        config.filter.minimum_identity = -5.0;
        assert!(matches!(config.validate(), Err(FocusError::Configuration(_))));
        config.filter.minimum_identity = 60.0;

        config.database = "DB_50".to_string();
        assert!(config.validate().is_err());
        config.database = "DB_98".to_string();

        config.threads = 0;
        assert!(config.validate().is_err());
        config.threads = 2;

        config.database_directory = dir.path().join("nowhere");
        assert!(config.validate().is_err());
    }
}
