// src/lib.rs
pub mod aggregate;
pub mod alignment;
pub mod best_hit;
pub mod binning;
pub mod composition;
pub mod config;
pub mod error;
pub mod external;
pub mod fastq;
pub mod focus_report;
pub mod kmer_profile;
pub mod nnls;
pub mod normalize;
pub mod reference;
pub mod report;
pub mod results;
pub mod sample;
pub mod subsystems;
pub mod types;

use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::{aggregate_level, denominators, HierarchyLevel, LevelRow};
use crate::alignment::AlignmentReader;
use crate::binning::BinningRecords;
use crate::composition::{solve_composition, Composition};
use crate::config::{FocusConfig, SuperFocusConfig};
use crate::error::{FocusError, Result};
use crate::external::{Aligner, AlignmentParams, KmerCounter};
use crate::fastq::{discover_queries, subsample_reads};
use crate::focus_report::build_focus_report;
use crate::kmer_profile::{build_profile, read_kmer_counts, KmerCounts};
use crate::nnls::LeastSquaresSolver;
use crate::reference::ReferenceMatrix;
use crate::report::{function_header, level_header, render_binning, render_level_table, RunInfo};
use crate::results::ResultsMatrix;
use crate::sample::{merge_sample, parse_alignments, SampleResult};
use crate::subsystems::SubsystemTranslation;
use crate::types::{LevelReport, SUBSYSTEM_LEVELS};

const RULE: &str = "--------------------------------------------------------------------------------";

/// Outcome of one composition (FOCUS) run.
/// Structured data only; text is generated on demand.
#[derive(Debug)]
pub struct FocusResults {
    pub query: PathBuf,
    pub k: usize,
    pub minimum_abundance: f64,
    /// Taxonomy label of every reference organism, parallel to `composition.weights`.
    pub labels: Vec<String>,
    pub composition: Composition,
    /// Kingdom through Species.
    pub level_reports: Vec<LevelReport>,
}

impl FocusResults {
    /// Tab-separated report written next to the query.
    pub fn get_tabular_output(&self) -> String {
        let mut output = String::new();
        writeln!(output, "Query: {}", self.query.display()).unwrap();
        writeln!(output, "K-mer size: {}\n", self.k).unwrap();

        for report in &self.level_reports {
            writeln!(output, "{} Level", report.level.name()).unwrap();
            output.push_str("Rank\tPredicted Organism\tEstimated Abundance (%)\n");
            for row in &report.rows {
                let rank = row.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
                writeln!(output, "{}\t{}\t{}", rank, row.label, row.pct).unwrap();
            }
            output.push('\n');
        }
        output
    }

    /// Human-readable ranking per level for the terminal.
    pub fn get_console_report(&self) -> String {
        let mut output = String::new();
        for report in &self.level_reports {
            writeln!(output, "{RULE}\n{:^80}\n{RULE}", format!("{} Level", report.level.name())).unwrap();
            writeln!(output, "Rank\t\tPredicted Organism\t\tEstimated Abundance (%)\n{RULE}").unwrap();
            for row in &report.rows {
                let rank = row.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
                writeln!(output, "{}\t\t{}\t\t{:.4}", rank, row.label, row.pct).unwrap();
            }
            writeln!(output, "{RULE}").unwrap();
        }
        output
    }
}

/// Composition estimate from already-counted k-mers.
pub fn estimate_composition<S: LeastSquaresSolver + ?Sized>(
    reference: &ReferenceMatrix,
    counts: &KmerCounts,
    query: &Path,
    k: usize,
    minimum_abundance: f64,
    solver: &S,
) -> Result<FocusResults> {
    if let Some(kmer) = reference.kmers().iter().find(|kmer| kmer.len() != k) {
        return Err(FocusError::invalid_input(
            "reference vocabulary",
            format!("k-mer '{kmer}' does not have length {k}"),
        ));
    }

    let profile = build_profile(reference.kmers(), counts, &query.display().to_string())?;
    log::info!("Running FOCUS on {}", query.display());
    let composition = solve_composition(reference, &profile, solver).map_err(|e| match e {
        FocusError::SolverFailure(message) => {
            FocusError::SolverFailure(format!("composition of {}: {message}", query.display()))
        }
        other => other,
    })?;
    let level_reports = build_focus_report(reference, &composition, minimum_abundance);

    Ok(FocusResults {
        query: query.to_path_buf(),
        k,
        minimum_abundance,
        labels: reference.labels().to_vec(),
        composition,
        level_reports,
    })
}

/// Count, load, solve, and report for one query.
///
/// The counter's dump is removed once it has been read.
pub fn run_focus<C, S>(config: &FocusConfig, counter: &C, solver: &S) -> Result<FocusResults>
where
    C: KmerCounter + ?Sized,
    S: LeastSquaresSolver + ?Sized,
{
    config.validate()?;

    log::info!("Counting {}-mers for {}", config.k, config.query.display());
    let dump = counter.count(&config.query, config.k)?;
    let counts = read_kmer_counts(&dump)?;
    if let Err(e) = fs::remove_file(&dump) {
        log::debug!("Could not remove {}: {}", dump.display(), e);
    }
    log::info!("Finished counting: {} distinct k-mers", counts.len());

    let reference = ReferenceMatrix::from_path(&config.reference)?;
    estimate_composition(
        &reference,
        &counts,
        &config.query,
        config.k,
        config.minimum_abundance,
        solver,
    )
}

/// Outcome of one multi-sample alignment aggregation (SUPER-FOCUS) run.
pub struct SuperFocusResults {
    pub info: RunInfo,
    /// Sample names in column order.
    pub samples: Vec<String>,
    /// Leaf-level counts, one column per sample.
    pub results: ResultsMatrix,
    /// Column sums of `results`, shared by every level's percentages.
    pub denominators: Vec<f64>,
    pub binning: BinningRecords,
    /// Samples that contributed nothing, with the reason.
    pub failed_samples: Vec<(String, String)>,
}

impl SuperFocusResults {
    fn new(info: RunInfo, samples: Vec<String>, results: ResultsMatrix, binning: BinningRecords) -> Self {
        let denominators = denominators(&results);
        Self {
            info,
            samples,
            results,
            denominators,
            binning,
            failed_samples: Vec::new(),
        }
    }

    pub fn level_rows(&self, level: HierarchyLevel) -> Vec<LevelRow> {
        aggregate_level(&self.results, level, &self.denominators)
    }

    /// Table for subsystem level 1, 2, or 3.
    pub fn get_level_table(&self, level: usize) -> Result<String> {
        if !(1..=SUBSYSTEM_LEVELS).contains(&level) {
            return Err(FocusError::Configuration(format!(
                "subsystem level must be between 1 and {SUBSYSTEM_LEVELS} (got {level})"
            )));
        }
        let rows = self.level_rows(HierarchyLevel::Subsystem(level - 1));
        Ok(render_level_table(&self.info, &level_header(level, &self.samples), &rows))
    }

    /// Table keyed by the full `level1..level3 + function` label.
    pub fn get_function_table(&self) -> String {
        let rows = self.level_rows(HierarchyLevel::Function);
        render_level_table(&self.info, &function_header(&self.samples), &rows)
    }

    pub fn get_binning_text(&self) -> String {
        render_binning(&self.info, &self.binning)
    }
}

fn sample_name(query: &Path) -> String {
    query
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| query.display().to_string())
}

/// Subsample (optionally), align, and parse one sample.
fn process_sample<A: Aligner + ?Sized>(
    query: &Path,
    sample_index: usize,
    num_samples: usize,
    config: &SuperFocusConfig,
    aligner: &A,
    params: &AlignmentParams,
    translation: &SubsystemTranslation,
) -> Result<SampleResult> {
    let sample = sample_name(query);
    let aligned_query = match config.subsample {
        Some(n) => subsample_reads(query, &params.temp_directory, n)?,
        None => query.to_path_buf(),
    };

    log::info!("Aligning sequences in {} to DB_{} using {}", sample, params.database_id, aligner.kind());
    let alignment = aligner.align(&aligned_query, params)?;

    log::info!("Parsing alignments for {}", sample);
    let reader = AlignmentReader::open(&alignment, aligner.kind(), &sample)?;
    let result = parse_alignments(reader, sample_index, num_samples, &sample, config, translation)?;

    if config.delete_alignments && alignment.exists() {
        if let Err(e) = fs::remove_file(&alignment) {
            log::warn!("Could not delete {}: {}", alignment.display(), e);
        }
    }
    Ok(result)
}

/// Align every query and aggregate best hits into one multi-sample table.
///
/// A sample whose aligner fails or whose table is malformed is logged,
/// listed in `failed_samples`, and leaves its column at zero.
pub fn run_superfocus<A: Aligner + ?Sized>(
    config: &SuperFocusConfig,
    aligner: &A,
) -> Result<SuperFocusResults> {
    config.validate()?;
    if aligner.kind() != config.aligner {
        log::warn!(
            "Configured aligner is {} but the supplied aligner is {}",
            config.aligner,
            aligner.kind()
        );
    }

    let translation = SubsystemTranslation::from_path(config.translation_path())?;
    let queries = discover_queries(&config.queries)?;
    let samples: Vec<String> = queries.iter().map(|q| sample_name(q)).collect();

    fs::create_dir_all(&config.output_directory)
        .map_err(|e| FocusError::io(&config.output_directory, e))?;
    let temp_base = config.temp_directory.clone().unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&temp_base).map_err(|e| FocusError::io(&temp_base, e))?;
    let scratch = tempfile::Builder::new()
        .prefix("superfocus")
        .tempdir_in(&temp_base)
        .map_err(|e| FocusError::io(&temp_base, e))?;
    log::info!("Using {} as the temporary directory", scratch.path().display());

    let params = AlignmentParams::from_config(config, scratch.path());
    let mut results = ResultsMatrix::new(queries.len());
    let mut binning = BinningRecords::default();
    let mut failed_samples = Vec::new();

    for (index, query) in queries.iter().enumerate() {
        log::info!("1.{}) Working on: {}", index + 1, query.display());
        match process_sample(query, index, queries.len(), config, aligner, &params, &translation) {
            Ok(sample) => merge_sample(&mut results, &mut binning, sample),
            Err(e) => {
                log::error!("Sample {} skipped: {}", samples[index], e);
                failed_samples.push((samples[index].clone(), e.to_string()));
            }
        }
    }

    let info = RunInfo {
        query: config
            .queries
            .iter()
            .map(|q| q.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        database: params.database_id.clone(),
        aligner: aligner.kind().to_string(),
    };
    let mut output = SuperFocusResults::new(info, samples, results, binning);
    output.failed_samples = failed_samples;
    Ok(output)
}
