// src/external.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{AlignerKind, SuperFocusConfig};
use crate::error::{FocusError, Result};

/// Counts k-mers of a query and returns a `<kmer> <count>` dump file.
pub trait KmerCounter {
    fn count(&self, query: &Path, k: usize) -> Result<PathBuf>;
}

/// Aligns a query against the protein reference and returns the hit table.
pub trait Aligner {
    fn kind(&self) -> AlignerKind;
    fn align(&self, query: &Path, params: &AlignmentParams) -> Result<PathBuf>;
}

/// Parameters handed to an aligner for one sample.
#[derive(Debug, Clone)]
pub struct AlignmentParams {
    pub database_directory: PathBuf,
    /// Database identity, e.g. `90` for DB_90.
    pub database_id: String,
    pub evalue: f64,
    pub threads: usize,
    pub fast_mode: bool,
    pub amino_acid: bool,
    pub output_directory: PathBuf,
    pub temp_directory: PathBuf,
}

impl AlignmentParams {
    pub fn from_config(config: &SuperFocusConfig, temp_directory: &Path) -> Self {
        Self {
            database_directory: config.database_directory.clone(),
            database_id: config
                .database
                .rsplit('_')
                .next()
                .unwrap_or(config.database.as_str())
                .to_string(),
            evalue: config.evalue,
            threads: config.threads,
            fast_mode: config.fast_mode,
            amino_acid: config.amino_acid,
            output_directory: config.output_directory.clone(),
            temp_directory: temp_directory.to_path_buf(),
        }
    }
}

fn sample_name(query: &Path) -> String {
    query
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| query.display().to_string())
}

/// Run `program args..`, mapping spawn errors and non-zero exits to `ExternalToolFailure`.
fn run_tool(tool: &str, sample: &str, program: &str, args: &[OsString]) -> Result<()> {
    log::debug!("Running {} {:?}", program, args);
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| FocusError::ExternalToolFailure {
            tool: tool.to_string(),
            sample: sample.to_string(),
            message: format!("could not start {program}: {e}"),
        })?;
    if !status.success() {
        return Err(FocusError::ExternalToolFailure {
            tool: tool.to_string(),
            sample: sample.to_string(),
            message: format!("{program} exited with {status}"),
        });
    }
    Ok(())
}

fn ensure_output(tool: &str, sample: &str, path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(FocusError::ExternalToolFailure {
            tool: tool.to_string(),
            sample: sample.to_string(),
            message: format!("expected output {} is missing or empty", path.display()),
        }),
    }
}

/// Jellyfish-backed k-mer counting.
#[derive(Debug, Clone)]
pub struct JellyfishCounter {
    pub threads: usize,
    pub work_directory: PathBuf,
}

impl KmerCounter for JellyfishCounter {
    fn count(&self, query: &Path, k: usize) -> Result<PathBuf> {
        let sample = sample_name(query);
        let table = self.work_directory.join(format!("{sample}_kmer_counting"));
        let dump = self.work_directory.join(format!("{sample}_k{k}_query"));

        let count_args: Vec<OsString> = vec![
            "count".into(),
            "-m".into(),
            k.to_string().into(),
            "-o".into(),
            table.clone().into(),
            "-s".into(),
            "100M".into(),
            "-t".into(),
            self.threads.to_string().into(),
            "-C".into(),
            query.into(),
        ];
        run_tool("jellyfish", &sample, "jellyfish", &count_args)?;

        let dump_args: Vec<OsString> = vec![
            "dump".into(),
            "-c".into(),
            "-o".into(),
            dump.clone().into(),
            table.clone().into(),
        ];
        run_tool("jellyfish", &sample, "jellyfish", &dump_args)?;
        ensure_output("jellyfish", &sample, &dump)?;

        if let Err(e) = std::fs::remove_file(&table) {
            log::debug!("Could not remove {}: {}", table.display(), e);
        }
        Ok(dump)
    }
}

/// Shells out to one of the supported aligners.
#[derive(Debug, Clone, Copy)]
pub struct CommandAligner {
    pub kind: AlignerKind,
}

/// A fully resolved aligner invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignerCommand {
    pub program: String,
    pub args: Vec<OsString>,
    /// Where the tabular hits will be once the program exits.
    pub output: PathBuf,
}

impl CommandAligner {
    pub fn new(kind: AlignerKind) -> Self {
        Self { kind }
    }

    pub fn command(&self, query: &Path, params: &AlignmentParams) -> AlignerCommand {
        let base = params
            .output_directory
            .join(format!("{}_alignments", sample_name(query)));
        let database = params
            .database_directory
            .join("db")
            .join("static")
            .join(self.kind.database_dir())
            .join(format!("{}_clusters.db", params.database_id));
        let blast_mode = if params.amino_acid { "blastp" } else { "blastx" };
        let threads = params.threads.to_string();
        let evalue = params.evalue.to_string();

        match self.kind {
            AlignerKind::Diamond => {
                let output = with_m8(&base);
                let mut args: Vec<OsString> = vec![
                    blast_mode.into(),
                    "-d".into(),
                    database.into(),
                    "-q".into(),
                    query.into(),
                    "-o".into(),
                    output.clone().into(),
                    "-f".into(),
                    "6".into(),
                    "-t".into(),
                    params.temp_directory.clone().into(),
                    "-p".into(),
                    threads.into(),
                    "-e".into(),
                    evalue.into(),
                ];
                if !params.fast_mode {
                    args.push("--sensitive".into());
                }
                AlignerCommand {
                    program: "diamond".to_string(),
                    args,
                    output,
                }
            }
            AlignerKind::Mmseqs => {
                let output = with_m8(&base);
                let mut args: Vec<OsString> = vec![
                    "easy-search".into(),
                    query.into(),
                    database.into(),
                    output.clone().into(),
                    params.temp_directory.clone().into(),
                    "--threads".into(),
                    threads.into(),
                    "-e".into(),
                    evalue.into(),
                ];
                if params.fast_mode {
                    args.extend(["-s".into(), "1.0".into()]);
                }
                AlignerCommand {
                    program: "mmseqs".to_string(),
                    args,
                    output,
                }
            }
            AlignerKind::Rapsearch => {
                // RAPSearch2 appends `.m8` to the name it is given.
                let args: Vec<OsString> = vec![
                    "-a".into(),
                    (if params.fast_mode { "T" } else { "F" }).into(),
                    "-q".into(),
                    query.into(),
                    "-d".into(),
                    database.into(),
                    "-o".into(),
                    base.clone().into(),
                    "-v".into(),
                    "250".into(),
                    "-z".into(),
                    threads.into(),
                    "-e".into(),
                    evalue.into(),
                    "-b".into(),
                    "0".into(),
                    "-s".into(),
                    "f".into(),
                ];
                AlignerCommand {
                    program: "rapsearch".to_string(),
                    args,
                    output: with_m8(&base),
                }
            }
            AlignerKind::Blast => {
                let args: Vec<OsString> = vec![
                    "-db".into(),
                    database.into(),
                    "-query".into(),
                    query.into(),
                    "-out".into(),
                    base.clone().into(),
                    "-outfmt".into(),
                    "6".into(),
                    "-evalue".into(),
                    evalue.into(),
                    "-max_target_seqs".into(),
                    "250".into(),
                    "-num_threads".into(),
                    threads.into(),
                ];
                AlignerCommand {
                    program: blast_mode.to_string(),
                    args,
                    output: base,
                }
            }
        }
    }
}

fn with_m8(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".m8");
    PathBuf::from(name)
}

impl Aligner for CommandAligner {
    fn kind(&self) -> AlignerKind {
        self.kind
    }

    fn align(&self, query: &Path, params: &AlignmentParams) -> Result<PathBuf> {
        let sample = sample_name(query);
        let command = self.command(query, params);
        let tool = self.kind.to_string();
        run_tool(&tool, &sample, &command.program, &command.args)?;
        ensure_output(&tool, &sample, &command.output)?;
        Ok(command.output)
    }
}
