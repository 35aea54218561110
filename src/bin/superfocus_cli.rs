use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use superfocus_rs::config::{AlignerKind, FocusConfig, HitFilter, SuperFocusConfig};
use superfocus_rs::error::{FocusError, Result};
use superfocus_rs::external::{CommandAligner, JellyfishCounter};
use superfocus_rs::nnls::LawsonHanson;
use superfocus_rs::{run_focus, run_superfocus};

#[derive(Parser, Debug)]
#[command(name = "superfocus-rs", version, about = "Taxonomic and functional profiling of metagenomes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate taxonomic composition from k-mer frequencies
    Focus(FocusArgs),
    /// Profile subsystems from protein alignments of one or more samples
    Superfocus(SuperFocusArgs),
}

#[derive(Args, Debug)]
struct FocusArgs {
    /// Query FASTA/FASTQ file
    #[arg(short, long)]
    query: PathBuf,
    /// Directory holding the k-mer reference tables (`k6`, `k7`, `k8`)
    #[arg(short, long)]
    reference_directory: PathBuf,
    /// K-mer size
    #[arg(short, long, default_value_t = 6)]
    k: usize,
    /// Minimum relative abundance (%) to report an organism on its own
    #[arg(short, long, default_value_t = 1.0)]
    minimum_abundance: f64,
    /// Jellyfish threads
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
    /// Output directory (defaults to the query's directory)
    #[arg(short, long)]
    output_directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SuperFocusArgs {
    /// Query files or directories
    #[arg(short, long, num_args = 1.., required = true)]
    query: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long)]
    output_directory: PathBuf,
    /// Output file prefix
    #[arg(short = 'p', long, default_value = "output_")]
    output_prefix: String,
    /// Directory holding `db/`
    #[arg(short = 'b', long)]
    database_directory: PathBuf,
    /// Database identity: DB_90, DB_95, DB_98, or DB_100
    #[arg(short = 'd', long, default_value = "DB_90")]
    database: String,
    /// rapsearch, diamond, blast, or mmseqs
    #[arg(short, long, default_value = "rapsearch")]
    aligner: AlignerKind,
    #[arg(long, default_value_t = 60.0)]
    minimum_identity: f64,
    #[arg(long, default_value_t = 15.0)]
    minimum_alignment: f64,
    #[arg(short, long, default_value_t = 0.00001)]
    evalue: f64,
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
    /// Use the aligner's sensitive mode
    #[arg(long)]
    sensitive: bool,
    /// Queries are protein sequences
    #[arg(long)]
    amino_acid: bool,
    /// Count every best-hit label of a read fully instead of splitting it
    #[arg(long)]
    no_normalise: bool,
    /// Skip writing the per-read binning table
    #[arg(long)]
    no_binning: bool,
    /// Delete alignment tables once parsed
    #[arg(long)]
    delete_alignments: bool,
    /// Only align the first N reads of each sample
    #[arg(long)]
    subsample: Option<usize>,
    #[arg(long)]
    temp_directory: Option<PathBuf>,
}

fn spinner(color: &str, message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{color}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner
}

fn write_output(path: &Path, contents: String) -> Result<()> {
    fs::write(path, contents).map_err(|e| FocusError::io(path, e))
}

fn focus(args: FocusArgs) -> Result<()> {
    let output_directory = args
        .output_directory
        .clone()
        .or_else(|| args.query.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_directory).map_err(|e| FocusError::io(&output_directory, e))?;

    let config = FocusConfig {
        reference: args.reference_directory.join(format!("k{}", args.k)),
        query: args.query,
        k: args.k,
        minimum_abundance: args.minimum_abundance,
    };
    let counter = JellyfishCounter {
        threads: args.threads,
        work_directory: output_directory.clone(),
    };

    let sp = spinner("green", "Estimating composition...");
    let results = run_focus(&config, &counter, &LawsonHanson::default())?;
    sp.finish_with_message("Composition estimated.");

    println!("{}", results.get_console_report());

    let name = config
        .query
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "query".to_string());
    let output = output_directory.join(format!("{name}__FOCUS_output.txt"));
    write_output(&output, results.get_tabular_output())?;
    log::info!("Results written to {}", output.display());
    Ok(())
}

fn superfocus(args: SuperFocusArgs) -> Result<()> {
    let config = SuperFocusConfig {
        queries: args.query,
        output_directory: args.output_directory,
        output_prefix: args.output_prefix,
        database_directory: args.database_directory,
        database: args.database,
        aligner: args.aligner,
        filter: HitFilter {
            minimum_identity: args.minimum_identity,
            minimum_alignment: args.minimum_alignment,
        },
        evalue: args.evalue,
        threads: args.threads,
        fast_mode: !args.sensitive,
        amino_acid: args.amino_acid,
        normalise_output: !args.no_normalise,
        collect_binning: !args.no_binning,
        delete_alignments: args.delete_alignments,
        subsample: args.subsample,
        temp_directory: args.temp_directory,
    };

    let sp = spinner("blue", "Aligning and parsing samples...");
    let results = run_superfocus(&config, &CommandAligner::new(config.aligner))?;
    sp.finish_with_message(format!("Processed {} sample(s).", results.samples.len()));
    for (sample, reason) in &results.failed_samples {
        log::warn!("{} contributed no counts: {}", sample, reason);
    }

    let sp = spinner("yellow", "Writing output files...");
    let out = &config.output_directory;
    let prefix = &config.output_prefix;
    for level in 1..=3 {
        write_output(
            &out.join(format!("{prefix}subsystem_level_{level}.xls")),
            results.get_level_table(level)?,
        )?;
    }
    write_output(
        &out.join(format!("{prefix}all_levels_and_function.xls")),
        results.get_function_table(),
    )?;
    if config.collect_binning {
        write_output(&out.join(format!("{prefix}binning.xls")), results.get_binning_text())?;
    }
    sp.finish_with_message("Output files created.");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Focus(args) => focus(args),
        Command::Superfocus(args) => superfocus(args),
    };

    match outcome {
        Ok(()) => {
            spinner("cyan", "All done!").finish_with_message("All done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
