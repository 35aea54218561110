use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::{FocusError, Result};

/// Query extensions accepted when expanding a directory.
const QUERY_EXTENSIONS: [&str; 3] = ["fasta", "fastq", "fna"];

/// Open a text file for line reading, transparently decompressing `.gz`.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| FocusError::io(path, e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

fn is_query_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| QUERY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand files and directories into a sorted list of FASTA/FASTQ queries.
pub fn discover_queries(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut queries = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input).map_err(|e| FocusError::io(input, e))?;
            for entry in entries {
                let path = entry.map_err(|e| FocusError::io(input, e))?.path();
                if path.is_file() {
                    queries.push(path);
                }
            }
        } else if input.is_file() {
            queries.push(input.clone());
        }
    }
    queries.retain(|p| is_query_file(p));
    queries.sort();

    if queries.is_empty() {
        return Err(FocusError::Configuration(format!(
            "no fasta/fna/fastq files found in {:?}",
            inputs
        )));
    }
    Ok(queries)
}

/// Copy the first `number_of_reads` records of `input` into `output_dir`.
///
/// FASTA records are counted by their `>` header lines; FASTQ records are
/// taken four lines at a time.
pub fn subsample_reads(input: &Path, output_dir: &Path, number_of_reads: usize) -> Result<PathBuf> {
    let file_name = input.file_name().ok_or_else(|| {
        FocusError::Configuration(format!("{} has no file name", input.display()))
    })?;
    let output = output_dir.join(file_name);
    if output.exists() {
        return Err(FocusError::Configuration(format!(
            "{} already exists in {}; refusing to overwrite it while subsampling",
            file_name.to_string_lossy(),
            output_dir.display()
        )));
    }

    log::info!(
        "Subsampling {}: keeping {} reads in {}",
        input.display(),
        number_of_reads,
        output.display()
    );

    let is_fasta = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "fna" | "fasta"))
        .unwrap_or(false);

    let mut reader = open_text(input)?;
    let out_file = File::create(&output).map_err(|e| FocusError::io(&output, e))?;
    let mut writer = BufWriter::new(out_file);

    let mut line = String::new();
    let mut seq_counter = 0usize;
    let mut line_counter = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(|e| FocusError::io(input, e))? == 0 {
            break; // EOF
        }
        if is_fasta {
            if line.starts_with('>') {
                seq_counter += 1;
            }
        } else {
            if line_counter == 0 {
                seq_counter += 1;
            }
            line_counter = (line_counter + 1) % 4;
        }
        if seq_counter > number_of_reads {
            break;
        }
        if seq_counter > 0 {
            writer
                .write_all(line.as_bytes())
                .map_err(|e| FocusError::io(&output, e))?;
        }
    }
    writer.flush().map_err(|e| FocusError::io(&output, e))?;

    Ok(output)
}
