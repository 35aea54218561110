// src/report.rs

use std::fmt::Write as FmtWrite;

use crate::aggregate::LevelRow;
use crate::binning::BinningRecords;

/// Run description written at the top of every SUPER-FOCUS table.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub query: String,
    pub database: String,
    pub aligner: String,
}

impl RunInfo {
    fn write_preamble(&self, out: &mut String) {
        writeln!(out, "Query: {}", self.query).unwrap();
        writeln!(out, "Database used: {}", self.database).unwrap();
        writeln!(out, "Aligner used: {}", self.aligner).unwrap();
        out.push('\n');
    }
}

/// Sample columns followed by their `%` columns.
pub fn sample_header(samples: &[String]) -> Vec<String> {
    samples
        .iter()
        .cloned()
        .chain(samples.iter().map(|s| format!("{s} %")))
        .collect()
}

/// Header for subsystem level `level` (1-based).
pub fn level_header(level: usize, samples: &[String]) -> Vec<String> {
    let mut header = vec![format!("Subsystem {level}")];
    header.extend(sample_header(samples));
    header
}

/// Header for the combined all-levels-and-function table.
pub fn function_header(samples: &[String]) -> Vec<String> {
    let mut header: Vec<String> = [
        "Subsystem Level 1",
        "Subsystem Level 2",
        "Subsystem Level 3",
        "Function",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(sample_header(samples));
    header
}

/// Tab-separated table; rows with no counts in any sample are left out.
pub fn render_level_table(info: &RunInfo, header: &[String], rows: &[LevelRow]) -> String {
    let mut out = String::new();
    info.write_preamble(&mut out);
    writeln!(out, "{}", header.join("\t")).unwrap();

    for row in rows {
        if row.total() <= 0.0 {
            continue;
        }
        let values: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}\t{}", row.label, values.join("\t")).unwrap();
    }
    out
}

/// Per-read binning table.
pub fn render_binning(info: &RunInfo, binning: &BinningRecords) -> String {
    let mut out = String::new();
    info.write_preamble(&mut out);
    out.push_str(
        "Sample name\tRead Name\tSubsystem Level 1\tSubsystem Level 2\tSubsystem Level 3\t\
         Function\tIdentity %\tAlignment Length\tE-value\n",
    );
    for (sample, read, entry) in binning.rows() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            sample, read, entry.label, entry.identity, entry.alignment_length, entry.evalue_text
        ).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::SampleBinning;
    use crate::types::BinningEntry;

    fn info() -> RunInfo {
        RunInfo {
            query: "q/".to_string(),
            database: "90".to_string(),
            aligner: "diamond".to_string(),
        }
    }

    #[test]
    fn test_level_table() {
        let samples = vec!["s1.fasta".to_string(), "s2.fasta".to_string()];
        let rows = vec![
            LevelRow {
                label: "A".to_string(),
                counts: vec![1.0, 0.0],
                relative: vec![100.0, 0.0],
            },
            LevelRow {
                label: "B".to_string(),
                counts: vec![0.0, 0.0],
                relative: vec![0.0, 0.0],
            },
        ];
        let text = render_level_table(&info(), &level_header(1, &samples), &rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Query: q/");
        assert_eq!(lines[1], "Database used: 90");
        assert_eq!(lines[2], "Aligner used: diamond");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Subsystem 1\ts1.fasta\ts2.fasta\ts1.fasta %\ts2.fasta %");
        assert_eq!(lines[5], "A\t1\t0\t100\t0");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_function_header() {
        let header = function_header(&["s".to_string()]);
        assert_eq!(header.len(), 6);
        assert_eq!(header[3], "Function");
        assert_eq!(header[5], "s %");
    }

    #[test]
    fn test_binning_keeps_aligner_evalue_text() {
        let mut records = BinningRecords::default();
        let mut sample = SampleBinning::new("s1");
        sample.push_read(
            "r1",
            vec![BinningEntry {
                identity: 70.5,
                alignment_length: 20.0,
                evalue: 0.00001,
                evalue_text: "0.00001".to_string(),
                label: "A\tB\tC\tf1".to_string(),
            }],
        );
        records.push(sample);
        let text = render_binning(&info(), &records);
        let last = text.lines().last().unwrap();
        assert_eq!(last, "s1\tr1\tA\tB\tC\tf1\t70.5\t20\t0.00001");
        assert!(text.contains("Sample name\tRead Name\tSubsystem Level 1"));
    }
}
