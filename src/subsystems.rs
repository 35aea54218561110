//src/subsystems.rs

use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;

use crate::error::{FocusError, Result};
use crate::fastq::open_text;
use crate::types::SUBSYSTEM_LEVELS;

/// Lookup from subsystem primary key to its tab-joined three levels.
#[derive(Debug, Clone, Default)]
pub struct SubsystemTranslation {
    levels: AHashMap<String, String>,
}

impl SubsystemTranslation {
    /// Parses a `database_PKs.txt` file in the format:
    /// ```text
    /// <header line>
    /// <pk>\t<level 1>\t<level 2>\t<level 3>
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::from_reader(open_text(path)?, &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut levels = AHashMap::new();

        // First line is a header.
        for (idx, line_result) in reader.lines().enumerate().skip(1) {
            let line = line_result.map_err(|e| FocusError::io(source, e))?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < SUBSYSTEM_LEVELS + 1 {
                return Err(FocusError::invalid_input(
                    format!("{source} line {}", idx + 1),
                    format!("expected a key and {SUBSYSTEM_LEVELS} levels"),
                ));
            }
            levels.insert(
                parts[0].to_string(),
                parts[1..=SUBSYSTEM_LEVELS].join("\t"),
            );
        }

        log::debug!("Loaded {} subsystem keys from {}", levels.len(), source);
        Ok(Self { levels })
    }

    pub fn get(&self, pk: &str) -> Option<&str> {
        self.levels.get(pk).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl FromIterator<(String, String)> for SubsystemTranslation {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            levels: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_translation() {
        let text = "pk\tl1\tl2\tl3\n\
                    12\tCarbohydrates\tSugar alcohols\tMannitol\n\
                    \n\
                    7\tProtein Metabolism\tProtein biosynthesis\tTranslation\textra\n";
        let table = SubsystemTranslation::from_reader(Cursor::new(text), "pks").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("12"), Some("Carbohydrates\tSugar alcohols\tMannitol"));
        assert_eq!(
            table.get("7"),
            Some("Protein Metabolism\tProtein biosynthesis\tTranslation")
        );
        assert_eq!(table.get("99"), None);
    }

    #[test]
    fn test_short_row_is_invalid() {
        let text = "pk\tl1\tl2\tl3\n12\tCarbohydrates\n";
        assert!(matches!(
            SubsystemTranslation::from_reader(Cursor::new(text), "pks"),
            Err(FocusError::InvalidInput { .. })
        ));
    }
}
