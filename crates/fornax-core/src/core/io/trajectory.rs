use super::traits::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed trajectory record on line {line}: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },
}

/// One trajectory record as it appears in the input, before grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub time: f64,
    pub id: String,
    #[serde(alias = "conc", alias = "occupancy")]
    pub concentration: f64,
    pub energy: f64,
    #[serde(alias = "struct")]
    pub structure: String,
    #[serde(default, alias = "seq")]
    pub sequence: Option<String>,
}

/// Whitespace-separated trajectory tables with a header row.
///
/// Columns may appear in any order and may be separated by any run of spaces or tabs.
/// Blank lines and lines starting with `#` are skipped.
pub struct TrajectoryTable;

impl DocumentFormat for TrajectoryTable {
    type Document = Vec<RawSample>;
    type Error = TrajectoryReadError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<RawSample>, TrajectoryReadError> {
        let mut normalized = String::new();
        // Source line number of every kept line; entry 0 is the header.
        let mut source_lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            normalized.push_str(&trimmed.split_whitespace().collect::<Vec<_>>().join(","));
            normalized.push('\n');
            source_lines.push(index + 1);
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(normalized.as_bytes());

        csv_reader
            .deserialize::<RawSample>()
            .enumerate()
            .map(|(record, result)| {
                result.map_err(|source| TrajectoryReadError::Csv {
                    line: source_lines.get(record + 1).copied().unwrap_or(0),
                    source,
                })
            })
            .collect()
    }

    fn write_to(samples: &Vec<RawSample>, writer: &mut impl Write) -> Result<(), TrajectoryReadError> {
        let with_sequence = samples.iter().any(|s| s.sequence.is_some());
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .from_writer(&mut *writer);

        let mut header = vec!["id", "time", "concentration", "energy", "structure"];
        if with_sequence {
            header.push("sequence");
        }
        csv_writer.write_record(&header).map_err(io::Error::from)?;

        for sample in samples {
            let mut row = vec![
                sample.id.clone(),
                sample.time.to_string(),
                sample.concentration.to_string(),
                sample.energy.to_string(),
                sample.structure.clone(),
            ];
            if with_sequence {
                row.push(sample.sequence.clone().unwrap_or_else(|| "N".repeat(sample.structure.len())));
            }
            csv_writer.write_record(&row).map_err(io::Error::from)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
