//! Flat text weights: a unique-id field name on the first line, then one
//! `from to weight` triple per line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::swm::SwmReader;
use crate::config::DEFAULT_REPORT_SAMPLE;
use crate::diagnostics::{id_sample, Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::weights::{compare_float, MatrixShape, NeighborRow};

/// Weights read from a text file, grouped by source id in file order.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    pub unique_id: String,
    order: Vec<i32>,
    rows: HashMap<i32, NeighborRow>,
    negative_dropped: usize,
}

impl WeightTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let unique_id = match lines.next() {
            Some(line) => line?.trim().to_string(),
            None => String::new(),
        };
        if unique_id.is_empty() {
            return Err(Error::Format("weights table has no id field line".into()));
        }

        let mut table = Self {
            unique_id,
            ..Default::default()
        };
        for (index, line) in lines.enumerate() {
            let line = line?;
            let line_no = index + 2;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != 3 {
                return Err(Error::Format(format!(
                    "line {}: expected `from to weight`, got `{}`",
                    line_no,
                    line.trim()
                )));
            }
            let bad = |what: &str| Error::Format(format!("line {}: invalid {}", line_no, what));
            let from: i32 = tokens[0].parse().map_err(|_| bad("source id"))?;
            let to: i32 = tokens[1].parse().map_err(|_| bad("neighbor id"))?;
            let weight: f64 = tokens[2].parse().map_err(|_| bad("weight"))?;
            table.insert(from, to, weight);
        }
        Ok(table)
    }

    /// Add one link. Negative weights are counted and dropped; zero weights
    /// are dropped.
    pub fn insert(&mut self, from: i32, to: i32, weight: f64) {
        if weight < 0.0 {
            self.negative_dropped += 1;
            return;
        }
        if compare_float(weight, 0.0) {
            return;
        }
        let order = &mut self.order;
        self.rows
            .entry(from)
            .or_insert_with(|| {
                order.push(from);
                NeighborRow::new(from)
            })
            .push(to, weight);
    }

    /// Row for `id`, if the table lists any links from it.
    pub fn row(&self, id: i32) -> Option<&NeighborRow> {
        self.rows.get(&id)
    }

    /// Source ids in first-appearance order.
    pub fn source_ids(&self) -> &[i32] {
        &self.order
    }

    pub fn num_links(&self) -> usize {
        self.rows.values().map(NeighborRow::len).sum()
    }

    pub fn negative_dropped(&self) -> usize {
        self.negative_dropped
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut d = Diagnostics::new();
        if self.negative_dropped > 0 {
            d.push(Diagnostic::NegativeWeightsDropped {
                count: self.negative_dropped,
            });
        }
        d
    }
}

/// Result of exporting an SWM file to text.
#[derive(Debug, Clone)]
pub struct TableExport {
    pub shape: MatrixShape,
    pub isolated: Vec<i32>,
    pub diagnostics: Diagnostics,
}

/// Stream every stored link of `reader` to `out` as text.
///
/// Weights are written as stored, standardized or not.
pub fn export_text_weights<R: BufRead, W: Write>(
    reader: &mut SwmReader<R>,
    mut out: W,
) -> Result<TableExport> {
    writeln!(out, "{}", reader.header().unique_id)?;
    let mut shape = MatrixShape::default();
    let mut isolated = Vec::new();
    while let Some(normalized) = reader.read_row()? {
        let row = &normalized.row;
        if row.is_empty() {
            isolated.push(row.id);
        }
        for (neighbor, weight) in row.pairs() {
            writeln!(out, "{} {} {}", row.id, neighbor, weight)?;
        }
        shape.observe(row.len());
    }
    out.flush()?;

    let mut diagnostics = Diagnostics::new();
    if !isolated.is_empty() {
        diagnostics.push(Diagnostic::Isolates {
            count: isolated.len(),
            sample: id_sample(&isolated, DEFAULT_REPORT_SAMPLE),
        });
    }
    Ok(TableExport {
        shape,
        isolated,
        diagnostics,
    })
}

/// Convert an SWM file into a flat text weights file.
pub fn swm_to_table<P: AsRef<Path>, Q: AsRef<Path>>(swm: P, output: Q) -> Result<TableExport> {
    let mut reader = SwmReader::open(swm)?;
    let output = output.as_ref();
    let file = File::create(output).map_err(|source| Error::Create {
        path: output.to_path_buf(),
        source,
    })?;
    export_text_weights(&mut reader, BufWriter::new(file))
}
