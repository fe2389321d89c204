//! Build a weight matrix and persist it as an SWM file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geoweights_core::diagnostics::Diagnostics;
use geoweights_core::error::{Error, Result};
use geoweights_core::io::{SwmHeader, SwmSummary, SwmWriter};

use super::builder::{BuildReport, NeighborTopologyBuilder};

/// Output options for a generated matrix
#[derive(Debug, Clone)]
pub struct SwmOptions {
    /// Name of the unique id field recorded in the header
    pub unique_id: String,
    /// Row-standardize weights before writing (default: true)
    pub row_standardize: bool,
    pub spatial_ref: Option<String>,
    /// Name of the input features, recorded as INPUTFC
    pub input_name: Option<String>,
    /// Name of the weights table, recorded as INPUTTABLE
    pub input_table: Option<String>,
    /// Name of the timestamp field, recorded as TIMEFIELD
    pub time_field: Option<String>,
}

impl SwmOptions {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            ..Default::default()
        }
    }
}

impl Default for SwmOptions {
    fn default() -> Self {
        Self {
            unique_id: "ID".to_string(),
            row_standardize: true,
            spatial_ref: None,
            input_name: None,
            input_table: None,
            time_field: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub build: BuildReport,
    pub swm: SwmSummary,
}

impl GenerateReport {
    /// Build and write diagnostics, in that order.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut all = self.build.diagnostics.clone();
        all.append(self.swm.diagnostics.clone());
        all
    }
}

/// Build every row and stream it into `out`.
pub fn write_matrix<W: Write>(
    builder: NeighborTopologyBuilder<'_>,
    options: &SwmOptions,
    out: W,
) -> Result<GenerateReport> {
    let concept = *builder.conceptualization();
    let method = builder.params().distance_method;
    let mut rows = builder.build()?;

    let mut header = SwmHeader::for_conceptualization(
        &options.unique_id,
        &concept,
        method,
        rows.threshold(),
        rows.num_features(),
        options.row_standardize,
    );
    header.spatial_ref = options.spatial_ref.clone();
    header.input_fc = options.input_name.clone();
    header.input_table = options.input_table.clone();
    header.time_field = options.time_field.clone();

    let mut writer = SwmWriter::new(out, header)?;
    for row in rows.by_ref() {
        writer.write_neighbor_row(row)?;
    }
    let build = rows.finish()?;
    let swm = writer.finish()?;
    tracing::debug!(
        "wrote {} rows, {} links",
        swm.shape.num_features,
        swm.shape.non_zero_links
    );
    let report = GenerateReport { build, swm };
    report.diagnostics().emit();
    Ok(report)
}

/// Build and write an SWM file. A failed run leaves no file behind.
pub fn generate_swm<P: AsRef<Path>>(
    builder: NeighborTopologyBuilder<'_>,
    options: &SwmOptions,
    path: P,
) -> Result<GenerateReport> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| Error::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let result = write_matrix(builder, options, BufWriter::new(file));
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::debug!("could not remove {}: {}", path.display(), e);
        }
    }
    result
}
