//! I/O for weight matrices and their inputs

pub mod contiguity;
pub mod swm;
pub mod text;

pub use contiguity::{ContiguityRecord, ContiguityTable};
pub use swm::{
    read_swm, read_swm_from_buffer, write_swm, write_swm_to_buffer, SwmHeader, SwmReader,
    SwmSummary, SwmWriter,
};
pub use text::{export_text_weights, swm_to_table, TableExport, WeightTable};
