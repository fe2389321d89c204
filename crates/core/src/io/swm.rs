//! SWM spatial weights matrix files
//!
//! Layout: one text header line of `KEY@VALUE` tokens joined by `;`, then a
//! little-endian body:
//!
//! ```text
//! i32 N, i32 rowStandardized
//! N x { i32 id, i32 count, [i32 ids[count], f64 weights, f64 sum] }
//! ```
//!
//! With fixed weights a row stores one weight instead of `count`. The id,
//! weight and sum blocks are omitted for rows with `count == 0`. Files written
//! before version 10.1 carry a two-field `<idField>;<spatialRef>` header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::Path;

use crate::config::LARGE_MATRIX_LINKS;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{invalid_parameter, Error, Result};
use crate::weights::{
    normalize, Conceptualization, DistanceMethod, MatrixShape, NeighborRow, NormalizedRow,
    WeightType,
};

/// Header version written by this crate.
pub const SWM_VERSION: &str = "10.1";
/// Version reported for files with the two-field header.
pub const LEGACY_VERSION: &str = "< 10.1";
/// Placeholder for missing header values.
pub const MISSING: &str = "#";

/// Parsed SWM header, including the binary row count and standardization flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwmHeader {
    pub version: String,
    pub unique_id: String,
    pub spatial_ref: Option<String>,
    pub input_fc: Option<String>,
    pub weight_type: WeightType,
    pub distance_method: Option<String>,
    pub exponent: Option<String>,
    pub threshold: Option<String>,
    pub num_neighbors: Option<String>,
    pub input_table: Option<String>,
    pub time_field: Option<String>,
    pub time_type: Option<String>,
    pub time_value: Option<String>,
    pub input_net: Option<String>,
    pub impedance_field: Option<String>,
    pub barrier_fc: Option<String>,
    pub uturn_policy: Option<String>,
    pub restrictions: Option<String>,
    pub use_hierarchy: Option<String>,
    pub search_tolerance: Option<String>,
    pub add_concept: Option<String>,
    pub fixed_weights: bool,
    pub num_features: usize,
    pub row_standardized: bool,
    pub legacy: bool,
}

/// `%i` for whole values, `%0.4f` otherwise.
pub fn format_exponent(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}

pub fn format_threshold(value: f64) -> String {
    format!("{:.6}", value)
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

fn parse_opt(value: Option<&str>) -> Option<String> {
    match value {
        None | Some(MISSING) | Some("") => None,
        Some(v) => Some(v.to_string()),
    }
}

impl SwmHeader {
    /// Header for a new matrix. Fixed-weight encoding follows the weight type.
    pub fn new(
        unique_id: &str,
        weight_type: WeightType,
        num_features: usize,
        row_standardized: bool,
    ) -> Self {
        Self {
            version: SWM_VERSION.to_string(),
            unique_id: unique_id.to_uppercase(),
            spatial_ref: None,
            input_fc: None,
            weight_type,
            distance_method: None,
            exponent: None,
            threshold: None,
            num_neighbors: None,
            input_table: None,
            time_field: None,
            time_type: None,
            time_value: None,
            input_net: None,
            impedance_field: None,
            barrier_fc: None,
            uturn_policy: None,
            restrictions: None,
            use_hierarchy: None,
            search_tolerance: None,
            add_concept: None,
            fixed_weights: weight_type.is_uniform(),
            num_features,
            row_standardized,
            legacy: false,
        }
    }

    /// Header describing a matrix built from `concept`.
    ///
    /// `threshold` is the resolved threshold actually used by the builder.
    pub fn for_conceptualization(
        unique_id: &str,
        concept: &Conceptualization,
        distance_method: DistanceMethod,
        threshold: Option<f64>,
        num_features: usize,
        row_standardized: bool,
    ) -> Self {
        let mut header = Self::new(unique_id, concept.weight_type(), num_features, row_standardized);
        match *concept {
            Conceptualization::InverseDistance { exponent, .. } => {
                header.exponent = Some(format_exponent(exponent));
                header.distance_method = Some(distance_method.name().to_string());
            }
            Conceptualization::FixedDistance { .. }
            | Conceptualization::ZoneOfIndifference { .. } => {
                header.distance_method = Some(distance_method.name().to_string());
            }
            Conceptualization::KNearest { k } => {
                header.num_neighbors = Some(k.to_string());
                header.distance_method = Some(distance_method.name().to_string());
            }
            Conceptualization::SpaceTimeWindow { window, .. } => {
                header.distance_method = Some(distance_method.name().to_string());
                header.time_type = Some(window.unit.name().to_string());
                header.time_value = Some(window.value.to_string());
            }
            _ => {}
        }
        if concept.is_distance_based() {
            header.threshold = threshold.map(format_threshold);
        }
        header
    }

    pub fn with_spatial_ref(mut self, name: &str) -> Self {
        self.spatial_ref = Some(name.to_string());
        self
    }

    pub fn with_input(mut self, name: &str) -> Self {
        self.input_fc = Some(name.to_string());
        self
    }

    pub fn with_input_table(mut self, name: &str) -> Self {
        self.input_table = Some(name.to_string());
        self
    }

    pub fn with_time_field(mut self, name: &str) -> Self {
        self.time_field = Some(name.to_string());
        self
    }

    pub fn with_fixed_weights(mut self, fixed: bool) -> Self {
        self.fixed_weights = fixed;
        self
    }

    fn fields(&self) -> [(&'static str, &str); 21] {
        [
            ("UNIQUEID", self.unique_id.as_str()),
            ("SPATIALREFNAME", opt(&self.spatial_ref)),
            ("INPUTFC", opt(&self.input_fc)),
            ("WTYPE", ""),
            ("DISTANCEMETHOD", opt(&self.distance_method)),
            ("EXPONENT", opt(&self.exponent)),
            ("THRESHOLD", opt(&self.threshold)),
            ("NUMNEIGHS", opt(&self.num_neighbors)),
            ("INPUTTABLE", opt(&self.input_table)),
            ("TIMEFIELD", opt(&self.time_field)),
            ("TIMETYPE", opt(&self.time_type)),
            ("TIMEVALUE", opt(&self.time_value)),
            ("INPUTNET", opt(&self.input_net)),
            ("IMPEDANCEFIELD", opt(&self.impedance_field)),
            ("BARRIERFC", opt(&self.barrier_fc)),
            ("UTURNPOLICY", opt(&self.uturn_policy)),
            ("RESTRICTIONS", opt(&self.restrictions)),
            ("USEHIERARCHY", opt(&self.use_hierarchy)),
            ("SEARCHTOLERANCE", opt(&self.search_tolerance)),
            ("ADDCONCEPT", opt(&self.add_concept)),
            ("FIXEDWEIGHTS", if self.fixed_weights { "True" } else { "False" }),
        ]
    }

    /// Reject values that would corrupt the header line.
    pub fn validate(&self) -> Result<()> {
        if self.unique_id.is_empty() {
            return Err(invalid_parameter("unique_id", "", "must not be empty"));
        }
        for (key, value) in self.fields() {
            if value.contains(';') || value.contains('\n') || value.contains('\r') {
                return Err(invalid_parameter(
                    "header",
                    format!("{}@{}", key, value),
                    "values must not contain ';' or line breaks",
                ));
            }
        }
        Ok(())
    }

    /// The text header line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let wtype = self.weight_type.code().to_string();
        let mut tokens = Vec::with_capacity(22);
        tokens.push(format!("VERSION@{}", SWM_VERSION));
        for (key, value) in self.fields() {
            let value = if key == "WTYPE" { wtype.as_str() } else { value };
            tokens.push(format!("{}@{}", key, value));
        }
        tokens.join(";")
    }

    /// Parse a header line of either layout.
    ///
    /// `num_features` and `row_standardized` are left at their defaults; the
    /// reader fills them from the binary prefix.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.starts_with("VERSION@") {
            Self::parse_tokens(line)
        } else {
            Self::parse_legacy(line)
        }
    }

    fn parse_tokens(line: &str) -> Result<Self> {
        let mut map: HashMap<&str, &str> = HashMap::new();
        for token in line.split(';') {
            let (key, value) = token
                .split_once('@')
                .ok_or_else(|| Error::Format(format!("malformed header token `{}`", token)))?;
            map.insert(key, value);
        }
        let unique_id = parse_opt(map.get("UNIQUEID").copied())
            .ok_or_else(|| Error::Format("header has no UNIQUEID".into()))?;
        let weight_type = match parse_opt(map.get("WTYPE").copied()) {
            Some(code) => WeightType::from_code(
                code.trim()
                    .parse()
                    .map_err(|_| Error::Format(format!("invalid WTYPE `{}`", code)))?,
            ),
            None => WeightType::Unknown,
        };
        let fixed_weights = map
            .get("FIXEDWEIGHTS")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let get = |key: &str| parse_opt(map.get(key).copied());

        Ok(Self {
            version: get("VERSION").unwrap_or_else(|| SWM_VERSION.to_string()),
            unique_id,
            spatial_ref: get("SPATIALREFNAME"),
            input_fc: get("INPUTFC"),
            weight_type,
            distance_method: get("DISTANCEMETHOD"),
            exponent: get("EXPONENT"),
            threshold: get("THRESHOLD"),
            num_neighbors: get("NUMNEIGHS"),
            input_table: get("INPUTTABLE"),
            time_field: get("TIMEFIELD"),
            time_type: get("TIMETYPE"),
            time_value: get("TIMEVALUE"),
            input_net: get("INPUTNET"),
            impedance_field: get("IMPEDANCEFIELD"),
            barrier_fc: get("BARRIERFC"),
            uturn_policy: get("UTURNPOLICY"),
            restrictions: get("RESTRICTIONS"),
            use_hierarchy: get("USEHIERARCHY"),
            search_tolerance: get("SEARCHTOLERANCE"),
            add_concept: get("ADDCONCEPT"),
            fixed_weights,
            num_features: 0,
            row_standardized: false,
            legacy: false,
        })
    }

    fn parse_legacy(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() != 2 || parts[0].is_empty() {
            return Err(Error::Format(format!("unrecognized header `{}`", line)));
        }
        let mut header = Self::new(parts[0], WeightType::Unknown, 0, false);
        header.unique_id = parts[0].to_string();
        header.version = LEGACY_VERSION.to_string();
        header.spatial_ref = parse_opt(Some(parts[1]));
        header.fixed_weights = false;
        header.legacy = true;
        Ok(header)
    }

    /// Human-readable (label, value) pairs for the populated fields.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("Version", self.version.clone()),
            ("Unique ID field", self.unique_id.clone()),
        ];
        let optional = [
            ("Spatial reference", &self.spatial_ref),
            ("Input features", &self.input_fc),
        ];
        out.extend(
            optional
                .into_iter()
                .filter_map(|(label, v)| v.clone().map(|v| (label, v))),
        );
        out.push(("Conceptualization", self.weight_type.name().to_string()));
        let optional = [
            ("Distance method", &self.distance_method),
            ("Exponent", &self.exponent),
            ("Threshold", &self.threshold),
            ("Number of neighbors", &self.num_neighbors),
            ("Input table", &self.input_table),
            ("Time field", &self.time_field),
            ("Time interval type", &self.time_type),
            ("Time interval value", &self.time_value),
            ("Input network", &self.input_net),
            ("Impedance field", &self.impedance_field),
            ("Barriers", &self.barrier_fc),
            ("U-turn policy", &self.uturn_policy),
            ("Restrictions", &self.restrictions),
            ("Use hierarchy", &self.use_hierarchy),
            ("Search tolerance", &self.search_tolerance),
            ("Added conceptualization", &self.add_concept),
        ];
        out.extend(
            optional
                .into_iter()
                .filter_map(|(label, v)| v.clone().map(|v| (label, v))),
        );
        out.push(("Fixed weights", self.fixed_weights.to_string()));
        out.push(("Features", self.num_features.to_string()));
        out.push(("Row standardized", self.row_standardized.to_string()));
        out
    }
}

/// Result of writing a matrix.
#[derive(Debug, Clone, Serialize)]
pub struct SwmSummary {
    pub shape: MatrixShape,
    pub diagnostics: Diagnostics,
}

/// Streaming SWM writer. Rows go out in the order they are written.
pub struct SwmWriter<W: Write> {
    inner: W,
    header: SwmHeader,
    shape: MatrixShape,
}

impl SwmWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P, header: SwmHeader) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufWriter::new(file), header)
    }
}

impl<W: Write> SwmWriter<W> {
    /// Write the header line and binary prefix.
    pub fn new(mut inner: W, header: SwmHeader) -> Result<Self> {
        header.validate()?;
        let n = i32::try_from(header.num_features)
            .map_err(|_| invalid_parameter("num_features", header.num_features, "exceeds i32"))?;
        inner.write_all(header.to_line().as_bytes())?;
        inner.write_all(b"\n")?;
        inner.write_i32::<LittleEndian>(n)?;
        inner.write_i32::<LittleEndian>(i32::from(header.row_standardized))?;
        Ok(Self {
            inner,
            header,
            shape: MatrixShape::default(),
        })
    }

    pub fn header(&self) -> &SwmHeader {
        &self.header
    }

    pub fn rows_written(&self) -> usize {
        self.shape.num_features
    }

    pub fn write_row(&mut self, normalized: &NormalizedRow) -> Result<()> {
        let row = &normalized.row;
        if self.shape.num_features >= self.header.num_features {
            return Err(Error::RowCountMismatch {
                expected: self.header.num_features,
                actual: self.shape.num_features + 1,
            });
        }
        if row.neighbors.len() != row.weights.len() {
            return Err(invalid_parameter(
                "row",
                row.id,
                "neighbor and weight counts differ",
            ));
        }
        if self.header.fixed_weights && !row.is_uniform() {
            return Err(Error::EncodingMismatch { id: row.id });
        }
        let count = i32::try_from(row.len())
            .map_err(|_| invalid_parameter("row", row.id, "too many neighbors"))?;

        self.inner.write_i32::<LittleEndian>(row.id)?;
        self.inner.write_i32::<LittleEndian>(count)?;
        if count > 0 {
            for &n in &row.neighbors {
                self.inner.write_i32::<LittleEndian>(n)?;
            }
            if self.header.fixed_weights {
                self.inner.write_f64::<LittleEndian>(row.weights[0])?;
            } else {
                for &w in &row.weights {
                    self.inner.write_f64::<LittleEndian>(w)?;
                }
            }
            self.inner
                .write_f64::<LittleEndian>(normalized.unstandardized_sum)?;
        }
        self.shape.observe(row.len());
        Ok(())
    }

    /// Normalize per the header and write.
    pub fn write_neighbor_row(&mut self, row: NeighborRow) -> Result<()> {
        let normalized = normalize(row, self.header.row_standardized);
        self.write_row(&normalized)
    }

    /// Flush and check that exactly N rows were written.
    pub fn finish(mut self) -> Result<SwmSummary> {
        if self.shape.num_features != self.header.num_features {
            return Err(Error::RowCountMismatch {
                expected: self.header.num_features,
                actual: self.shape.num_features,
            });
        }
        self.inner.flush()?;
        let diagnostics = matrix_advisories(&self.shape, LARGE_MATRIX_LINKS);
        Ok(SwmSummary {
            shape: self.shape,
            diagnostics,
        })
    }
}

/// Advisories for a finished matrix with `large_links` as the size limit.
fn matrix_advisories(shape: &MatrixShape, large_links: u64) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    if shape.non_zero_links >= large_links {
        diagnostics.push(Diagnostic::LargeMatrix {
            links: shape.non_zero_links,
        });
    }
    diagnostics
}

fn read_err(e: std::io::Error, what: &str) -> Error {
    if e.kind() == IoErrorKind::UnexpectedEof {
        Error::Format(format!("unexpected end of file reading {}", what))
    } else {
        Error::Io(e)
    }
}

/// Streaming SWM reader yielding rows in file order.
///
/// Any error closes the underlying reader; later calls yield nothing.
pub struct SwmReader<R> {
    header: SwmHeader,
    inner: Option<R>,
    rows_read: usize,
}

impl SwmReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> SwmReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut line = Vec::new();
        let read = inner.read_until(b'\n', &mut line)?;
        if read == 0 || line.last() != Some(&b'\n') {
            return Err(Error::Format("missing header line".into()));
        }
        let mut header = SwmHeader::parse_line(&String::from_utf8_lossy(&line))?;
        let n = inner
            .read_i32::<LittleEndian>()
            .map_err(|e| read_err(e, "feature count"))?;
        let row_std = inner
            .read_i32::<LittleEndian>()
            .map_err(|e| read_err(e, "standardization flag"))?;
        header.num_features = usize::try_from(n)
            .map_err(|_| Error::Format(format!("negative feature count {}", n)))?;
        header.row_standardized = row_std != 0;
        Ok(Self {
            header,
            inner: Some(inner),
            rows_read: 0,
        })
    }

    pub fn header(&self) -> &SwmHeader {
        &self.header
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Next row, or `None` once all N rows have been read.
    pub fn read_row(&mut self) -> Result<Option<NormalizedRow>> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };
        if self.rows_read == self.header.num_features {
            let trailing = inner.fill_buf().map(|buf| !buf.is_empty());
            self.inner = None;
            if trailing? {
                return Err(Error::Format(format!(
                    "data after the declared {} rows",
                    self.header.num_features
                )));
            }
            return Ok(None);
        }
        match read_one(inner, &self.header, self.rows_read) {
            Ok(row) => {
                self.rows_read += 1;
                Ok(Some(row))
            }
            Err(e) => {
                self.inner = None;
                Err(e)
            }
        }
    }
}

fn read_one<R: BufRead>(inner: &mut R, header: &SwmHeader, index: usize) -> Result<NormalizedRow> {
    let what = || format!("row {} of {}", index + 1, header.num_features);
    let id = inner
        .read_i32::<LittleEndian>()
        .map_err(|e| read_err(e, &what()))?;
    let count = inner
        .read_i32::<LittleEndian>()
        .map_err(|e| read_err(e, &what()))?;
    let count = usize::try_from(count)
        .map_err(|_| Error::Format(format!("feature {} has negative neighbor count", id)))?;
    if count > header.num_features {
        return Err(Error::Format(format!(
            "feature {} lists {} neighbors in a matrix of {} features",
            id, count, header.num_features
        )));
    }
    if count == 0 {
        return Ok(NormalizedRow {
            row: NeighborRow::new(id),
            unstandardized_sum: 0.0,
        });
    }

    let neighbors = read_block(inner, count, |r: &mut R, buf: &mut [i32]| {
        r.read_i32_into::<LittleEndian>(buf)
    })
    .map_err(|e| read_err(e, &what()))?;
    let weights = if header.fixed_weights {
        let w = inner
            .read_f64::<LittleEndian>()
            .map_err(|e| read_err(e, &what()))?;
        vec![w; count]
    } else {
        read_block(inner, count, |r: &mut R, buf: &mut [f64]| {
            r.read_f64_into::<LittleEndian>(buf)
        })
        .map_err(|e| read_err(e, &what()))?
    };
    let sum = inner
        .read_f64::<LittleEndian>()
        .map_err(|e| read_err(e, &what()))?;
    Ok(NormalizedRow {
        row: NeighborRow {
            id,
            neighbors,
            weights,
        },
        unstandardized_sum: sum,
    })
}

/// Values per read while filling a neighbor block.
const READ_CHUNK: usize = 4096;

/// Read `count` values in bounded chunks, so memory only grows with the
/// bytes actually present.
fn read_block<R, T, F>(inner: &mut R, count: usize, read: F) -> std::io::Result<Vec<T>>
where
    R: BufRead,
    T: Copy + Default,
    F: Fn(&mut R, &mut [T]) -> std::io::Result<()>,
{
    let mut values = Vec::with_capacity(count.min(READ_CHUNK));
    let mut chunk = vec![T::default(); count.min(READ_CHUNK)];
    while values.len() < count {
        let take = (count - values.len()).min(READ_CHUNK);
        read(inner, &mut chunk[..take])?;
        values.extend_from_slice(&chunk[..take]);
    }
    Ok(values)
}

impl<R: BufRead> Iterator for SwmReader<R> {
    type Item = Result<NormalizedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().transpose()
    }
}

impl<R: BufRead> std::iter::FusedIterator for SwmReader<R> {}

/// Write rows to a file, normalizing them per `header.row_standardized`.
pub fn write_swm<P, I>(path: P, header: SwmHeader, rows: I) -> Result<SwmSummary>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = NeighborRow>,
{
    let mut writer = SwmWriter::create(path, header)?;
    for row in rows {
        writer.write_neighbor_row(row)?;
    }
    writer.finish()
}

/// Same as [`write_swm`] but into memory.
pub fn write_swm_to_buffer<I>(header: SwmHeader, rows: I) -> Result<(Vec<u8>, SwmSummary)>
where
    I: IntoIterator<Item = NeighborRow>,
{
    let mut buffer = Vec::new();
    let mut writer = SwmWriter::new(&mut buffer, header)?;
    for row in rows {
        writer.write_neighbor_row(row)?;
    }
    let summary = writer.finish()?;
    Ok((buffer, summary))
}

/// Read a whole file into memory.
pub fn read_swm<P: AsRef<Path>>(path: P) -> Result<(SwmHeader, Vec<NormalizedRow>)> {
    let mut reader = SwmReader::open(path)?;
    let rows = reader.by_ref().collect::<Result<Vec<_>>>()?;
    Ok((reader.header, rows))
}

pub fn read_swm_from_buffer(data: &[u8]) -> Result<(SwmHeader, Vec<NormalizedRow>)> {
    let mut reader = SwmReader::new(data)?;
    let rows = reader.by_ref().collect::<Result<Vec<_>>>()?;
    Ok((reader.header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{ContiguityKind, TimeUnit, TimeWindow};

    fn chain_rows(n: i32) -> Vec<NeighborRow> {
        (0..n)
            .map(|i| {
                let neighbors: Vec<i32> = [i - 1, i + 1]
                    .into_iter()
                    .filter(|&j| j >= 0 && j < n)
                    .collect();
                NeighborRow::uniform(i, neighbors, 1.0)
            })
            .collect()
    }

    #[test]
    fn test_header_line() {
        let header = SwmHeader::for_conceptualization(
            "objectid",
            &Conceptualization::InverseDistance {
                exponent: 2.0,
                threshold: None,
            },
            DistanceMethod::Euclidean,
            Some(1.5),
            3,
            true,
        )
        .with_spatial_ref("WGS_1984");
        let line = header.to_line();
        assert!(line.starts_with(
            "VERSION@10.1;UNIQUEID@OBJECTID;SPATIALREFNAME@WGS_1984;INPUTFC@#;WTYPE@0;\
             DISTANCEMETHOD@EUCLIDEAN;EXPONENT@2;THRESHOLD@1.500000;NUMNEIGHS@#"
        ));
        assert!(line.ends_with(";ADDCONCEPT@#;FIXEDWEIGHTS@False"));
        assert_eq!(line.split(';').count(), 22);

        let parsed = SwmHeader::parse_line(&line).unwrap();
        assert_eq!(parsed.unique_id, "OBJECTID");
        assert_eq!(parsed.weight_type, WeightType::InverseDistance);
        assert_eq!(parsed.exponent.as_deref(), Some("2"));
        assert_eq!(parsed.input_fc, None);
        assert!(!parsed.fixed_weights);
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_exponent(1.0), "1");
        assert_eq!(format_exponent(1.5), "1.5000");
        assert_eq!(format_threshold(2.0), "2.000000");
    }

    #[test]
    fn test_space_time_header() {
        let concept = Conceptualization::SpaceTimeWindow {
            threshold: Some(10.0),
            window: TimeWindow::new(3, TimeUnit::Days),
        };
        let header =
            SwmHeader::for_conceptualization("id", &concept, DistanceMethod::Manhattan, Some(10.0), 1, false);
        assert!(header.fixed_weights);
        assert_eq!(header.time_type.as_deref(), Some("DAYS"));
        assert_eq!(header.time_value.as_deref(), Some("3"));
        assert_eq!(header.distance_method.as_deref(), Some("MANHATTAN"));
    }

    #[test]
    fn test_legacy_header() {
        let h = SwmHeader::parse_line("MYID;NAD_1983_UTM\n").unwrap();
        assert!(h.legacy);
        assert_eq!(h.version, LEGACY_VERSION);
        assert_eq!(h.unique_id, "MYID");
        assert_eq!(h.spatial_ref.as_deref(), Some("NAD_1983_UTM"));
        assert_eq!(h.weight_type, WeightType::Unknown);
        assert!(!h.fixed_weights);
        assert!(SwmHeader::parse_line("just-one-field").is_err());
    }

    #[test]
    fn test_fixed_roundtrip() {
        let header = SwmHeader::new("id", WeightType::FixedDistance, 4, true);
        let (bytes, summary) = write_swm_to_buffer(header, chain_rows(4)).unwrap();
        assert_eq!(summary.shape.non_zero_links, 6);
        let (h, rows) = read_swm_from_buffer(&bytes).unwrap();
        assert!(h.fixed_weights && h.row_standardized);
        assert_eq!(h.num_features, 4);
        assert_eq!(rows[1].row.neighbors, vec![0, 2]);
        assert_eq!(rows[1].row.weights, vec![0.5, 0.5]);
        assert_eq!(rows[1].unstandardized_sum, 2.0);
        assert_eq!(rows[0].row.weights, vec![1.0]);
    }

    #[test]
    fn test_variable_roundtrip_with_isolate() {
        let rows = vec![
            NeighborRow::from_pairs(10, vec![(20, 0.5), (30, 0.25)]),
            NeighborRow::new(20),
            NeighborRow::from_pairs(30, vec![(10, 2.0)]),
        ];
        let header = SwmHeader::new("id", WeightType::InverseDistance, 3, false);
        let (bytes, _) = write_swm_to_buffer(header, rows.clone()).unwrap();
        let (_, read) = read_swm_from_buffer(&bytes).unwrap();
        let read: Vec<NeighborRow> = read.into_iter().map(|r| r.row).collect();
        assert_eq!(read, rows);
    }

    #[test]
    fn test_encoding_mismatch() {
        let header = SwmHeader::new("id", WeightType::KNearest, 1, false);
        let mut buffer = Vec::new();
        let mut writer = SwmWriter::new(&mut buffer, header).unwrap();
        let row = NeighborRow::from_pairs(1, vec![(2, 1.0), (3, 0.5)]);
        assert!(matches!(
            writer.write_neighbor_row(row),
            Err(Error::EncodingMismatch { id: 1 })
        ));
    }

    #[test]
    fn test_row_count_mismatch() {
        let header = SwmHeader::new("id", WeightType::FixedDistance, 3, false);
        assert!(matches!(
            write_swm_to_buffer(header.clone(), chain_rows(2)),
            Err(Error::RowCountMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            write_swm_to_buffer(header, chain_rows(4)),
            Err(Error::RowCountMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn test_truncated_file_closes_reader() {
        let header = SwmHeader::new("id", WeightType::FixedDistance, 5, false);
        let (bytes, _) = write_swm_to_buffer(header, chain_rows(5)).unwrap();
        let cut = &bytes[..bytes.len() - 6];
        let mut reader = SwmReader::new(cut).unwrap();
        let results: Vec<_> = reader.by_ref().collect();
        assert_eq!(results.len(), 5);
        assert!(results[..4].iter().all(|r| r.is_ok()));
        assert!(matches!(results[4], Err(Error::Format(_))));
        assert!(reader.is_closed());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_huge_neighbor_count_is_format_error() {
        let header = SwmHeader::new("id", WeightType::InverseDistance, i32::MAX as usize, false);
        let mut bytes = Vec::new();
        SwmWriter::new(&mut bytes, header).unwrap();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&(i32::MAX - 1).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);

        let mut reader = SwmReader::new(bytes.as_slice()).unwrap();
        assert!(matches!(reader.read_row(), Err(Error::Format(_))));
        assert!(reader.is_closed());
    }

    #[test]
    fn test_large_matrix_advisory() {
        let mut shape = MatrixShape::default();
        shape.observe(3);
        shape.observe(2);
        assert!(matrix_advisories(&shape, LARGE_MATRIX_LINKS).is_empty());
        assert!(matrix_advisories(&shape, 6).is_empty());
        let diagnostics = matrix_advisories(&shape, 5);
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::LargeMatrix { links: 5 })));
    }

    #[test]
    fn test_trailing_data() {
        let header = SwmHeader::new("id", WeightType::FixedDistance, 2, false);
        let (mut bytes, _) = write_swm_to_buffer(header, chain_rows(2)).unwrap();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(read_swm_from_buffer(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_describe() {
        let concept = Conceptualization::PolygonContiguity(ContiguityKind::Rook);
        let header =
            SwmHeader::for_conceptualization("fid", &concept, DistanceMethod::Euclidean, None, 7, true);
        let described = header.describe();
        assert!(described.contains(&("Conceptualization", "CONTIGUITY_EDGES_ONLY".to_string())));
        assert!(described.contains(&("Features", "7".to_string())));
        assert!(!described.iter().any(|(label, _)| *label == "Threshold"));
    }

    #[test]
    fn test_rejects_separator_in_values() {
        let header = SwmHeader::new("id", WeightType::Delaunay, 0, false).with_input("a;b");
        assert!(SwmWriter::new(Vec::new(), header).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.swm");
        let header = SwmHeader::new("id", WeightType::Delaunay, 3, false);
        write_swm(&path, header, chain_rows(3)).unwrap();
        let (h, rows) = read_swm(&path).unwrap();
        assert_eq!(h.weight_type, WeightType::Delaunay);
        assert_eq!(rows.len(), 3);
    }
}
