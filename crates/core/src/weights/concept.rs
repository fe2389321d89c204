//! Conceptualizations of spatial relationships and their persisted codes

use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{invalid_parameter, Error, Result};

/// Persisted `WTYPE` code of a weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightType {
    InverseDistance,
    FixedDistance,
    KNearest,
    Delaunay,
    ContiguityEdgesOnly,
    ContiguityEdgesCorners,
    ConvertFromTable,
    ZoneOfIndifference,
    ExternalFile,
    SpaceTimeWindow,
    Network,
    Unknown,
}

impl WeightType {
    pub fn code(self) -> i32 {
        match self {
            WeightType::InverseDistance => 0,
            WeightType::FixedDistance => 1,
            WeightType::KNearest => 2,
            WeightType::Delaunay => 3,
            WeightType::ContiguityEdgesOnly => 4,
            WeightType::ContiguityEdgesCorners => 5,
            WeightType::ConvertFromTable => 6,
            WeightType::ZoneOfIndifference => 7,
            WeightType::ExternalFile => 8,
            WeightType::SpaceTimeWindow => 9,
            WeightType::Network => 10,
            WeightType::Unknown => -1,
        }
    }

    /// Unrecognized codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => WeightType::InverseDistance,
            1 => WeightType::FixedDistance,
            2 => WeightType::KNearest,
            3 => WeightType::Delaunay,
            4 => WeightType::ContiguityEdgesOnly,
            5 => WeightType::ContiguityEdgesCorners,
            6 => WeightType::ConvertFromTable,
            7 => WeightType::ZoneOfIndifference,
            8 => WeightType::ExternalFile,
            9 => WeightType::SpaceTimeWindow,
            10 => WeightType::Network,
            _ => WeightType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeightType::InverseDistance => "INVERSE_DISTANCE",
            WeightType::FixedDistance => "FIXED_DISTANCE",
            WeightType::KNearest => "K_NEAREST_NEIGHBORS",
            WeightType::Delaunay => "DELAUNAY_TRIANGULATION",
            WeightType::ContiguityEdgesOnly => "CONTIGUITY_EDGES_ONLY",
            WeightType::ContiguityEdgesCorners => "CONTIGUITY_EDGES_CORNERS",
            WeightType::ConvertFromTable => "CONVERT_TABLE",
            WeightType::ZoneOfIndifference => "ZONE_OF_INDIFFERENCE",
            WeightType::ExternalFile => "GET_SPATIAL_WEIGHTS_FROM_FILE",
            WeightType::SpaceTimeWindow => "SPACE_TIME_WINDOW",
            WeightType::Network => "NETWORK",
            WeightType::Unknown => "UNKNOWN",
        }
    }

    /// Whether every row of this matrix type carries a single repeated weight,
    /// which allows the fixed (one weight per row) encoding.
    pub fn is_uniform(self) -> bool {
        matches!(
            self,
            WeightType::FixedDistance
                | WeightType::KNearest
                | WeightType::Delaunay
                | WeightType::ContiguityEdgesOnly
                | WeightType::ContiguityEdgesCorners
                | WeightType::SpaceTimeWindow
        )
    }
}

impl fmt::Display for WeightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance metric for neighbor searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMethod {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMethod {
    pub fn name(self) -> &'static str {
        match self {
            DistanceMethod::Euclidean => "EUCLIDEAN",
            DistanceMethod::Manhattan => "MANHATTAN",
        }
    }

    #[inline]
    pub fn distance(self, dx: f64, dy: f64) -> f64 {
        match self {
            DistanceMethod::Euclidean => (dx * dx + dy * dy).sqrt(),
            DistanceMethod::Manhattan => dx.abs() + dy.abs(),
        }
    }
}

impl FromStr for DistanceMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "EUCLIDEAN" | "EUCLIDEAN_DISTANCE" => Ok(DistanceMethod::Euclidean),
            "MANHATTAN" | "MANHATTAN_DISTANCE" => Ok(DistanceMethod::Manhattan),
            _ => Err(invalid_parameter(
                "distance_method",
                s,
                "expected EUCLIDEAN or MANHATTAN",
            )),
        }
    }
}

/// Polygon contiguity flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContiguityKind {
    /// Shared edges only
    Rook,
    /// Shared edges or corners
    Queen,
}

/// Unit of a space-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Days => "DAYS",
            TimeUnit::Weeks => "WEEKS",
            TimeUnit::Months => "MONTHS",
            TimeUnit::Years => "YEARS",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "HOURS" => Ok(TimeUnit::Hours),
            "DAYS" => Ok(TimeUnit::Days),
            "WEEKS" => Ok(TimeUnit::Weeks),
            "MONTHS" => Ok(TimeUnit::Months),
            "YEARS" => Ok(TimeUnit::Years),
            _ => Err(invalid_parameter("time_unit", s, "unknown time unit")),
        }
    }
}

/// Symmetric time window around a feature's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub value: u32,
    pub unit: TimeUnit,
}

impl TimeWindow {
    pub fn new(value: u32, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn validate(&self) -> Result<()> {
        if self.value == 0 {
            return Err(invalid_parameter(
                "time_window",
                self.value,
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Inclusive `[start, end]` window around `t`.
    ///
    /// Month and year steps clamp to the last day of the target month.
    /// Returns `None` when the window leaves chrono's representable range.
    pub fn bounds(&self, t: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let v = i64::from(self.value);
        let span = match self.unit {
            TimeUnit::Seconds => Duration::try_seconds(v),
            TimeUnit::Minutes => Duration::try_minutes(v),
            TimeUnit::Hours => Duration::try_hours(v),
            TimeUnit::Days => Duration::try_days(v),
            TimeUnit::Weeks => Duration::try_weeks(v),
            TimeUnit::Months | TimeUnit::Years => None,
        };
        match (self.unit, span) {
            (TimeUnit::Months, _) => {
                let m = Months::new(self.value);
                Some((t.checked_sub_months(m)?, t.checked_add_months(m)?))
            }
            (TimeUnit::Years, _) => {
                let m = Months::new(self.value.checked_mul(12)?);
                Some((t.checked_sub_months(m)?, t.checked_add_months(m)?))
            }
            (_, Some(d)) => Some((t.checked_sub_signed(d)?, t.checked_add_signed(d)?)),
            (_, None) => None,
        }
    }

    /// Whether `candidate` falls inside the window centred on `t`.
    pub fn contains(&self, t: NaiveDateTime, candidate: NaiveDateTime) -> bool {
        match self.bounds(t) {
            Some((start, end)) => candidate >= start && candidate <= end,
            None => false,
        }
    }
}

/// The rule deciding which features are neighbors and how they are weighted.
///
/// Distance thresholds are optional; when absent, a default threshold that
/// guarantees every feature at least one neighbor is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Conceptualization {
    /// 1/d^exponent within the threshold (distances below 1 weigh 1)
    InverseDistance { exponent: f64, threshold: Option<f64> },
    /// Weight 1 within the threshold
    FixedDistance { threshold: Option<f64> },
    /// Weight 1 within the threshold, 1/(1 + excess) beyond it
    ZoneOfIndifference { threshold: Option<f64> },
    /// The k closest features, weight 1
    KNearest { k: usize },
    /// Natural neighbors from a Delaunay triangulation, weight 1
    Delaunay,
    /// Shared boundaries from an external contiguity table, weight 1
    PolygonContiguity(ContiguityKind),
    /// Within the spatial threshold and inside the time window, weight 1
    SpaceTimeWindow { threshold: Option<f64>, window: TimeWindow },
    /// (from, to, weight) triples from a flat weights table
    ExternalTable,
}

impl Conceptualization {
    pub fn weight_type(&self) -> WeightType {
        match self {
            Conceptualization::InverseDistance { .. } => WeightType::InverseDistance,
            Conceptualization::FixedDistance { .. } => WeightType::FixedDistance,
            Conceptualization::ZoneOfIndifference { .. } => WeightType::ZoneOfIndifference,
            Conceptualization::KNearest { .. } => WeightType::KNearest,
            Conceptualization::Delaunay => WeightType::Delaunay,
            Conceptualization::PolygonContiguity(ContiguityKind::Rook) => {
                WeightType::ContiguityEdgesOnly
            }
            Conceptualization::PolygonContiguity(ContiguityKind::Queen) => {
                WeightType::ContiguityEdgesCorners
            }
            Conceptualization::SpaceTimeWindow { .. } => WeightType::SpaceTimeWindow,
            Conceptualization::ExternalTable => WeightType::ExternalFile,
        }
    }

    /// Explicit threshold of a distance-based conceptualization.
    pub fn threshold(&self) -> Option<f64> {
        match *self {
            Conceptualization::InverseDistance { threshold, .. }
            | Conceptualization::FixedDistance { threshold }
            | Conceptualization::ZoneOfIndifference { threshold }
            | Conceptualization::SpaceTimeWindow { threshold, .. } => threshold,
            _ => None,
        }
    }

    /// Whether the neighbor search is bounded by a distance threshold.
    pub fn is_distance_based(&self) -> bool {
        matches!(
            self,
            Conceptualization::InverseDistance { .. }
                | Conceptualization::FixedDistance { .. }
                | Conceptualization::ZoneOfIndifference { .. }
                | Conceptualization::SpaceTimeWindow { .. }
        )
    }
}
