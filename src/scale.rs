//! Visual encodings for station markers: radius by traffic volume, and a
//! three-level departure/arrival balance.

use serde::{Deserialize, Serialize, Serializer};

use crate::filter::TimeFilter;
use crate::traffic::{StationTraffic, TrafficTable};

/// Output range of the radius scale, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RadiusRange {
    pub min: f64,
    pub max: f64,
}

/// The two radius ranges used depending on whether a time filter is active.
///
/// Filtered counts are much smaller, so the filtered range has a non-zero
/// floor and a larger ceiling to keep markers legible.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadiusRanges {
    pub unfiltered: RadiusRange,
    pub filtered: RadiusRange,
}

impl Default for RadiusRanges {
    fn default() -> Self {
        Self {
            unfiltered: RadiusRange { min: 0.0, max: 25.0 },
            filtered: RadiusRange { min: 3.0, max: 50.0 },
        }
    }
}

impl RadiusRanges {
    pub fn for_filter(&self, filter: TimeFilter) -> RadiusRange {
        if filter.is_active() {
            self.filtered
        } else {
            self.unfiltered
        }
    }
}

/// Square-root scale from `[0, domain_max]` traffic onto a [`RadiusRange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusScale {
    domain_max: u32,
    range: RadiusRange,
}

impl RadiusScale {
    pub fn new(domain_max: u32, range: RadiusRange) -> Self {
        Self { domain_max, range }
    }

    /// Scale whose domain spans the busiest station in `table`.
    pub fn fit(table: &TrafficTable, range: RadiusRange) -> Self {
        Self::new(table.max_total(), range)
    }

    pub fn domain_max(&self) -> u32 {
        self.domain_max
    }

    /// Maps a traffic count to a radius. An empty domain maps everything to
    /// the range minimum.
    pub fn scale(&self, total_traffic: u32) -> f64 {
        if self.domain_max == 0 {
            return self.range.min;
        }
        let t = (total_traffic as f64 / self.domain_max as f64).sqrt().min(1.0);
        self.range.min + t * (self.range.max - self.range.min)
    }
}

/// Quantized departure share used to pick a marker's color blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLevel {
    /// Mostly arrivals (or no traffic at all).
    Arrivals,
    Balanced,
    /// Mostly departures.
    Departures,
}

impl FlowLevel {
    const LEVELS: [FlowLevel; 3] = [FlowLevel::Arrivals, FlowLevel::Balanced, FlowLevel::Departures];

    /// Splits `[0, 1]` into three equal bins. Out-of-domain ratios are clamped
    /// and a non-finite ratio counts as zero.
    pub fn quantize(ratio: f64) -> Self {
        if !ratio.is_finite() {
            return FlowLevel::Arrivals;
        }
        let n = Self::LEVELS.len();
        let idx = (ratio.clamp(0.0, 1.0) * n as f64).floor() as usize;
        Self::LEVELS[idx.min(n - 1)]
    }

    pub fn for_traffic(traffic: &StationTraffic) -> Self {
        Self::quantize(traffic.flow_ratio())
    }

    pub fn value(self) -> f64 {
        match self {
            FlowLevel::Arrivals => 0.0,
            FlowLevel::Balanced => 0.5,
            FlowLevel::Departures => 1.0,
        }
    }
}

impl Serialize for FlowLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}
