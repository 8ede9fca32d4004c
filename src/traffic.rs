//! Per-station arrival and departure counts.
//!
//! Derived counts are kept apart from the stations themselves: every pass
//! produces a fresh [`TrafficTable`] aligned index-for-index with the station
//! list it was computed for.

use std::collections::HashMap;

use crate::model::{Station, Trip};

/// Derived traffic for one station over one trip set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationTraffic {
    pub arrivals: u32,
    pub departures: u32,
    pub total_traffic: u32,
}

impl StationTraffic {
    pub fn new(arrivals: u32, departures: u32) -> Self {
        Self {
            arrivals,
            departures,
            total_traffic: arrivals + departures,
        }
    }

    /// Share of traffic that departs from this station; `0.0` when there is no traffic.
    pub fn flow_ratio(&self) -> f64 {
        if self.total_traffic == 0 {
            0.0
        } else {
            self.departures as f64 / self.total_traffic as f64
        }
    }
}

/// Counts keyed by station identifier.
///
/// Lookups follow a fixed default policy: an identifier that was never
/// tallied has a count of zero.
#[derive(Debug, Default)]
pub struct Tally<'a> {
    counts: HashMap<&'a str, u32>,
}

impl<'a> Tally<'a> {
    pub fn add(&mut self, id: &'a str) {
        *self.counts.entry(id).or_insert(0) += 1;
    }

    pub fn count(&self, id: &str) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

}

/// Traffic for every station of one pass, in station order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficTable {
    rows: Vec<StationTraffic>,
}

impl TrafficTable {
    /// Table with all-zero traffic for `len` stations.
    pub fn zeroed(len: usize) -> Self {
        Self {
            rows: vec![StationTraffic::default(); len],
        }
    }

    pub fn get(&self, index: usize) -> Option<&StationTraffic> {
        self.rows.get(index)
    }

    /// Largest `total_traffic` in the table, 0 when empty.
    pub fn max_total(&self) -> u32 {
        self.rows.iter().map(|r| r.total_traffic).max().unwrap_or(0)
    }

    pub fn total_departures(&self) -> u32 {
        self.rows.iter().map(|r| r.departures).sum()
    }

    pub fn total_arrivals(&self) -> u32 {
        self.rows.iter().map(|r| r.arrivals).sum()
    }
}

/// Tallies departures by start station and arrivals by end station, then
/// reads off one row per station.
///
/// Trips that reference an unknown station are counted in the tallies but
/// land on no row.
pub fn compute_traffic<'a, I>(stations: &[Station], trips: I) -> TrafficTable
where
    I: IntoIterator<Item = &'a Trip>,
{
    let mut departures = Tally::default();
    let mut arrivals = Tally::default();

    for trip in trips {
        departures.add(&trip.start_station_id);
        arrivals.add(&trip.end_station_id);
    }

    let rows = stations
        .iter()
        .map(|s| StationTraffic::new(arrivals.count(&s.id), departures.count(&s.id)))
        .collect();

    TrafficTable { rows }
}
