//! Recompute pipeline: turns slider and viewport events into complete
//! station-marker snapshots for a renderer.
//!
//! All collaborators (projection and rendering) are passed in through a
//! [`MapContext`] when the pipeline is built. Every event runs to completion
//! and publishes one fully-built [`Snapshot`].

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::filter::{TimeFilter, TimeFilterError, filter_by_time};
use crate::model::{Coordinate, ScreenPoint, Station, Trip};
use crate::scale::{FlowLevel, RadiusRanges, RadiusScale};
use crate::traffic::{StationTraffic, TrafficTable, compute_traffic};

/// Converts geographic coordinates into screen space for the current view.
pub trait Projector {
    fn project(&self, coordinate: Coordinate) -> Result<ScreenPoint>;
}

/// Consumes published snapshots.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot);
}

/// Which source failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("station list unavailable: {0:#}")]
    Stations(anyhow::Error),
    #[error("trip list unavailable: {0:#}")]
    Trips(anyhow::Error),
    #[error("station and trip lists unavailable: {stations:#}; {trips:#}")]
    Both {
        stations: anyhow::Error,
        trips: anyhow::Error,
    },
}

/// One marker's worth of data, keyed by station id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMarker {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub flow_level: FlowLevel,
    pub total_traffic: u32,
    pub departures: u32,
    pub arrivals: u32,
}

impl fmt::Display for StationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trips ({} departures, {} arrivals)",
            self.total_traffic, self.departures, self.arrivals
        )
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    /// Slider value the snapshot was computed for (`-1` when unfiltered).
    pub time_filter: i32,
    /// Trips that survived the time filter.
    pub trip_count: usize,
    pub markers: Vec<StationMarker>,
}

impl Snapshot {
    pub fn empty(filter: TimeFilter) -> Self {
        Self {
            generated_at: Utc::now(),
            time_filter: filter.to_slider(),
            trip_count: 0,
            markers: Vec::new(),
        }
    }

    pub fn marker(&self, id: &str) -> Option<&StationMarker> {
        self.markers.iter().find(|m| m.id == id)
    }
}

/// Explicit process-wide context handed to the pipeline at construction.
pub struct MapContext<P, R> {
    pub projector: P,
    pub renderer: R,
    pub radius_ranges: RadiusRanges,
}

impl<P: Projector, R: Renderer> MapContext<P, R> {
    pub fn new(projector: P, renderer: R) -> Self {
        Self {
            projector,
            renderer,
            radius_ranges: RadiusRanges::default(),
        }
    }

    pub fn with_radius_ranges(mut self, radius_ranges: RadiusRanges) -> Self {
        self.radius_ranges = radius_ranges;
        self
    }
}

struct Dataset {
    stations: Vec<Station>,
    trips: Vec<Trip>,
}

/// Per-pass derived state, replaced wholesale on every filter change.
struct Derived {
    traffic: TrafficTable,
    radius: RadiusScale,
    trip_count: usize,
}

pub struct RecomputePipeline<P, R> {
    context: MapContext<P, R>,
    filter: TimeFilter,
    data: Option<Dataset>,
    derived: Option<Derived>,
    positions: Vec<ScreenPoint>,
}

impl<P: Projector, R: Renderer> RecomputePipeline<P, R> {
    pub fn new(context: MapContext<P, R>) -> Self {
        Self {
            context,
            filter: TimeFilter::Unset,
            data: None,
            derived: None,
            positions: Vec::new(),
        }
    }

    pub fn context(&self) -> &MapContext<P, R> {
        &self.context
    }

    /// Mutable access for moving the view before calling
    /// [`on_viewport_change`](Self::on_viewport_change).
    pub fn context_mut(&mut self) -> &mut MapContext<P, R> {
        &mut self.context
    }

    pub fn filter(&self) -> TimeFilter {
        self.filter
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Joins the two source loads. Aggregation only runs when both succeeded;
    /// otherwise an empty snapshot is published and the failure returned.
    #[tracing::instrument(skip_all)]
    pub fn load(
        &mut self,
        stations: Result<Vec<Station>>,
        trips: Result<Vec<Trip>>,
    ) -> Result<(), LoadError> {
        let (stations, trips) = match (stations, trips) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(e), Ok(_)) => return Err(self.fail_load(LoadError::Stations(e))),
            (Ok(_), Err(e)) => return Err(self.fail_load(LoadError::Trips(e))),
            (Err(stations), Err(trips)) => {
                return Err(self.fail_load(LoadError::Both { stations, trips }));
            }
        };

        info!(
            stations = stations.len(),
            trips = trips.len(),
            "Source data loaded"
        );

        self.data = Some(Dataset { stations, trips });
        self.reproject();
        self.recompute();
        self.publish();
        Ok(())
    }

    /// Applies a new slider value: refilter, reaggregate, refit the radius
    /// scale and publish.
    ///
    /// An out-of-range value is rejected and nothing changes. Before the data
    /// has loaded the value is only remembered.
    #[tracing::instrument(skip(self))]
    pub fn on_filter_change(&mut self, slider_value: i32) -> Result<(), TimeFilterError> {
        let filter = TimeFilter::from_slider(slider_value)?;
        self.filter = filter;

        if self.data.is_none() {
            debug!("Filter recorded before data load");
            return Ok(());
        }

        self.recompute();
        self.publish();
        Ok(())
    }

    /// Re-projects every station and republishes without touching traffic.
    pub fn on_viewport_change(&mut self) {
        if self.data.is_none() {
            return;
        }
        self.reproject();
        self.publish();
    }

    fn fail_load(&mut self, err: LoadError) -> LoadError {
        error!(error = %err, "Source data failed to load, skipping aggregation");
        self.data = None;
        self.derived = None;
        self.positions.clear();
        self.context.renderer.render(&Snapshot::empty(self.filter));
        err
    }

    fn recompute(&mut self) {
        let Some(data) = &self.data else {
            return;
        };

        let filtered = filter_by_time(&data.trips, self.filter);
        let trip_count = filtered.len();
        let traffic = compute_traffic(&data.stations, filtered);
        let range = self.context.radius_ranges.for_filter(self.filter);
        let radius = RadiusScale::fit(&traffic, range);

        debug!(
            filter = self.filter.to_slider(),
            trip_count,
            max_traffic = radius.domain_max(),
            "Traffic recomputed"
        );

        self.derived = Some(Derived {
            traffic,
            radius,
            trip_count,
        });
    }

    fn reproject(&mut self) {
        let Some(data) = &self.data else {
            return;
        };
        let projector = &self.context.projector;

        self.positions = data
            .stations
            .iter()
            .map(|s| {
                projector.project(s.coordinate).unwrap_or_else(|e| {
                    warn!(station = %s.id, error = %e, "Projection failed, using origin");
                    ScreenPoint::ORIGIN
                })
            })
            .collect();
    }

    fn publish(&mut self) {
        let snapshot = self.build_snapshot();
        self.context.renderer.render(&snapshot);
    }

    fn build_snapshot(&self) -> Snapshot {
        let (Some(data), Some(derived)) = (&self.data, &self.derived) else {
            return Snapshot::empty(self.filter);
        };

        let markers = data
            .stations
            .iter()
            .enumerate()
            .map(|(i, station)| {
                let traffic = derived.traffic.get(i).copied().unwrap_or_default();
                let position = self.positions.get(i).copied().unwrap_or(ScreenPoint::ORIGIN);
                marker(station, traffic, position, &derived.radius)
            })
            .collect();

        Snapshot {
            generated_at: Utc::now(),
            time_filter: self.filter.to_slider(),
            trip_count: derived.trip_count,
            markers,
        }
    }
}

fn marker(
    station: &Station,
    traffic: StationTraffic,
    position: ScreenPoint,
    radius: &RadiusScale,
) -> StationMarker {
    StationMarker {
        id: station.id.clone(),
        x: position.x,
        y: position.y,
        radius: radius.scale(traffic.total_traffic),
        flow_level: FlowLevel::for_traffic(&traffic),
        total_traffic: traffic.total_traffic,
        departures: traffic.departures,
        arrivals: traffic.arrivals,
    }
}

/// Renderer that keeps the most recent snapshot.
#[derive(Debug, Default)]
pub struct LatestSnapshot {
    latest: Option<Snapshot>,
    renders: usize,
}

impl LatestSnapshot {
    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Renderer for LatestSnapshot {
    fn render(&mut self, snapshot: &Snapshot) {
        self.latest = Some(snapshot.clone());
        self.renders += 1;
    }
}
