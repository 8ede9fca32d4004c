//! Output formatting and persistence for station snapshots.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::pipeline::{Snapshot, StationMarker};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row per station per snapshot, tagged with the slider value.
#[derive(Debug, Serialize)]
pub struct SweepRecord<'a> {
    pub time_filter: i32,
    pub station_id: &'a str,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub flow_level: f64,
    pub total_traffic: u32,
    pub departures: u32,
    pub arrivals: u32,
}

impl<'a> SweepRecord<'a> {
    pub fn new(time_filter: i32, marker: &'a StationMarker) -> Self {
        Self {
            time_filter,
            station_id: &marker.id,
            x: marker.x,
            y: marker.y,
            radius: marker.radius,
            flow_level: marker.flow_level.value(),
            total_traffic: marker.total_traffic,
            departures: marker.departures,
            arrivals: marker.arrivals,
        }
    }
}

/// Logs the busiest `top` stations of a snapshot with their tooltip text.
pub fn print_pretty(snapshot: &Snapshot, top: usize) {
    let mut markers: Vec<&StationMarker> = snapshot.markers.iter().collect();
    markers.sort_by(|a, b| b.total_traffic.cmp(&a.total_traffic));

    for m in markers.into_iter().take(top) {
        info!(station = %m.id, radius = m.radius, flow = m.flow_level.value(), "{}", m);
    }
    debug!("{:#?}", snapshot);
}

/// Logs a snapshot as pretty-printed JSON.
pub fn print_json(snapshot: &Snapshot) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Appends every marker of `snapshot` as a [`SweepRecord`] row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_snapshot(path: &str, snapshot: &Snapshot) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = snapshot.markers.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for marker in &snapshot.markers {
        writer.serialize(SweepRecord::new(snapshot.time_filter, marker))?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::FlowLevel;
    use chrono::Utc;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&create_snapshot(-1), 5);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&create_snapshot(-1)).unwrap();
    }

    #[test]
    fn test_append_snapshot_creates_file() {
        let path = temp_path("bikeshare_traffic_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_snapshot(&path, &create_snapshot(-1)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines[0],
            "time_filter,station_id,x,y,radius,flow_level,total_traffic,departures,arrivals"
        );
        assert_eq!(lines[1], "-1,A,10.0,20.0,25.0,0.5,4,2,2");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_snapshot_writes_header_once() {
        let path = temp_path("bikeshare_traffic_test_header.csv");
        let _ = fs::remove_file(&path);

        append_snapshot(&path, &create_snapshot(-1)).unwrap();
        append_snapshot(&path, &create_snapshot(480)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("time_filter")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 markers per snapshot
        assert_eq!(content.lines().count(), 5);

        fs::remove_file(&path).unwrap();
    }

    // Helper functions for tests
    fn create_snapshot(time_filter: i32) -> Snapshot {
        Snapshot {
            generated_at: Utc::now(),
            time_filter,
            trip_count: 3,
            markers: vec![
                StationMarker {
                    id: "A".to_string(),
                    x: 10.0,
                    y: 20.0,
                    radius: 25.0,
                    flow_level: FlowLevel::Balanced,
                    total_traffic: 4,
                    departures: 2,
                    arrivals: 2,
                },
                StationMarker {
                    id: "B".to_string(),
                    x: 30.0,
                    y: 40.0,
                    radius: 12.5,
                    flow_level: FlowLevel::Arrivals,
                    total_traffic: 1,
                    departures: 0,
                    arrivals: 1,
                },
            ],
        }
    }
}
