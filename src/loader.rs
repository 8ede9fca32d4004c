//! Loading station and trip sources from local files or HTTP(S) URLs.
//!
//! Parsing is lenient per record: a station entry or trip row that fails to
//! decode is logged and skipped, and the remainder still loads.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::model::{Station, Trip};

/// Station list layouts accepted on input.
#[derive(Deserialize)]
#[serde(untagged)]
enum StationFeed {
    /// GBFS-style `{"data": {"stations": [...]}}`.
    Wrapped { data: StationData },
    Bare(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
struct StationData {
    stations: Vec<serde_json::Value>,
}

/// Decodes a station list. Entries that fail to decode and repeated ids are skipped.
pub fn parse_stations(bytes: &[u8]) -> Result<Vec<Station>> {
    let feed: StationFeed = serde_json::from_slice(bytes).context("station list is not valid JSON")?;
    let entries = match feed {
        StationFeed::Wrapped { data } => data.stations,
        StationFeed::Bare(entries) => entries,
    };

    let mut seen = HashSet::new();
    let mut stations = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Station>(entry) {
            Ok(station) if seen.insert(station.id.clone()) => stations.push(station),
            Ok(station) => {
                warn!(index, station = %station.id, "Duplicate station id, keeping first");
                skipped += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping undecodable station");
                skipped += 1;
            }
        }
    }

    debug!(loaded = stations.len(), skipped, "Stations parsed");
    Ok(stations)
}

/// Decodes a trip CSV with a header row. Undecodable rows are skipped.
pub fn parse_trips(bytes: &[u8]) -> Result<Vec<Trip>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    rdr.headers().context("trip CSV has no readable header")?;

    let mut trips = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.deserialize::<Trip>().enumerate() {
        match result {
            Ok(trip) => trips.push(trip),
            Err(e) => {
                warn!(row, error = %e, "Skipping undecodable trip");
                skipped += 1;
            }
        }
    }

    debug!(loaded = trips.len(), skipped, "Trips parsed");
    Ok(trips)
}

/// Reads `source` from disk, or over HTTP when it looks like a URL.
#[tracing::instrument(skip(client))]
pub async fn read_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source).await
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("reading '{source}'"))
    }
}

pub async fn load_stations<C: HttpClient>(client: &C, source: &str) -> Result<Vec<Station>> {
    let bytes = read_source(client, source).await?;
    parse_stations(&bytes).with_context(|| format!("parsing stations from '{source}'"))
}

pub async fn load_trips<C: HttpClient>(client: &C, source: &str) -> Result<Vec<Trip>> {
    let bytes = read_source(client, source).await?;
    parse_trips(&bytes).with_context(|| format!("parsing trips from '{source}'"))
}

/// Loads both sources concurrently and returns each outcome separately, so
/// the caller can decide what a partial failure means.
#[tracing::instrument]
pub async fn load_sources(
    stations_source: &str,
    trips_source: &str,
) -> (Result<Vec<Station>>, Result<Vec<Trip>>) {
    let client = BasicClient::new();
    let (stations, trips) = tokio::join!(
        load_stations(&client, stations_source),
        load_trips(&client, trips_source),
    );

    if let (Ok(s), Ok(t)) = (&stations, &trips) {
        info!(stations = s.len(), trips = t.len(), "Sources ready");
    }
    (stations, trips)
}
