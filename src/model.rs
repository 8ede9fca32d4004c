//! Station and trip records as decoded from the source files.

use anyhow::{Context, bail};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::str::FromStr;

/// Geographic coordinate in degrees.
///
/// Decoding is lenient: numeric strings are accepted, and a null, missing or
/// unparseable component becomes NaN so the station survives and only fails
/// to project.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinate {
    #[serde(default = "degrees::missing", deserialize_with = "degrees::deserialize")]
    pub lat: f64,
    #[serde(default = "degrees::missing", deserialize_with = "degrees::deserialize")]
    pub lon: f64,
}

impl FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parses `"lat,lon"`, e.g. `"42.36,-71.09"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((lat, lon)) = s.split_once(',') else {
            bail!("expected 'lat,lon', got '{s}'");
        };
        let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in '{s}'"))?;
        let lon: f64 = lon.trim().parse().with_context(|| format!("bad longitude in '{s}'"))?;
        Ok(Coordinate { lat, lon })
    }
}

mod degrees {
    use serde::{Deserializer, de};
    use std::fmt;

    pub fn missing() -> f64 {
        f64::NAN
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DegreesVisitor)
    }

    struct DegreesVisitor;

    impl<'de> de::Visitor<'de> for DegreesVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "degrees as a number, numeric string or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            Ok(v.trim().parse().unwrap_or(f64::NAN))
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::NAN)
        }
    }
}

/// Position of a station in screen space, as returned by a [`crate::pipeline::Projector`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Fallback position for stations that cannot be projected.
    pub const ORIGIN: ScreenPoint = ScreenPoint { x: 0.0, y: 0.0 };
}

/// A bike-share dock. Identity and coordinate never change after load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    /// Short code that trip records reference (`short_name` in the Bluebikes feed).
    #[serde(rename = "short_name", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl Station {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            coordinate: Coordinate { lat, lon },
        }
    }
}

/// A single rental, one row of the trip CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub start_station_id: String,
    pub end_station_id: String,
    #[serde(with = "timestamp_format")]
    pub started_at: NaiveDateTime,
    #[serde(with = "timestamp_format")]
    pub ended_at: NaiveDateTime,
}

impl Trip {
    pub fn new(
        start_station_id: impl Into<String>,
        end_station_id: impl Into<String>,
        started_at: NaiveDateTime,
        ended_at: NaiveDateTime,
    ) -> Self {
        Self {
            start_station_id: start_station_id.into(),
            end_station_id: end_station_id.into(),
            started_at,
            ended_at,
        }
    }
}

/// Wall-clock timestamps as they appear in trip exports.
///
/// Accepts `2024-03-01 08:15:00`, an optional fractional second, a `T`
/// separator, or a full RFC 3339 string (whose local wall-clock part is kept).
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserializer, de};
    use std::fmt;

    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_local()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TimestampVisitor)
    }

    struct TimestampVisitor;

    impl<'de> de::Visitor<'de> for TimestampVisitor {
        type Value = NaiveDateTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "timestamp formatted eg. \"2024-03-01 08:15:00\"")
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse(s).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp '{s}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_station_from_bluebikes_entry() {
        let json = r#"{
            "short_name": "A32019",
            "name": "Landmark Center",
            "lat": 42.3436,
            "lon": -71.1029,
            "capacity": 19
        }"#;
        let station: Station = serde_json::from_str(json).unwrap();

        assert_eq!(station.id, "A32019");
        assert_eq!(station.name.as_deref(), Some("Landmark Center"));
        assert_eq!(station.coordinate.lat, 42.3436);
        assert_eq!(station.coordinate.lon, -71.1029);
    }

    #[test]
    fn test_station_accepts_id_alias() {
        let station: Station = serde_json::from_str(r#"{"id":"B1","lat":1.0,"lon":2.0}"#).unwrap();
        assert_eq!(station.id, "B1");
        assert!(station.name.is_none());
    }

    #[test]
    fn test_station_malformed_coordinate_is_kept() {
        let station: Station =
            serde_json::from_str(r#"{"short_name":"X","lat":null,"lon":"east"}"#).unwrap();
        assert_eq!(station.id, "X");
        assert!(station.coordinate.lat.is_nan());
        assert!(station.coordinate.lon.is_nan());

        let missing: Station = serde_json::from_str(r#"{"short_name":"Y","lat":1.0}"#).unwrap();
        assert_eq!(missing.coordinate.lat, 1.0);
        assert!(missing.coordinate.lon.is_nan());
    }

    #[test]
    fn test_station_numeric_string_coordinate() {
        let station: Station =
            serde_json::from_str(r#"{"short_name":"C","lat":"42.35","lon":" -71.06 "}"#).unwrap();
        assert_eq!(station.coordinate.lat, 42.35);
        assert_eq!(station.coordinate.lon, -71.06);
    }

    #[test]
    fn test_station_without_id_is_rejected() {
        let result: Result<Station, _> = serde_json::from_str(r#"{"lat":1.0,"lon":2.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_coordinate_from_str() {
        let c: Coordinate = "42.36, -71.09".parse().unwrap();
        assert_eq!(c, Coordinate { lat: 42.36, lon: -71.09 });
        assert!("42.36".parse::<Coordinate>().is_err());
        assert!("north,-71".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();

        assert_eq!(timestamp_format::parse("2024-03-01 08:15:00"), Some(expected));
        assert_eq!(timestamp_format::parse("2024-03-01T08:15:00"), Some(expected));
        assert_eq!(
            timestamp_format::parse("2024-03-01 08:15:00.123").map(|t| t.minute()),
            Some(15)
        );
        assert_eq!(timestamp_format::parse("2024-03-01T08:15:00-05:00"), Some(expected));
        assert_eq!(timestamp_format::parse("yesterday"), None);
    }
}
