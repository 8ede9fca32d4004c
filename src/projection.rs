//! Web-mercator viewport used as the default [`Projector`].

use anyhow::{Result, bail};
use serde::Deserialize;
use std::f64::consts::PI;

use crate::model::{Coordinate, ScreenPoint};
use crate::pipeline::Projector;

/// Latitude limit of the web-mercator projection.
pub const MAX_LATITUDE: f64 = 85.051129;
/// Size of one map tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 512.0;

pub const MIN_ZOOM: f64 = 5.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Camera state of the map: what is centered, how far zoomed, how big the canvas is.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MercatorViewport {
    pub center: Coordinate,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for MercatorViewport {
    /// Cambridge/Boston, where the Bluebikes network lives.
    fn default() -> Self {
        Self {
            center: Coordinate {
                lat: 42.36027,
                lon: -71.09415,
            },
            zoom: 12.0,
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl MercatorViewport {
    pub fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    /// Sets the zoom level, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    /// Absolute world pixel coordinates at the current zoom.
    fn world_point(&self, c: Coordinate) -> Result<(f64, f64)> {
        if !c.lat.is_finite() || !c.lon.is_finite() {
            bail!("non-finite coordinate ({}, {})", c.lat, c.lon);
        }
        if c.lat.abs() > MAX_LATITUDE {
            bail!("latitude {} outside mercator bounds", c.lat);
        }

        let size = self.world_size();
        let x = (c.lon + 180.0) / 360.0 * size;
        let y = (180.0 - (180.0 / PI) * (PI / 4.0 + c.lat * PI / 360.0).tan().ln()) * size / 360.0;
        Ok((x, y))
    }
}

impl Projector for MercatorViewport {
    fn project(&self, coordinate: Coordinate) -> Result<ScreenPoint> {
        let (cx, cy) = self.world_point(self.center)?;
        let (x, y) = self.world_point(coordinate)?;

        Ok(ScreenPoint {
            x: x - cx + self.width / 2.0,
            y: y - cy + self.height / 2.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_projects_to_middle() {
        let vp = MercatorViewport::default();
        let p = vp.project(vp.center).unwrap();

        assert!((p.x - 512.0).abs() < 1e-9);
        assert!((p.y - 384.0).abs() < 1e-9);
    }

    #[test]
    fn test_east_and_north_directions() {
        let vp = MercatorViewport::default();
        let east = vp
            .project(Coordinate {
                lat: vp.center.lat,
                lon: vp.center.lon + 0.01,
            })
            .unwrap();
        let north = vp
            .project(Coordinate {
                lat: vp.center.lat + 0.01,
                lon: vp.center.lon,
            })
            .unwrap();

        assert!(east.x > 512.0);
        assert!(north.y < 384.0);
    }

    #[test]
    fn test_zoom_doubles_offsets() {
        let mut vp = MercatorViewport::default();
        let target = Coordinate {
            lat: vp.center.lat,
            lon: vp.center.lon + 0.01,
        };
        let dx12 = vp.project(target).unwrap().x - 512.0;
        vp.set_zoom(13.0);
        let dx13 = vp.project(target).unwrap().x - 512.0;

        assert!((dx13 - 2.0 * dx12).abs() < 1e-6);
    }

    #[test]
    fn test_set_center_moves_target_to_middle() {
        let mut vp = MercatorViewport::default();
        let target = Coordinate {
            lat: 42.3478,
            lon: -71.0756,
        };
        assert!(vp.project(target).unwrap().x > 512.0);

        vp.set_center(target);
        let p = vp.project(target).unwrap();
        assert!((p.x - 512.0).abs() < 1e-9);
        assert!((p.y - 384.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_shifts_by_half_the_growth() {
        let mut vp = MercatorViewport::default();
        let target = Coordinate {
            lat: 42.35,
            lon: -71.10,
        };
        let before = vp.project(target).unwrap();
        vp.resize(1224.0, 968.0);
        let after = vp.project(target).unwrap();

        assert!((after.x - before.x - 100.0).abs() < 1e-9);
        assert!((after.y - before.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = MercatorViewport::default();
        vp.set_zoom(30.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.set_zoom(1.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_invalid_coordinates_fail() {
        let vp = MercatorViewport::default();
        assert!(vp.project(Coordinate { lat: 89.9, lon: 0.0 }).is_err());
        assert!(
            vp.project(Coordinate {
                lat: f64::NAN,
                lon: 0.0
            })
            .is_err()
        );
    }
}
