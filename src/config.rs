use anyhow::{Context, Result};
use serde::Deserialize;

use crate::projection::MercatorViewport;
use crate::scale::RadiusRanges;

/// Display settings read from a JSON file; every field is optional:
/// ```json
/// {
///   "radius_ranges": {
///     "unfiltered": { "min": 0, "max": 25 },
///     "filtered": { "min": 3, "max": 50 }
///   },
///   "viewport": { "center": { "lat": 42.36, "lon": -71.09 }, "zoom": 12 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub radius_ranges: RadiusRanges,
    pub viewport: MercatorViewport,
}

impl AppConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("parsing config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads `path` when given, otherwise falls back to defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::from_json(
            r#"{"radius_ranges": {"filtered": {"min": 5, "max": 40}}, "viewport": {"zoom": 14}}"#,
        )
        .unwrap();

        assert_eq!(config.radius_ranges.filtered.min, 5.0);
        assert_eq!(config.radius_ranges.filtered.max, 40.0);
        assert_eq!(
            config.radius_ranges.unfiltered,
            RadiusRanges::default().unfiltered
        );
        assert_eq!(config.viewport.zoom, 14.0);
        assert_eq!(config.viewport.width, MercatorViewport::default().width);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load("/nonexistent/bikeshare.json").is_err());
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
    }
}
