use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::GpxError;

/// Options applied when rendering a document to any output encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Indent XML and JSON output (default: true)
    #[serde(default = "default_true")]
    pub pretty_print: bool,

    /// chrono strftime pattern for timestamps in JSON and GeoJSON (default: ISO 8601)
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,

    /// Output timezone as a fixed offset east of UTC, in minutes (default: 0)
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// GeoJSON projection used when no explicit mode is given (default: points)
    #[serde(default)]
    pub geojson_mode: GeoJsonMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty_print: true,
            datetime_format: default_datetime_format(),
            utc_offset_minutes: 0,
            geojson_mode: GeoJsonMode::default(),
        }
    }
}

/// The two GeoJSON projections of a document's tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoJsonMode {
    /// One Point feature per track point.
    #[default]
    Points,
    /// One LineString feature per track.
    Lines,
}

/// Encodings a document can be saved as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xml,
    Json,
    GeoJson(GeoJsonMode),
}

impl FromStr for OutputFormat {
    type Err = GpxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            "geojson-points" => Ok(Self::GeoJson(GeoJsonMode::Points)),
            "geojson-lines" => Ok(Self::GeoJson(GeoJsonMode::Lines)),
            other => Err(GpxError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xml => "xml",
            Self::Json => "json",
            Self::GeoJson(GeoJsonMode::Points) => "geojson-points",
            Self::GeoJson(GeoJsonMode::Lines) => "geojson-lines",
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_datetime_format() -> String {
    "%Y-%m-%dT%H:%M:%S%:z".to_string()
}
