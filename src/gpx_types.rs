use chrono::{DateTime, Utc};

use crate::extensions::Extensions;

/// A single GPX point (used for wpt, rtept, trkpt).
#[derive(Debug, Clone, PartialEq)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub magvar: Option<f64>,
    pub geoid_height: Option<f64>,
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub sym: Option<String>,
    pub point_type: Option<String>,
    pub fix: Option<String>,
    pub sat: Option<u32>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub age_of_dgps_data: Option<f64>,
    pub dgps_id: Option<u32>,
    pub extensions: Option<Extensions>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
            magvar: None,
            geoid_height: None,
            name: None,
            cmt: None,
            desc: None,
            src: None,
            links: Vec::new(),
            sym: None,
            point_type: None,
            fix: None,
            sat: None,
            hdop: None,
            vdop: None,
            pdop: None,
            age_of_dgps_data: None,
            dgps_id: None,
            extensions: None,
        }
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// `[lon, lat]`, or `[lon, lat, ele]` whenever an elevation is present.
    pub fn coordinates(&self) -> Vec<f64> {
        match self.ele {
            Some(ele) => vec![self.lon, self.lat, ele],
            None => vec![self.lon, self.lat],
        }
    }
}

/// A GPX link element.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxLink {
    pub href: String,
    pub text: Option<String>,
    pub link_type: Option<String>,
}

impl GpxLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: None,
            link_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxPerson {
    pub name: Option<String>,
    /// Full address; rendered as `<email id=".." domain=".."/>`.
    pub email: Option<String>,
    pub link: Option<GpxLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpxCopyright {
    pub author: String,
    pub year: Option<i32>,
    pub license: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpxBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// Document-level `<metadata>` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxMetadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<GpxPerson>,
    pub copyright: Option<GpxCopyright>,
    pub links: Vec<GpxLink>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,
    pub bounds: Option<GpxBounds>,
    pub extensions: Option<Extensions>,
}

/// A GPX route (<rte>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxRoute {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub route_type: Option<String>,
    pub extensions: Option<Extensions>,
    pub points: Vec<GpxPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub extensions: Option<Extensions>,
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    /// All points of all segments, in segment order.
    pub fn points(&self) -> impl Iterator<Item = &GpxPoint> {
        self.segments.iter().flat_map(|seg| seg.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|seg| seg.points.len()).sum()
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
    pub extensions: Option<Extensions>,
}

impl GpxSegment {
    pub fn new(points: Vec<GpxPoint>) -> Self {
        Self {
            points,
            extensions: None,
        }
    }
}

/// A complete GPX document: the aggregate root every encoding is rendered from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxFile {
    /// Falls back to [`DEFAULT_CREATOR`] when rendering.
    pub creator: Option<String>,
    pub metadata: Option<GpxMetadata>,
    pub waypoints: Vec<GpxPoint>,
    pub routes: Vec<GpxRoute>,
    pub tracks: Vec<GpxTrack>,
    pub extensions: Option<Extensions>,
}

pub const DEFAULT_CREATOR: &str = concat!("gpx-interchange/", env!("CARGO_PKG_VERSION"));

impl GpxFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creator(creator: impl Into<String>) -> Self {
        Self {
            creator: Some(creator.into()),
            ..Self::default()
        }
    }

    pub fn creator(&self) -> &str {
        self.creator.as_deref().unwrap_or(DEFAULT_CREATOR)
    }
}
