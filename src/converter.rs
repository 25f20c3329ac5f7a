use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue, json};

use crate::gpx_types::*;
use crate::options::GeoJsonMode;
use crate::serialization::scalar;
use crate::time_format::TimeFormatter;

pub const CRS_NAME: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";
pub const COLLECTION_NAME: &str = "track_points";

/// Project a document's tracks and waypoints to a GeoJSON FeatureCollection.
///
/// Track features come first, in track/segment/point order, followed by one
/// Point feature per standalone waypoint. Routes are not projected.
pub fn to_feature_collection(
    data: &GpxFile,
    mode: GeoJsonMode,
    fmt: &TimeFormatter<'_>,
) -> FeatureCollection {
    let mut features = Vec::new();

    match mode {
        GeoJsonMode::Points => {
            for (track_index, trk) in data.tracks.iter().enumerate() {
                features.extend(track_point_features(trk, track_index, fmt));
            }
        }
        GeoJsonMode::Lines => {
            for trk in &data.tracks {
                features.push(track_line_feature(trk, fmt));
            }
        }
    }

    for wpt in &data.waypoints {
        features.push(waypoint_to_feature(wpt, fmt));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(collection_members()),
    }
}

fn collection_members() -> Map<String, JsonValue> {
    let mut members = Map::new();
    members.insert(
        "crs".to_string(),
        json!({
            "type": "name",
            "properties": { "name": CRS_NAME },
        }),
    );
    members.insert(
        "name".to_string(),
        JsonValue::String(COLLECTION_NAME.to_string()),
    );
    members
}

fn track_point_features(
    trk: &GpxTrack,
    track_index: usize,
    fmt: &TimeFormatter<'_>,
) -> Vec<Feature> {
    let mut features = Vec::with_capacity(trk.point_count());
    for (segment_index, seg) in trk.segments.iter().enumerate() {
        for (point_index, pt) in seg.points.iter().enumerate() {
            let mut props = Map::new();
            props.insert("elevation".to_string(), scalar(&pt.ele));
            props.insert("track_index".to_string(), track_index.into());
            props.insert("segment_index".to_string(), segment_index.into());
            props.insert("point_index".to_string(), point_index.into());
            props.insert(
                "time".to_string(),
                scalar(&fmt.format_opt(pt.time.as_ref())),
            );
            features.push(point_feature(pt, props));
        }
    }
    features
}

fn track_line_feature(trk: &GpxTrack, fmt: &TimeFormatter<'_>) -> Feature {
    let coords: Vec<Vec<f64>> = trk.points().map(GpxPoint::coordinates).collect();
    let times: Vec<JsonValue> = trk
        .points()
        .map(|pt| scalar(&fmt.format_opt(pt.time.as_ref())))
        .collect();

    let mut props = Map::new();
    props.insert("name".to_string(), scalar(&trk.name));
    // null when the track is empty or its first point carries no time
    props.insert(
        "time".to_string(),
        times.first().cloned().unwrap_or(JsonValue::Null),
    );
    props.insert("coordTimes".to_string(), JsonValue::Array(times));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coords))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn waypoint_to_feature(pt: &GpxPoint, fmt: &TimeFormatter<'_>) -> Feature {
    let mut props = Map::new();
    props.insert("type".to_string(), scalar(&pt.point_type));
    props.insert("name".to_string(), scalar(&pt.name));
    props.insert("cmt".to_string(), scalar(&pt.cmt));
    props.insert("desc".to_string(), scalar(&pt.desc));
    props.insert("elevation".to_string(), scalar(&pt.ele));
    props.insert(
        "time".to_string(),
        scalar(&fmt.format_opt(pt.time.as_ref())),
    );
    point_feature(pt, props)
}

fn point_feature(pt: &GpxPoint, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(pt.coordinates()))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}
