use chrono::{TimeZone, Utc};
use geojson::{FeatureCollection, Value};
use gpx_interchange::gpx_types::{GpxPoint, GpxSegment, GpxTrack};
use gpx_interchange::{GeoJsonMode, GpxFile, RenderOptions, parse_gpx};
use pretty_assertions::assert_eq;
use serde_json::json;

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn geojson(gpx: &GpxFile, mode: GeoJsonMode) -> FeatureCollection {
    gpx.to_geojson(mode, &RenderOptions::default()).unwrap()
}

fn compact() -> RenderOptions {
    RenderOptions {
        pretty_print: false,
        ..Default::default()
    }
}

/// One track, one segment, two points, the second without elevation.
fn two_point_track() -> GpxFile {
    GpxFile {
        tracks: vec![GpxTrack {
            segments: vec![GpxSegment::new(vec![
                GpxPoint::new(48.1, 17.1).with_ele(150.0),
                GpxPoint::new(48.2, 17.2),
            ])],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn test_two_point_track_points() {
    let fc = geojson(&two_point_track(), GeoJsonMode::Points);
    assert_eq!(fc.features.len(), 2);

    let dims: Vec<usize> = fc
        .features
        .iter()
        .map(|f| match &f.geometry.as_ref().unwrap().value {
            Value::Point(coords) => coords.len(),
            _ => panic!("Expected Point"),
        })
        .collect();
    assert_eq!(dims, vec![3, 2]);
}

#[test]
fn test_two_point_track_lines() {
    let json: serde_json::Value = serde_json::from_str(
        &two_point_track()
            .to_geojson_string(GeoJsonMode::Lines, &compact())
            .unwrap(),
    )
    .unwrap();

    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["geometry"]["type"], "LineString");
    assert_eq!(
        features[0]["geometry"]["coordinates"],
        json!([[17.1, 48.1, 150.0], [17.2, 48.2]])
    );
}

#[test]
fn test_garmin_activity_model() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    assert_eq!(gpx.creator(), "Garmin Connect");
    assert_eq!(
        gpx.metadata.as_ref().and_then(|m| m.name.as_deref()),
        Some("Bratislava loop")
    );
    assert_eq!(gpx.waypoints.len(), 1);
    assert_eq!(gpx.routes.len(), 1);
    assert_eq!(gpx.tracks.len(), 2);
    assert_eq!(gpx.tracks[0].segments.len(), 2);

    let first = &gpx.tracks[0].segments[0].points[0];
    let tpx = first.extensions.as_ref().unwrap().track_point.as_ref().unwrap();
    assert_eq!(tpx.hr, Some(98.0));
    assert_eq!(tpx.cad, Some(70.0));

    let track_ext = &gpx.tracks[0].extensions.as_ref().unwrap().unsupported[0];
    assert_eq!(track_ext.qualified_name(), "gpxx:TrackExtension");
}

#[test]
fn test_feature_counts() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let track_points: usize = gpx.tracks.iter().map(GpxTrack::point_count).sum();

    let points = geojson(&gpx, GeoJsonMode::Points);
    assert_eq!(points.features.len(), track_points + gpx.waypoints.len());
    assert_eq!(points.features.len(), 5);

    let lines = geojson(&gpx, GeoJsonMode::Lines);
    assert_eq!(lines.features.len(), gpx.tracks.len() + gpx.waypoints.len());
}

#[test]
fn test_point_mode_indices() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let fc = geojson(&gpx, GeoJsonMode::Points);

    let indices: Vec<(u64, u64, u64)> = fc.features[..4]
        .iter()
        .map(|f| {
            let p = f.properties.as_ref().unwrap();
            (
                p["track_index"].as_u64().unwrap(),
                p["segment_index"].as_u64().unwrap(),
                p["point_index"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(indices, vec![(0, 0, 0), (0, 0, 1), (0, 1, 0), (1, 0, 0)]);

    // zero elevation is present, so it stays in the geometry
    let cool_down = &fc.features[3];
    if let Value::Point(coords) = &cool_down.geometry.as_ref().unwrap().value {
        assert_eq!(coords, &vec![17.111, 48.151, 0.0]);
    } else {
        panic!("Expected Point");
    }

    let wpt = fc.features[4].properties.as_ref().unwrap();
    assert_eq!(wpt["name"], "Start");
    assert_eq!(wpt["cmt"], "Parking");
    assert_eq!(wpt["desc"], "Car park by the river");
    assert_eq!(wpt["type"], "Flag");
    assert_eq!(wpt["elevation"], 139.0);
    assert_eq!(wpt["time"], "2025-05-04T06:58:00+00:00");
}

#[test]
fn test_line_mode_times() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let opts = RenderOptions {
        datetime_format: "%H:%M:%S".to_string(),
        utc_offset_minutes: 120,
        ..Default::default()
    };
    let fc = gpx.to_geojson(GeoJsonMode::Lines, &opts).unwrap();

    let ride = fc.features[0].properties.as_ref().unwrap();
    assert_eq!(ride["name"], "Morning Ride");
    assert_eq!(ride["time"], "09:00:00");
    assert_eq!(ride["coordTimes"], json!(["09:00:00", "09:00:10", "09:05:00"]));

    let cool_down = fc.features[1].properties.as_ref().unwrap();
    assert!(cool_down["time"].is_null());
    assert_eq!(cool_down["coordTimes"], json!([null]));
}

#[test]
fn test_xml_round_trip() {
    let original = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();

    for pretty in [true, false] {
        let opts = RenderOptions {
            pretty_print: pretty,
            ..Default::default()
        };
        let xml = original.to_xml_string(&opts).unwrap();
        let reparsed = parse_gpx(&xml).unwrap();
        assert_eq!(reparsed, original);
    }
}

#[test]
fn test_xml_namespaces_declared_once() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let xml = gpx.to_xml_string(&compact()).unwrap();

    assert_eq!(xml.matches("xmlns:gpxtpx=").count(), 1);
    assert_eq!(xml.matches("xmlns:gpxx=").count(), 1);
    assert!(xml.contains(
        "http://www.garmin.com/xmlschemas/TrackPointExtension/v1 http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd"
    ));
    assert!(xml.contains(
        "http://www.garmin.com/xmlschemas/GpxExtensions/v3 http://www8.garmin.com/xmlschemas/GpxExtensionsv3.xsd"
    ));
    assert!(xml.contains("<gpxtpx:hr>98</gpxtpx:hr>"));
    assert!(xml.contains("<ele>0</ele>"));
}

#[test]
fn test_xml_element_order() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let xml = gpx.to_xml_string(&RenderOptions::default()).unwrap();

    let positions: Vec<usize> = ["<metadata>", "<wpt ", "<rte>", "<trk>"]
        .iter()
        .map(|tag| xml.find(tag).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_json_tree() {
    let gpx = parse_gpx(&load_fixture("garmin_activity.gpx")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&gpx.to_json(&compact()).unwrap()).unwrap();

    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(
        keys,
        vec!["creator", "metadata", "waypoints", "routes", "tracks", "extensions"]
    );
    assert_eq!(json["creator"], "Garmin Connect");
    assert_eq!(json["metadata"]["name"], "Bratislava loop");
    assert!(json["extensions"].is_null());
    assert_eq!(json["routes"][0]["points"].as_array().unwrap().len(), 2);

    let point = &json["tracks"][0]["segments"][0]["points"][0];
    assert_eq!(point["ele"], 140.2);
    assert_eq!(point["time"], "2025-05-04T07:00:00+00:00");
    assert_eq!(point["extensions"]["trackPointExtension"]["hr"], 98.0);
    assert!(point["extensions"]["trackPointExtension"]["atemp"].is_null());
}

#[test]
fn test_empty_document() {
    let gpx = parse_gpx(&load_fixture("empty.gpx")).unwrap();
    assert_eq!(gpx, GpxFile::default());

    assert!(geojson(&gpx, GeoJsonMode::Points).features.is_empty());
    assert!(geojson(&gpx, GeoJsonMode::Lines).features.is_empty());

    let tree = gpx.to_array(&RenderOptions::default()).unwrap();
    assert_eq!(
        tree,
        json!({
            "creator": gpx_interchange::gpx_types::DEFAULT_CREATOR,
            "metadata": null,
            "waypoints": [],
            "routes": [],
            "tracks": [],
            "extensions": null,
        })
    );
}

#[test]
fn test_no_namespace() {
    let gpx = parse_gpx(&load_fixture("no_namespace.gpx")).unwrap();
    let fc = geojson(&gpx, GeoJsonMode::Lines);
    assert_eq!(fc.features.len(), 2);
    assert!(matches!(
        fc.features[0].geometry.as_ref().unwrap().value,
        Value::LineString(_)
    ));
    assert!(matches!(
        fc.features[1].geometry.as_ref().unwrap().value,
        Value::Point(_)
    ));
}

#[test]
fn test_cdata_and_entities() {
    let gpx = parse_gpx(&load_fixture("cdata_and_entities.gpx")).unwrap();
    let wpt = &gpx.waypoints[0];
    assert_eq!(wpt.name.as_deref(), Some("Café & Bar <Tokyo>"));
    assert_eq!(wpt.desc.as_deref(), Some("Special chars: & < > \" '"));
    assert_eq!(wpt.cmt.as_deref(), Some("日本語テスト: 東京タワー"));

    let xml = gpx.to_xml_string(&compact()).unwrap();
    assert!(xml.contains("Café &amp; Bar &lt;Tokyo&gt;"));
    assert_eq!(parse_gpx(&xml).unwrap(), gpx);
}

#[test]
fn test_built_document_with_times() {
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
    let mut gpx = GpxFile::with_creator("builder");
    gpx.tracks.push(GpxTrack {
        name: Some("Run".to_string()),
        segments: vec![GpxSegment::new(vec![
            GpxPoint::new(35.0, 139.0).with_time(t0),
            GpxPoint::new(35.001, 139.001),
        ])],
        ..Default::default()
    });

    let xml = gpx.to_xml_string(&compact()).unwrap();
    assert!(xml.contains("creator=\"builder\""));
    assert!(
        xml.contains("<trkpt lat=\"35\" lon=\"139\"><time>2025-01-01T06:00:00Z</time></trkpt>")
    );
    assert!(xml.contains("<trkpt lat=\"35.001\" lon=\"139.001\"/>"));
}

fn assert_round_trip(gpx: &GpxFile) -> String {
    let xml = gpx.to_xml_string(&compact()).unwrap();
    assert_eq!(&parse_gpx(&xml).unwrap(), gpx);
    xml
}

#[test]
fn test_default_namespace_extensions_round_trip() {
    let gpx = parse_gpx(
        r#"<?xml version="1.0"?>
<gpx version="1.1" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="48.1" lon="17.1">
    <extensions>
      <TrackPointExtension xmlns="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
        <hr>140</hr>
      </TrackPointExtension>
      <Power xmlns="http://example.com/power"><watts>250</watts></Power>
    </extensions>
  </wpt>
</gpx>"#,
    )
    .unwrap();
    let ext = gpx.waypoints[0].extensions.as_ref().unwrap();
    assert_eq!(ext.track_point.as_ref().unwrap().hr, Some(140.0));

    let xml = assert_round_trip(&gpx);
    assert!(xml.contains(
        "<TrackPointExtension xmlns=\"http://www.garmin.com/xmlschemas/TrackPointExtension/v1\">\
         <hr>140</hr></TrackPointExtension>"
    ));
    assert!(xml.contains("<Power xmlns=\"http://example.com/power\"><watts>250</watts></Power>"));
    assert!(!xml.contains("xmlns:=\""));
}

#[test]
fn test_track_point_extension_v2_round_trip() {
    let gpx = parse_gpx(
        r#"<?xml version="1.0"?>
<gpx version="1.1" xmlns:ns3="http://www.garmin.com/xmlschemas/TrackPointExtension/v2">
  <trk><trkseg>
    <trkpt lat="48.1" lon="17.1">
      <extensions>
        <ns3:TrackPointExtension>
          <ns3:speed>3.5</ns3:speed>
          <ns3:course>270</ns3:course>
        </ns3:TrackPointExtension>
      </extensions>
    </trkpt>
  </trkseg></trk>
</gpx>"#,
    )
    .unwrap();

    let xml = assert_round_trip(&gpx);
    assert!(xml.contains("xmlns:ns3=\"http://www.garmin.com/xmlschemas/TrackPointExtension/v2\""));
    assert!(xml.contains("<ns3:speed>3.5</ns3:speed><ns3:course>270</ns3:course>"));
    assert!(!xml.contains("TrackPointExtension/v1"));
    assert!(!xml.contains("TrackPointExtensionv1.xsd"));
}

#[test]
fn test_attribute_namespace_round_trip() {
    let gpx = parse_gpx(
        r#"<?xml version="1.0"?>
<gpx version="1.1" xmlns:x="http://example.com/x">
  <extensions><note x:lang="en">hi</note></extensions>
</gpx>"#,
    )
    .unwrap();

    let xml = assert_round_trip(&gpx);
    assert!(xml.contains("xmlns:x=\"http://example.com/x\""));
    assert!(xml.contains("<note x:lang=\"en\">hi</note>"));
}

#[test]
fn test_empty_containers_round_trip() {
    let gpx = parse_gpx(
        r#"<?xml version="1.0"?>
<gpx version="1.1">
  <metadata/>
  <wpt lat="48.1" lon="17.1"><extensions/></wpt>
  <extensions/>
</gpx>"#,
    )
    .unwrap();
    assert!(gpx.metadata.is_some());

    let xml = assert_round_trip(&gpx);
    assert!(xml.contains("<metadata/>"));
    assert!(!xml.contains("<extensions"));
}

#[test]
fn test_extension_text_round_trip() {
    let gpx = parse_gpx(
        r#"<?xml version="1.0"?>
<gpx version="1.1"><extensions><payload> 12  34 </payload></extensions></gpx>"#,
    )
    .unwrap();
    let xml = assert_round_trip(&gpx);
    assert!(xml.contains("<payload> 12  34 </payload>"));
}
