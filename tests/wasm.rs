#![cfg(target_arch = "wasm32")]

use gpx_interchange::{convert_gpx, gpx_to_geojson};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"><name>Test</name></wpt>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="35.1" lon="139.1"/></trkseg></trk>
</gpx>"#;

#[wasm_bindgen_test]
fn convert_to_each_format() {
    for format in ["xml", "json", "geojson-points", "geojson-lines"] {
        let out = convert_gpx(GPX, format, JsValue::UNDEFINED).unwrap();
        assert!(!out.is_empty());
    }
}

#[wasm_bindgen_test]
fn unknown_format_is_an_error() {
    assert!(convert_gpx(GPX, "kml", JsValue::UNDEFINED).is_err());
}

#[wasm_bindgen_test]
fn geojson_object() {
    let value = gpx_to_geojson(GPX, JsValue::NULL).unwrap();
    assert!(value.is_object());
}
