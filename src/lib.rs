pub mod codec;
pub mod converter;
pub mod document;
pub mod error;
pub mod extensions;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod serialization;
pub mod time_format;
pub mod xml;

use wasm_bindgen::prelude::*;

pub use crate::error::GpxError;
pub use crate::gpx_types::GpxFile;
pub use crate::options::{GeoJsonMode, OutputFormat, RenderOptions};
pub use crate::parser::parse_gpx;

/// Convert a GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx = parse_gpx(gpx_string)?;
    let fc = gpx.to_geojson(opts.geojson_mode, &opts)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| js_sys::Error::new(&e.to_string()).into())
}

/// Convert a GPX string to `xml`, `json`, `geojson-points` or `geojson-lines` text.
#[wasm_bindgen(js_name = convertGpx)]
pub fn convert_gpx(gpx_string: &str, format: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let format: OutputFormat = format.parse()?;
    let opts = parse_options(options)?;
    let gpx = parse_gpx(gpx_string)?;
    Ok(gpx.render(format, &opts)?)
}

fn parse_options(options: JsValue) -> Result<RenderOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(RenderOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| js_sys::Error::new(&e.to_string()).into())
    }
}
