use std::num::ParseFloatError;
use wasm_bindgen::JsValue;

#[derive(Debug)]
pub enum GpxError {
    XmlParse(quick_xml::Error),
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    FloatParse(ParseFloatError),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Output format name not one of `xml`, `json`, `geojson-points`, `geojson-lines`.
    UnsupportedFormat(String),
    InvalidTimeFormat(String),
    InvalidUtcOffset(i32),
}

impl std::fmt::Display for GpxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlParse(e) => write!(f, "XML parse error: {e}"),
            Self::MissingAttribute { element, attribute } => {
                write!(f, "Missing attribute '{attribute}' on <{element}>")
            }
            Self::InvalidAttribute {
                element,
                attribute,
                value,
            } => write!(
                f,
                "Invalid value '{value}' for attribute '{attribute}' on <{element}>"
            ),
            Self::FloatParse(e) => write!(f, "Float parse error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON encoding error: {e}"),
            Self::UnsupportedFormat(format) => write!(
                f,
                "Unsupported format '{format}' (expected one of: xml, json, geojson-points, geojson-lines)"
            ),
            Self::InvalidTimeFormat(format) => {
                write!(f, "Invalid datetime format string '{format}'")
            }
            Self::InvalidUtcOffset(minutes) => {
                write!(f, "UTC offset of {minutes} minutes is out of range")
            }
        }
    }
}

impl std::error::Error for GpxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::XmlParse(e) => Some(e),
            Self::FloatParse(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for GpxError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e)
    }
}

impl From<ParseFloatError> for GpxError {
    fn from(e: ParseFloatError) -> Self {
        Self::FloatParse(e)
    }
}

impl From<std::io::Error> for GpxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for GpxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

pub type Result<T> = std::result::Result<T, GpxError>;
