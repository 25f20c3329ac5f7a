//! Value-tree rendering: the format-neutral structure JSON output is encoded from.
//!
//! Every key is always present; absent data becomes `null` or `[]` so consumers
//! never need to branch on key presence.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue, json};

use crate::extensions::{ExtensionElement, Extensions, TrackPointExtension};
use crate::gpx_types::*;
use crate::time_format::TimeFormatter;

/// An entity that can render itself into the value tree.
pub trait ToValueTree {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue;
}

/// An optional scalar as-is, or `null`.
pub fn scalar<T: Clone + Into<JsonValue>>(value: &Option<T>) -> JsonValue {
    value.clone().map_or(JsonValue::Null, Into::into)
}

/// An optional entity's own tree, or `null`.
pub fn entity<T: ToValueTree>(value: Option<&T>, fmt: &TimeFormatter<'_>) -> JsonValue {
    value.map_or(JsonValue::Null, |v| v.to_value_tree(fmt))
}

/// An ordered sequence of entities; empty input yields `[]`.
pub fn entities<T: ToValueTree>(items: &[T], fmt: &TimeFormatter<'_>) -> JsonValue {
    JsonValue::Array(items.iter().map(|item| item.to_value_tree(fmt)).collect())
}

pub fn time(value: Option<&DateTime<Utc>>, fmt: &TimeFormatter<'_>) -> JsonValue {
    scalar(&fmt.format_opt(value))
}

impl ToValueTree for GpxFile {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "creator": self.creator(),
            "metadata": entity(self.metadata.as_ref(), fmt),
            "waypoints": entities(&self.waypoints, fmt),
            "routes": entities(&self.routes, fmt),
            "tracks": entities(&self.tracks, fmt),
            "extensions": entity(self.extensions.as_ref(), fmt),
        })
    }
}

impl ToValueTree for GpxPoint {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "lat": self.lat,
            "lon": self.lon,
            "ele": scalar(&self.ele),
            "time": time(self.time.as_ref(), fmt),
            "magvar": scalar(&self.magvar),
            "geoidheight": scalar(&self.geoid_height),
            "name": scalar(&self.name),
            "cmt": scalar(&self.cmt),
            "desc": scalar(&self.desc),
            "src": scalar(&self.src),
            "links": entities(&self.links, fmt),
            "sym": scalar(&self.sym),
            "type": scalar(&self.point_type),
            "fix": scalar(&self.fix),
            "sat": scalar(&self.sat),
            "hdop": scalar(&self.hdop),
            "vdop": scalar(&self.vdop),
            "pdop": scalar(&self.pdop),
            "ageofdgpsdata": scalar(&self.age_of_dgps_data),
            "dgpsid": scalar(&self.dgps_id),
            "extensions": entity(self.extensions.as_ref(), fmt),
        })
    }
}

impl ToValueTree for GpxLink {
    fn to_value_tree(&self, _fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "href": self.href,
            "text": scalar(&self.text),
            "type": scalar(&self.link_type),
        })
    }
}

impl ToValueTree for GpxPerson {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "name": scalar(&self.name),
            "email": scalar(&self.email),
            "link": entity(self.link.as_ref(), fmt),
        })
    }
}

impl ToValueTree for GpxCopyright {
    fn to_value_tree(&self, _fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "author": self.author,
            "year": scalar(&self.year),
            "license": scalar(&self.license),
        })
    }
}

impl ToValueTree for GpxBounds {
    fn to_value_tree(&self, _fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "minlat": self.min_lat,
            "minlon": self.min_lon,
            "maxlat": self.max_lat,
            "maxlon": self.max_lon,
        })
    }
}

impl ToValueTree for GpxMetadata {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "name": scalar(&self.name),
            "desc": scalar(&self.desc),
            "author": entity(self.author.as_ref(), fmt),
            "copyright": entity(self.copyright.as_ref(), fmt),
            "links": entities(&self.links, fmt),
            "time": time(self.time.as_ref(), fmt),
            "keywords": scalar(&self.keywords),
            "bounds": entity(self.bounds.as_ref(), fmt),
            "extensions": entity(self.extensions.as_ref(), fmt),
        })
    }
}

impl ToValueTree for GpxRoute {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "name": scalar(&self.name),
            "cmt": scalar(&self.cmt),
            "desc": scalar(&self.desc),
            "src": scalar(&self.src),
            "links": entities(&self.links, fmt),
            "number": scalar(&self.number),
            "type": scalar(&self.route_type),
            "extensions": entity(self.extensions.as_ref(), fmt),
            "points": entities(&self.points, fmt),
        })
    }
}

impl ToValueTree for GpxTrack {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "name": scalar(&self.name),
            "cmt": scalar(&self.cmt),
            "desc": scalar(&self.desc),
            "src": scalar(&self.src),
            "links": entities(&self.links, fmt),
            "number": scalar(&self.number),
            "type": scalar(&self.track_type),
            "extensions": entity(self.extensions.as_ref(), fmt),
            "segments": entities(&self.segments, fmt),
        })
    }
}

impl ToValueTree for GpxSegment {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "points": entities(&self.points, fmt),
            "extensions": entity(self.extensions.as_ref(), fmt),
        })
    }
}

impl ToValueTree for Extensions {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        json!({
            "trackPointExtension": entity(self.track_point.as_ref(), fmt),
            "unsupported": entities(&self.unsupported, fmt),
        })
    }
}

impl ToValueTree for TrackPointExtension {
    fn to_value_tree(&self, _fmt: &TimeFormatter<'_>) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .fields()
            .into_iter()
            .map(|(key, value)| (key.to_string(), scalar(&value)))
            .collect();
        JsonValue::Object(map)
    }
}

impl ToValueTree for ExtensionElement {
    fn to_value_tree(&self, fmt: &TimeFormatter<'_>) -> JsonValue {
        let attributes: Map<String, JsonValue> = self
            .attributes
            .iter()
            .map(|attr| (attr.qualified_name(), JsonValue::String(attr.value.clone())))
            .collect();
        json!({
            "name": self.qualified_name(),
            "namespace": scalar(&self.namespace.as_ref().map(|ns| ns.uri.clone())),
            "attributes": attributes,
            "text": scalar(&self.text),
            "children": entities(&self.children, fmt),
        })
    }
}
