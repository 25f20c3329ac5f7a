use std::collections::HashMap;
use std::str::FromStr;

use log::warn;
use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use crate::error::{GpxError, Result};
use crate::extensions::*;
use crate::gpx_types::*;
use crate::time_format::parse_gpx_time;

/// Prefix declarations and schema locations visible to extension content.
/// The default namespace (`xmlns="..."`) is kept under the empty prefix.
#[derive(Debug, Clone, Default)]
struct NamespaceScope {
    prefixes: HashMap<String, String>,
    schema_locations: HashMap<String, String>,
}

impl NamespaceScope {
    fn declare_from(&mut self, e: &BytesStart<'_>) -> bool {
        let mut declared = false;
        for attr in e.attributes().flatten() {
            let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or_default();
            let prefix = if key == "xmlns" {
                Some("")
            } else {
                key.strip_prefix("xmlns:")
            };
            if let Some(prefix) = prefix {
                self.prefixes.insert(prefix.to_string(), attr_value(&attr));
                declared = true;
            } else if attr.key.local_name().as_ref() == b"schemaLocation" {
                let value = attr_value(&attr);
                let parts: Vec<&str> = value.split_whitespace().collect();
                for pair in parts.chunks_exact(2) {
                    self.schema_locations
                        .insert(pair[0].to_string(), pair[1].to_string());
                }
            }
        }
        declared
    }

    /// A copy of this scope extended with the element's own declarations, if it has any.
    fn extended(&self, e: &BytesStart<'_>) -> Option<NamespaceScope> {
        let mut scope = self.clone();
        scope.declare_from(e).then_some(scope)
    }

    /// `xmlns=""` undeclares the default namespace, so an empty URI resolves to nothing.
    fn resolve(&self, prefix: &str) -> Option<Namespace> {
        let uri = self.prefixes.get(prefix).filter(|uri| !uri.is_empty())?;
        Some(Namespace {
            prefix: prefix.to_string(),
            uri: uri.clone(),
            schema_location: self.schema_locations.get(uri).cloned(),
        })
    }
}

/// Parse a GPX XML string into a GpxFile.
pub fn parse_gpx(xml: &str) -> Result<GpxFile> {
    let mut reader = Reader::from_str(xml);
    let mut data = GpxFile::default();
    let mut scope = NamespaceScope::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"gpx" => read_root_attributes(&e, &mut data, &mut scope),
                b"metadata" => data.metadata = Some(parse_metadata(&mut reader, &scope)?),
                b"wpt" => {
                    if let Some(pt) = parse_point(&e, &mut reader, &scope)? {
                        data.waypoints.push(pt);
                    }
                }
                b"rte" => data.routes.push(parse_route(&mut reader, &scope)?),
                b"trk" => data.tracks.push(parse_track(&mut reader, &scope)?),
                b"extensions" => data.extensions = parse_extensions(&mut reader, &scope)?,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"gpx" => read_root_attributes(&e, &mut data, &mut scope),
                b"metadata" => data.metadata = Some(GpxMetadata::default()),
                b"wpt" => {
                    if let Some(pt) = empty_point(&e) {
                        data.waypoints.push(pt);
                    }
                }
                b"rte" => data.routes.push(GpxRoute::default()),
                b"trk" => data.tracks.push(GpxTrack::default()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    log::debug!(
        "parsed GPX: {} waypoints, {} routes, {} tracks",
        data.waypoints.len(),
        data.routes.len(),
        data.tracks.len()
    );
    Ok(data)
}

fn read_root_attributes(e: &BytesStart<'_>, data: &mut GpxFile, scope: &mut NamespaceScope) {
    scope.declare_from(e);
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"creator" {
            data.creator = Some(attr_value(&attr));
        }
    }
}

fn attr_value(attr: &Attribute<'_>) -> String {
    let raw = std::str::from_utf8(&attr.value).unwrap_or_default();
    quick_xml::escape::unescape(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn find_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .map(|attr| attr_value(&attr))
}

fn parse_number<T: FromStr>(text: &str, element: &str) -> Option<T> {
    let parsed = text.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!("ignoring non-numeric <{element}> value '{text}'");
    }
    parsed
}

fn parse_time(text: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let parsed = parse_gpx_time(text);
    if parsed.is_none() {
        warn!("ignoring unparseable <time> value '{text}'");
    }
    parsed
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| GpxError::XmlParse(e.into()))?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match key.as_ref() {
            b"lat" => {
                lat = Some(val.trim().parse::<f64>().map_err(|_| {
                    GpxError::InvalidAttribute {
                        element: "point",
                        attribute: "lat",
                        value: val.to_string(),
                    }
                })?);
            }
            b"lon" => {
                lon = Some(val.trim().parse::<f64>().map_err(|_| {
                    GpxError::InvalidAttribute {
                        element: "point",
                        attribute: "lon",
                        value: val.to_string(),
                    }
                })?);
            }
            _ => {}
        }
    }

    let lat = lat.ok_or(GpxError::MissingAttribute {
        element: "point",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(GpxError::MissingAttribute {
        element: "point",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// A self-closing point element; `None` (with a warning) if its coordinates are unusable.
fn empty_point(e: &BytesStart<'_>) -> Option<GpxPoint> {
    match parse_lat_lon(e) {
        Ok((lat, lon)) => Some(GpxPoint::new(lat, lon)),
        Err(err) => {
            warn!("skipping point: {err}");
            None
        }
    }
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    scope: &NamespaceScope,
) -> Result<Option<GpxPoint>> {
    let (lat, lon) = match parse_lat_lon(start) {
        Ok(coords) => coords,
        Err(err) => {
            warn!("skipping point: {err}");
            reader
                .read_to_end(start.name())
                .map_err(GpxError::XmlParse)?;
            return Ok(None);
        }
    };

    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec(); // own the end tag name for comparison

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => point.ele = parse_number(&read_text_owned(reader, &e)?, "ele"),
                b"time" => point.time = parse_time(&read_text_owned(reader, &e)?),
                b"magvar" => {
                    point.magvar = parse_number(&read_text_owned(reader, &e)?, "magvar");
                }
                b"geoidheight" => {
                    point.geoid_height =
                        parse_number(&read_text_owned(reader, &e)?, "geoidheight");
                }
                b"name" => point.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => point.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => point.desc = Some(read_text_owned(reader, &e)?),
                b"src" => point.src = Some(read_text_owned(reader, &e)?),
                b"sym" => point.sym = Some(read_text_owned(reader, &e)?),
                b"type" => point.point_type = Some(read_text_owned(reader, &e)?),
                b"fix" => point.fix = Some(read_text_owned(reader, &e)?),
                b"sat" => point.sat = parse_number(&read_text_owned(reader, &e)?, "sat"),
                b"hdop" => point.hdop = parse_number(&read_text_owned(reader, &e)?, "hdop"),
                b"vdop" => point.vdop = parse_number(&read_text_owned(reader, &e)?, "vdop"),
                b"pdop" => point.pdop = parse_number(&read_text_owned(reader, &e)?, "pdop"),
                b"ageofdgpsdata" => {
                    point.age_of_dgps_data =
                        parse_number(&read_text_owned(reader, &e)?, "ageofdgpsdata");
                }
                b"dgpsid" => {
                    point.dgps_id = parse_number(&read_text_owned(reader, &e)?, "dgpsid");
                }
                b"link" => point.links.push(parse_link(&e, reader)?),
                b"extensions" => point.extensions = parse_extensions(reader, scope)?,
                _ => {
                    // GPX 1.0 leftovers such as <speed> and <course>
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    point.links.push(empty_link(&e));
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(Some(point))
}

fn empty_link(start: &BytesStart<'_>) -> GpxLink {
    GpxLink::new(find_attr(start, b"href").unwrap_or_default())
}

/// Parse a <link> element.
fn parse_link<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<GpxLink> {
    let mut link = empty_link(start);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"text" => link.text = Some(read_text_owned(reader, &e)?),
                b"type" => link.link_type = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"link" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(link)
}

/// Parse a <metadata> element.
fn parse_metadata<'a>(
    reader: &mut Reader<&'a [u8]>,
    scope: &NamespaceScope,
) -> Result<GpxMetadata> {
    let mut metadata = GpxMetadata::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => metadata.name = Some(read_text_owned(reader, &e)?),
                b"desc" => metadata.desc = Some(read_text_owned(reader, &e)?),
                b"author" => metadata.author = Some(parse_person(reader)?),
                b"copyright" => metadata.copyright = Some(parse_copyright(&e, reader)?),
                b"link" => metadata.links.push(parse_link(&e, reader)?),
                b"time" => metadata.time = parse_time(&read_text_owned(reader, &e)?),
                b"keywords" => metadata.keywords = Some(read_text_owned(reader, &e)?),
                b"bounds" => {
                    metadata.bounds = parse_bounds(&e);
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
                b"extensions" => metadata.extensions = parse_extensions(reader, scope)?,
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"bounds" => metadata.bounds = parse_bounds(&e),
                b"link" => metadata.links.push(empty_link(&e)),
                b"copyright" => {
                    metadata.copyright = Some(GpxCopyright {
                        author: find_attr(&e, b"author").unwrap_or_default(),
                        year: None,
                        license: None,
                    });
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(metadata)
}

fn find_f64_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<f64> {
    find_attr(e, name).and_then(|v| v.trim().parse::<f64>().ok())
}

fn parse_bounds(e: &BytesStart<'_>) -> Option<GpxBounds> {
    match (
        find_f64_attr(e, b"minlat"),
        find_f64_attr(e, b"minlon"),
        find_f64_attr(e, b"maxlat"),
        find_f64_attr(e, b"maxlon"),
    ) {
        (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) => Some(GpxBounds {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }),
        _ => {
            warn!("ignoring <bounds> with missing or invalid attributes");
            None
        }
    }
}

/// Parse an <author> element.
fn parse_person<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxPerson> {
    let mut person = GpxPerson::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => person.name = Some(read_text_owned(reader, &e)?),
                b"link" => person.link = Some(parse_link(&e, reader)?),
                b"email" => {
                    person.email = email_address(&e);
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"email" => person.email = email_address(&e),
                b"link" => person.link = Some(empty_link(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"author" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(person)
}

fn email_address(e: &BytesStart<'_>) -> Option<String> {
    let id = find_attr(e, b"id")?;
    match find_attr(e, b"domain") {
        Some(domain) if !domain.is_empty() => Some(format!("{id}@{domain}")),
        _ => Some(id),
    }
}

/// Parse a <copyright> element.
fn parse_copyright<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<GpxCopyright> {
    let mut copyright = GpxCopyright {
        author: find_attr(start, b"author").unwrap_or_default(),
        year: None,
        license: None,
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"year" => copyright.year = parse_number(&read_text_owned(reader, &e)?, "year"),
                b"license" => copyright.license = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"copyright" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(copyright)
}

/// Parse a <rte> element.
fn parse_route<'a>(reader: &mut Reader<&'a [u8]>, scope: &NamespaceScope) -> Result<GpxRoute> {
    let mut route = GpxRoute::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => route.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => route.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => route.desc = Some(read_text_owned(reader, &e)?),
                b"src" => route.src = Some(read_text_owned(reader, &e)?),
                b"type" => route.route_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    route.number = parse_number(&read_text_owned(reader, &e)?, "number");
                }
                b"link" => route.links.push(parse_link(&e, reader)?),
                b"extensions" => route.extensions = parse_extensions(reader, scope)?,
                b"rtept" => {
                    if let Some(pt) = parse_point(&e, reader, scope)? {
                        route.points.push(pt);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"rtept" => {
                    if let Some(pt) = empty_point(&e) {
                        route.points.push(pt);
                    }
                }
                b"link" => route.links.push(empty_link(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>, scope: &NamespaceScope) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => track.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => track.desc = Some(read_text_owned(reader, &e)?),
                b"src" => track.src = Some(read_text_owned(reader, &e)?),
                b"type" => track.track_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    track.number = parse_number(&read_text_owned(reader, &e)?, "number");
                }
                b"link" => track.links.push(parse_link(&e, reader)?),
                b"extensions" => track.extensions = parse_extensions(reader, scope)?,
                b"trkseg" => track.segments.push(parse_segment(reader, scope)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"trkseg" => track.segments.push(GpxSegment::default()),
                b"link" => track.links.push(empty_link(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(
    reader: &mut Reader<&'a [u8]>,
    scope: &NamespaceScope,
) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, reader, scope)? {
                        segment.points.push(pt);
                    }
                }
                b"extensions" => segment.extensions = parse_extensions(reader, scope)?,
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(GpxError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some(pt) = empty_point(&e) {
                        segment.points.push(pt);
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(segment)
}

/// Parse the children of an <extensions> element. An element with no
/// children yields `None`, the same as a missing one.
fn parse_extensions<'a>(
    reader: &mut Reader<&'a [u8]>,
    scope: &NamespaceScope,
) -> Result<Option<Extensions>> {
    let mut extensions = Extensions::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = scope.extended(&e);
                let scope = local.as_ref().unwrap_or(scope);
                match element_namespace(&e, scope) {
                    (Some(ns), name)
                        if name == "TrackPointExtension"
                            && is_track_point_extension_uri(&ns.uri) =>
                    {
                        extensions.track_point =
                            Some(parse_track_point_extension(&e, reader, ns)?);
                    }
                    _ => extensions
                        .unsupported
                        .push(parse_extension_element(&e, reader, scope)?),
                }
            }
            Ok(Event::Empty(e)) => {
                let local = scope.extended(&e);
                let scope = local.as_ref().unwrap_or(scope);
                extensions.unsupported.push(empty_extension_element(&e, scope));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"extensions" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok((!extensions.is_empty()).then_some(extensions))
}

fn is_gpx_namespace(uri: &str) -> bool {
    uri.starts_with("http://www.topografix.com/GPX/")
}

/// Resolve an element's prefix; returns the namespace (if any) and the name to store.
fn element_namespace(e: &BytesStart<'_>, scope: &NamespaceScope) -> (Option<Namespace>, String) {
    let qualified = std::str::from_utf8(e.name().as_ref())
        .unwrap_or_default()
        .to_string();
    match qualified.split_once(':') {
        Some((prefix, local)) => match scope.resolve(prefix) {
            Some(ns) => (Some(ns), local.to_string()),
            None => {
                warn!("extension element <{qualified}> uses undeclared prefix '{prefix}'");
                (None, qualified)
            }
        },
        // the GPX default namespace is implied on output, so it is not recorded
        None => (
            scope.resolve("").filter(|ns| !is_gpx_namespace(&ns.uri)),
            qualified,
        ),
    }
}

/// Attributes other than namespace declarations. Unprefixed attributes never
/// take the default namespace; `xml:` is bound by XML itself.
fn extension_attributes(e: &BytesStart<'_>, scope: &NamespaceScope) -> Vec<ExtensionAttribute> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = std::str::from_utf8(attr.key.as_ref()).ok()?;
            if key == "xmlns" || key.starts_with("xmlns:") {
                return None;
            }
            let value = attr_value(&attr);
            let attribute = match key.split_once(':') {
                None | Some(("xml", _)) => ExtensionAttribute::new(key, value),
                Some((prefix, local)) => match scope.resolve(prefix) {
                    Some(ns) => ExtensionAttribute::new(local, value).in_namespace(ns),
                    None => {
                        warn!("extension attribute '{key}' uses undeclared prefix '{prefix}'");
                        ExtensionAttribute::new(key, value)
                    }
                },
            };
            Some(attribute)
        })
        .collect()
}

fn empty_extension_element(e: &BytesStart<'_>, scope: &NamespaceScope) -> ExtensionElement {
    let (namespace, name) = element_namespace(e, scope);
    ExtensionElement {
        namespace,
        name,
        attributes: extension_attributes(e, scope),
        text: None,
        children: Vec::new(),
    }
}

/// Parse an opaque extension element and everything below it.
fn parse_extension_element<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    scope: &NamespaceScope,
) -> Result<ExtensionElement> {
    let mut element = empty_extension_element(start, scope);
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = scope.extended(&e);
                let child_scope = local.as_ref().unwrap_or(scope);
                element
                    .children
                    .push(parse_extension_element(&e, reader, child_scope)?);
            }
            Ok(Event::Empty(e)) => {
                let local = scope.extended(&e);
                let child_scope = local.as_ref().unwrap_or(scope);
                element
                    .children
                    .push(empty_extension_element(&e, child_scope));
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            Ok(event) => append_text(&mut text, &event),
        }
    }

    // indentation between child elements is not content
    if !text.trim().is_empty() {
        element.text = Some(text);
    }
    Ok(element)
}

/// Parse a Garmin <gpxtpx:TrackPointExtension> element.
fn parse_track_point_extension<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    namespace: Namespace,
) -> Result<TrackPointExtension> {
    let mut tpx = TrackPointExtension {
        namespace: Some(namespace),
        ..Default::default()
    };
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = std::str::from_utf8(e.local_name().as_ref())
                    .unwrap_or_default()
                    .to_string();
                let text = read_text_owned(reader, &e)?;
                if let Some(value) = parse_number::<f64>(&text, &name) {
                    if !tpx.set_field(&name, value) {
                        warn!("ignoring unknown TrackPointExtension field <{name}>");
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(tpx)
}

/// Accumulate character content from a text-like event.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn append_text(text: &mut String, event: &Event<'_>) {
    match event {
        Event::Text(e) => {
            let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
            text.push_str(raw);
        }
        Event::CData(e) => {
            let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
            text.push_str(s);
        }
        Event::GeneralRef(e) => {
            // Handle character references (&#60; &#x3C;) and predefined entities
            if let Ok(Some(ch)) = e.resolve_char_ref() {
                text.push(ch);
            } else {
                let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                match name {
                    "amp" => text.push('&'),
                    "lt" => text.push('<'),
                    "gt" => text.push('>'),
                    "quot" => text.push('"'),
                    "apos" => text.push('\''),
                    _ => {} // Unknown entity, skip
                }
            }
        }
        _ => {}
    }
}

/// Read text content of an element as an owned String.
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            Ok(event) => append_text(&mut text, &event),
        }
    }

    Ok(text)
}
