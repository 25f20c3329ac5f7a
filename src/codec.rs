//! Per-entity GPX/XML codecs.
//!
//! Namespaces used by extension content are collected in a [`RenderContext`]
//! that lives for exactly one document render, then declared once on `<gpx>`.

use indexmap::IndexMap;

use crate::extensions::{ExtensionElement, Extensions, Namespace, TrackPointExtension};
use crate::gpx_types::*;
use crate::time_format::to_xsd_datetime;
use crate::xml::{XmlDocument, XmlElement};

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
pub const GPX_SCHEMA: &str = "http://www.topografix.com/GPX/1/1/gpx.xsd";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespaces seen while rendering one document.
///
/// Prefixed namespaces are de-duplicated by prefix and declared on `<gpx>`.
/// Default namespaces are declared on their own elements and only contribute
/// to the root `xsi:schemaLocation`.
#[derive(Debug, Default)]
pub struct RenderContext {
    namespaces: IndexMap<String, Namespace>,
    default_namespaces: IndexMap<String, Namespace>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first namespace registered under a prefix wins. `xsi` is always
    /// declared by the root, so it is never registered.
    pub fn register(&mut self, namespace: &Namespace) {
        let (registry, key) = if namespace.is_default() {
            (&mut self.default_namespaces, &namespace.uri)
        } else if namespace.prefix == "xsi" {
            return;
        } else {
            (&mut self.namespaces, &namespace.prefix)
        };
        if !registry.contains_key(key) {
            registry.insert(key.clone(), namespace.clone());
        }
    }

    /// Prefixed namespaces, in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// `(uri, location)` pairs for every registered namespace that has one.
    pub fn schema_locations(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut locations: IndexMap<&str, &str> = IndexMap::new();
        for ns in self.namespaces.values().chain(self.default_namespaces.values()) {
            if let Some(location) = &ns.schema_location {
                locations.entry(ns.uri.as_str()).or_insert(location.as_str());
            }
        }
        locations.into_iter()
    }
}

/// An entity that knows how to render itself as a GPX element.
///
/// The element name comes from the caller because GPX names points by
/// position (`wpt`, `rtept`, `trkpt`).
pub trait ToXml {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement;
}

/// Render a whole document. Child order is metadata, waypoints, routes,
/// tracks, extensions.
pub fn render_document(gpx: &GpxFile) -> XmlDocument {
    let mut ctx = RenderContext::new();
    let mut root = XmlElement::new("gpx");

    if let Some(metadata) = &gpx.metadata {
        root.push(metadata.to_xml("metadata", &mut ctx));
    }
    for wpt in &gpx.waypoints {
        root.push(wpt.to_xml("wpt", &mut ctx));
    }
    for rte in &gpx.routes {
        root.push(rte.to_xml("rte", &mut ctx));
    }
    for trk in &gpx.tracks {
        root.push(trk.to_xml("trk", &mut ctx));
    }
    push_extensions(&mut root, gpx.extensions.as_ref(), &mut ctx);

    root.attributes = root_attributes(gpx.creator(), &ctx);
    XmlDocument { root }
}

fn root_attributes(creator: &str, ctx: &RenderContext) -> Vec<(String, String)> {
    let mut attributes = vec![
        ("xmlns".to_string(), GPX_NAMESPACE.to_string()),
        ("version".to_string(), "1.1".to_string()),
        ("creator".to_string(), creator.to_string()),
        ("xmlns:xsi".to_string(), XSI_NAMESPACE.to_string()),
    ];

    for ns in ctx.namespaces() {
        attributes.push((format!("xmlns:{}", ns.prefix), ns.uri.clone()));
    }

    let mut schema_location = vec![GPX_NAMESPACE, GPX_SCHEMA];
    for (uri, location) in ctx.schema_locations() {
        schema_location.push(uri);
        schema_location.push(location);
    }
    attributes.push(("xsi:schemaLocation".to_string(), schema_location.join(" ")));
    attributes
}

fn push_links(element: &mut XmlElement, links: &[GpxLink], ctx: &mut RenderContext) {
    for link in links {
        element.push(link.to_xml("link", ctx));
    }
}

fn push_extensions(
    element: &mut XmlElement,
    extensions: Option<&Extensions>,
    ctx: &mut RenderContext,
) {
    if let Some(ext) = extensions.filter(|e| !e.is_empty()) {
        element.push(ext.to_xml("extensions", ctx));
    }
}

impl ToXml for GpxPoint {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag)
            .attr("lat", self.lat.to_string())
            .attr("lon", self.lon.to_string());

        el.push_opt("ele", self.ele);
        el.push_opt("time", self.time.as_ref().map(to_xsd_datetime));
        el.push_opt("magvar", self.magvar);
        el.push_opt("geoidheight", self.geoid_height);
        el.push_opt("name", self.name.as_deref());
        el.push_opt("cmt", self.cmt.as_deref());
        el.push_opt("desc", self.desc.as_deref());
        el.push_opt("src", self.src.as_deref());
        push_links(&mut el, &self.links, ctx);
        el.push_opt("sym", self.sym.as_deref());
        el.push_opt("type", self.point_type.as_deref());
        el.push_opt("fix", self.fix.as_deref());
        el.push_opt("sat", self.sat);
        el.push_opt("hdop", self.hdop);
        el.push_opt("vdop", self.vdop);
        el.push_opt("pdop", self.pdop);
        el.push_opt("ageofdgpsdata", self.age_of_dgps_data);
        el.push_opt("dgpsid", self.dgps_id);
        push_extensions(&mut el, self.extensions.as_ref(), ctx);
        el
    }
}

impl ToXml for GpxLink {
    fn to_xml(&self, tag: &str, _ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag).attr("href", self.href.as_str());
        el.push_opt("text", self.text.as_deref());
        el.push_opt("type", self.link_type.as_deref());
        el
    }
}

impl ToXml for GpxPerson {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        el.push_opt("name", self.name.as_deref());
        if let Some(email) = &self.email {
            let (id, domain) = email.split_once('@').unwrap_or((email.as_str(), ""));
            el.push(XmlElement::new("email").attr("id", id).attr("domain", domain));
        }
        if let Some(link) = &self.link {
            el.push(link.to_xml("link", ctx));
        }
        el
    }
}

impl ToXml for GpxCopyright {
    fn to_xml(&self, tag: &str, _ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag).attr("author", self.author.as_str());
        el.push_opt("year", self.year);
        el.push_opt("license", self.license.as_deref());
        el
    }
}

impl ToXml for GpxBounds {
    fn to_xml(&self, tag: &str, _ctx: &mut RenderContext) -> XmlElement {
        XmlElement::new(tag)
            .attr("minlat", self.min_lat.to_string())
            .attr("minlon", self.min_lon.to_string())
            .attr("maxlat", self.max_lat.to_string())
            .attr("maxlon", self.max_lon.to_string())
    }
}

impl ToXml for GpxMetadata {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        el.push_opt("name", self.name.as_deref());
        el.push_opt("desc", self.desc.as_deref());
        if let Some(author) = &self.author {
            el.push(author.to_xml("author", ctx));
        }
        if let Some(copyright) = &self.copyright {
            el.push(copyright.to_xml("copyright", ctx));
        }
        push_links(&mut el, &self.links, ctx);
        el.push_opt("time", self.time.as_ref().map(to_xsd_datetime));
        el.push_opt("keywords", self.keywords.as_deref());
        if let Some(bounds) = &self.bounds {
            el.push(bounds.to_xml("bounds", ctx));
        }
        push_extensions(&mut el, self.extensions.as_ref(), ctx);
        el
    }
}

impl ToXml for GpxRoute {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        el.push_opt("name", self.name.as_deref());
        el.push_opt("cmt", self.cmt.as_deref());
        el.push_opt("desc", self.desc.as_deref());
        el.push_opt("src", self.src.as_deref());
        push_links(&mut el, &self.links, ctx);
        el.push_opt("number", self.number);
        el.push_opt("type", self.route_type.as_deref());
        push_extensions(&mut el, self.extensions.as_ref(), ctx);
        for pt in &self.points {
            el.push(pt.to_xml("rtept", ctx));
        }
        el
    }
}

impl ToXml for GpxTrack {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        el.push_opt("name", self.name.as_deref());
        el.push_opt("cmt", self.cmt.as_deref());
        el.push_opt("desc", self.desc.as_deref());
        el.push_opt("src", self.src.as_deref());
        push_links(&mut el, &self.links, ctx);
        el.push_opt("number", self.number);
        el.push_opt("type", self.track_type.as_deref());
        push_extensions(&mut el, self.extensions.as_ref(), ctx);
        for seg in &self.segments {
            el.push(seg.to_xml("trkseg", ctx));
        }
        el
    }
}

impl ToXml for GpxSegment {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        for pt in &self.points {
            el.push(pt.to_xml("trkpt", ctx));
        }
        push_extensions(&mut el, self.extensions.as_ref(), ctx);
        el
    }
}

impl ToXml for Extensions {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let mut el = XmlElement::new(tag);
        if let Some(tpx) = &self.track_point {
            el.push(tpx.to_xml("TrackPointExtension", ctx));
        }
        for node in &self.unsupported {
            el.push(node.to_xml(&node.qualified_name(), ctx));
        }
        el
    }
}

impl ToXml for TrackPointExtension {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        let ns = self
            .namespace
            .clone()
            .unwrap_or_else(Namespace::track_point_extension);
        ctx.register(&ns);

        let mut el = XmlElement::new(ns.qualified(tag));
        if ns.is_default() {
            el = el.attr("xmlns", ns.uri.as_str());
        }
        for (name, value) in self.fields() {
            el.push_opt(&ns.qualified(name), value);
        }
        el
    }
}

impl ToXml for ExtensionElement {
    fn to_xml(&self, tag: &str, ctx: &mut RenderContext) -> XmlElement {
        extension_xml(self, tag, None, ctx)
    }
}

/// `inherited` is the default namespace in effect at the parent; `None` means
/// the GPX namespace.
fn extension_xml<'a>(
    node: &'a ExtensionElement,
    tag: &str,
    inherited: Option<&'a str>,
    ctx: &mut RenderContext,
) -> XmlElement {
    let in_effect = match &node.namespace {
        Some(ns) if ns.is_default() => Some(ns.uri.as_str()),
        Some(_) => inherited,
        None => None,
    };

    let mut el = XmlElement::new(tag);
    if let Some(ns) = &node.namespace {
        ctx.register(ns);
    }
    if in_effect != inherited {
        el = el.attr("xmlns", in_effect.unwrap_or_default());
    }
    for attr in &node.attributes {
        if let Some(ns) = &attr.namespace {
            ctx.register(ns);
        }
        el = el.attr(attr.qualified_name(), attr.value.as_str());
    }
    el.text.clone_from(&node.text);
    for child in &node.children {
        el.push(extension_xml(child, &child.qualified_name(), in_effect, ctx));
    }
    el
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{ExtensionAttribute, TPX_V1_URI, TPX_V2_URI};

    fn hr_extension(hr: f64) -> Extensions {
        Extensions {
            track_point: Some(TrackPointExtension {
                hr: Some(hr),
                ..Default::default()
            }),
            unsupported: Vec::new(),
        }
    }

    #[test]
    fn test_root_attributes_without_extensions() {
        let doc = render_document(&GpxFile::new());
        let root = &doc.root;
        assert_eq!(root.name, "gpx");
        assert_eq!(root.attribute("version"), Some("1.1"));
        assert_eq!(root.attribute("creator"), Some(DEFAULT_CREATOR));
        assert_eq!(
            root.attribute("xsi:schemaLocation"),
            Some("http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd")
        );
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_child_order() {
        let gpx = GpxFile {
            creator: Some("test".to_string()),
            metadata: Some(GpxMetadata::default()),
            waypoints: vec![GpxPoint::new(1.0, 2.0)],
            routes: vec![GpxRoute::default()],
            tracks: vec![GpxTrack::default()],
            extensions: Some(Extensions {
                track_point: None,
                unsupported: vec![ExtensionElement::new("note").with_text("x")],
            }),
        };
        let doc = render_document(&gpx);
        let names: Vec<&str> = doc.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["metadata", "wpt", "rte", "trk", "extensions"]);
    }

    #[test]
    fn test_namespace_declared_once() {
        let mut a = GpxPoint::new(48.1, 17.1);
        a.extensions = Some(hr_extension(120.0));
        let mut b = GpxPoint::new(48.2, 17.2);
        b.extensions = Some(hr_extension(125.0));
        let gpx = GpxFile {
            tracks: vec![GpxTrack {
                segments: vec![GpxSegment::new(vec![a, b])],
                ..Default::default()
            }],
            ..Default::default()
        };

        let doc = render_document(&gpx);
        let declarations: Vec<&(String, String)> = doc
            .root
            .attributes
            .iter()
            .filter(|(k, _)| k.starts_with("xmlns:") && k != "xmlns:xsi")
            .collect();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].0, "xmlns:gpxtpx");
        assert_eq!(declarations[0].1, TPX_V1_URI);

        let schema = doc.root.attribute("xsi:schemaLocation").unwrap();
        assert_eq!(schema.matches(TPX_V1_URI).count(), 1);
        assert!(schema.ends_with("http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd"));
    }

    #[test]
    fn test_context_dedupes_by_prefix() {
        let mut ctx = RenderContext::new();
        ctx.register(&Namespace::new("ns3", "http://example.com/a"));
        ctx.register(&Namespace::new("ns3", "http://example.com/b"));
        ctx.register(&Namespace::new("ns4", "http://example.com/c"));
        let uris: Vec<&str> = ctx.namespaces().map(|ns| ns.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://example.com/a", "http://example.com/c"]);
    }

    #[test]
    fn test_renders_are_independent() {
        let mut pt = GpxPoint::new(1.0, 1.0);
        pt.extensions = Some(hr_extension(90.0));
        let with_ns = GpxFile {
            waypoints: vec![pt],
            ..Default::default()
        };

        let first = render_document(&with_ns);
        assert!(first.root.attribute("xmlns:gpxtpx").is_some());

        let plain = render_document(&GpxFile::new());
        assert!(plain.root.attribute("xmlns:gpxtpx").is_none());
    }

    #[test]
    fn test_point_element() {
        let mut pt = GpxPoint::new(48.2, 17.2);
        pt.name = Some("Peak".to_string());
        let mut ctx = RenderContext::new();
        let el = pt.to_xml("trkpt", &mut ctx);
        assert_eq!(el.attribute("lat"), Some("48.2"));
        assert_eq!(el.attribute("lon"), Some("17.2"));
        assert!(el.child("ele").is_none());
        assert_eq!(el.child("name").and_then(|n| n.text.as_deref()), Some("Peak"));

        let el = pt.clone().with_ele(0.0).to_xml("trkpt", &mut ctx);
        assert_eq!(el.child("ele").and_then(|n| n.text.as_deref()), Some("0"));
    }

    #[test]
    fn test_unsupported_extension_namespaces() {
        let ns = Namespace::new("gpxx", "http://www.garmin.com/xmlschemas/GpxExtensions/v3")
            .with_schema_location("http://www8.garmin.com/xmlschemas/GpxExtensionsv3.xsd");
        let node = ExtensionElement::new("TrackExtension")
            .in_namespace(ns.clone())
            .with_child(ExtensionElement::new("DisplayColor").in_namespace(ns).with_text("Red"));
        let gpx = GpxFile {
            tracks: vec![GpxTrack {
                extensions: Some(Extensions {
                    track_point: None,
                    unsupported: vec![node],
                }),
                ..Default::default()
            }],
            ..Default::default()
        };

        let doc = render_document(&gpx);
        let ext = doc.root.children[0].child("extensions").unwrap();
        let track_ext = ext.child("gpxx:TrackExtension").unwrap();
        assert_eq!(
            track_ext.child("gpxx:DisplayColor").and_then(|c| c.text.as_deref()),
            Some("Red")
        );
        assert_eq!(
            doc.root.attribute("xmlns:gpxx"),
            Some("http://www.garmin.com/xmlschemas/GpxExtensions/v3")
        );
    }

    #[test]
    fn test_track_point_extension_keeps_parsed_namespace() {
        let tpx = TrackPointExtension {
            namespace: Some(Namespace::new("ns3", TPX_V2_URI)),
            speed: Some(3.5),
            ..Default::default()
        };
        let mut ctx = RenderContext::new();
        let el = tpx.to_xml("TrackPointExtension", &mut ctx);
        assert_eq!(el.name, "ns3:TrackPointExtension");
        assert_eq!(el.children[0].name, "ns3:speed");

        let uris: Vec<&str> = ctx.namespaces().map(|ns| ns.uri.as_str()).collect();
        assert_eq!(uris, vec![TPX_V2_URI]);
        assert_eq!(ctx.schema_locations().count(), 0);
    }

    #[test]
    fn test_default_namespace_declared_on_element() {
        let power = Namespace::new("", "http://example.com/power")
            .with_schema_location("http://example.com/power.xsd");
        let node = ExtensionElement::new("Power")
            .in_namespace(power.clone())
            .with_child(ExtensionElement::new("watts").in_namespace(power).with_text("250"))
            .with_child(ExtensionElement::new("plain"));
        let mut ctx = RenderContext::new();
        let el = node.to_xml(&node.qualified_name(), &mut ctx);

        assert_eq!(el.name, "Power");
        assert_eq!(el.attribute("xmlns"), Some("http://example.com/power"));
        assert!(el.child("watts").unwrap().attributes.is_empty());
        assert_eq!(el.child("plain").unwrap().attribute("xmlns"), Some(""));

        assert_eq!(ctx.namespaces().count(), 0);
        let locations: Vec<(&str, &str)> = ctx.schema_locations().collect();
        assert_eq!(
            locations,
            vec![("http://example.com/power", "http://example.com/power.xsd")]
        );
    }

    #[test]
    fn test_attribute_namespaces_registered() {
        let node = ExtensionElement::new("note")
            .with_attribute(
                ExtensionAttribute::new("lang", "en")
                    .in_namespace(Namespace::new("x", "http://example.com/x")),
            )
            .with_attribute(
                ExtensionAttribute::new("nil", "true")
                    .in_namespace(Namespace::new("xsi", XSI_NAMESPACE)),
            );
        let gpx = GpxFile {
            extensions: Some(Extensions {
                track_point: None,
                unsupported: vec![node],
            }),
            ..Default::default()
        };

        let doc = render_document(&gpx);
        assert_eq!(doc.root.attribute("xmlns:x"), Some("http://example.com/x"));
        let xsi_declarations = doc
            .root
            .attributes
            .iter()
            .filter(|(k, _)| k == "xmlns:xsi")
            .count();
        assert_eq!(xsi_declarations, 1);

        let note = doc.root.child("extensions").unwrap().child("note").unwrap();
        assert_eq!(note.attribute("x:lang"), Some("en"));
        assert_eq!(note.attribute("xsi:nil"), Some("true"));
    }

    #[test]
    fn test_empty_root_extensions_omitted() {
        let gpx = GpxFile {
            extensions: Some(Extensions::default()),
            ..Default::default()
        };
        assert!(render_document(&gpx).root.children.is_empty());
    }
}
