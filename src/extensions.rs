/// An XML namespace used by extension content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
    /// Paired with `uri` in the root `xsi:schemaLocation` when present.
    pub schema_location: Option<String>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
            schema_location: None,
        }
    }

    pub fn with_schema_location(mut self, location: impl Into<String>) -> Self {
        self.schema_location = Some(location.into());
        self
    }

    /// The Garmin TrackPointExtension v1 namespace, used for values built in code.
    pub fn track_point_extension() -> Self {
        Self::new(TPX_PREFIX, TPX_V1_URI).with_schema_location(TPX_V1_SCHEMA)
    }

    /// A default namespace (`xmlns="..."`), declared on the element itself.
    pub fn is_default(&self) -> bool {
        self.prefix.is_empty()
    }

    /// `name` as written under this namespace's prefix.
    pub fn qualified(&self, name: &str) -> String {
        if self.is_default() {
            name.to_string()
        } else {
            format!("{}:{name}", self.prefix)
        }
    }
}

pub const TPX_PREFIX: &str = "gpxtpx";
pub const TPX_V1_URI: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
pub const TPX_V1_SCHEMA: &str = "http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd";
pub const TPX_V2_URI: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v2";

pub fn is_track_point_extension_uri(uri: &str) -> bool {
    uri == TPX_V1_URI || uri == TPX_V2_URI
}

/// An attribute on opaque extension content. Unprefixed attributes have no namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionAttribute {
    pub namespace: Option<Namespace>,
    pub name: String,
    pub value: String,
}

impl ExtensionAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn in_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn qualified_name(&self) -> String {
        self.namespace
            .as_ref()
            .map_or_else(|| self.name.clone(), |ns| ns.qualified(&self.name))
    }
}

/// Opaque extension content, kept as an element tree so it can be re-emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionElement {
    /// `None` for elements outside any extension namespace.
    pub namespace: Option<Namespace>,
    pub name: String,
    pub attributes: Vec<ExtensionAttribute>,
    pub text: Option<String>,
    pub children: Vec<ExtensionElement>,
}

impl ExtensionElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, attribute: ExtensionAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: ExtensionElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn qualified_name(&self) -> String {
        self.namespace
            .as_ref()
            .map_or_else(|| self.name.clone(), |ns| ns.qualified(&self.name))
    }
}

/// Garmin `gpxtpx:TrackPointExtension` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPointExtension {
    /// The v1 or v2 namespace the values were read under; `None` renders as v1.
    pub namespace: Option<Namespace>,
    pub atemp: Option<f64>,
    pub wtemp: Option<f64>,
    pub depth: Option<f64>,
    pub hr: Option<f64>,
    pub cad: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub bearing: Option<f64>,
}

impl TrackPointExtension {
    /// Field names in schema order, paired with their values.
    pub fn fields(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("atemp", self.atemp),
            ("wtemp", self.wtemp),
            ("depth", self.depth),
            ("hr", self.hr),
            ("cad", self.cad),
            ("speed", self.speed),
            ("course", self.course),
            ("bearing", self.bearing),
        ]
    }

    pub fn set_field(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "atemp" => &mut self.atemp,
            "wtemp" => &mut self.wtemp,
            "depth" => &mut self.depth,
            "hr" => &mut self.hr,
            "cad" => &mut self.cad,
            "speed" => &mut self.speed,
            "course" => &mut self.course,
            "bearing" => &mut self.bearing,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Contents of an `<extensions>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    pub track_point: Option<TrackPointExtension>,
    pub unsupported: Vec<ExtensionElement>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.track_point.is_none() && self.unsupported.is_empty()
    }
}
