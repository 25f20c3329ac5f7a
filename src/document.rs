use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::FeatureCollection;
use log::debug;
use serde_json::Value as JsonValue;

use crate::codec::render_document;
use crate::converter::to_feature_collection;
use crate::error::Result;
use crate::gpx_types::GpxFile;
use crate::options::{GeoJsonMode, OutputFormat, RenderOptions};
use crate::serialization::ToValueTree;
use crate::time_format::TimeFormatter;
use crate::xml::XmlDocument;

impl GpxFile {
    /// The value tree with keys creator, metadata, waypoints, routes, tracks, extensions.
    pub fn to_array(&self, opts: &RenderOptions) -> Result<JsonValue> {
        let fmt = TimeFormatter::new(opts)?;
        Ok(self.to_value_tree(&fmt))
    }

    pub fn to_json(&self, opts: &RenderOptions) -> Result<String> {
        debug!("rendering JSON ({} tracks)", self.tracks.len());
        let tree = self.to_array(opts)?;
        let json = if opts.pretty_print {
            serde_json::to_string_pretty(&tree)?
        } else {
            serde_json::to_string(&tree)?
        };
        Ok(json)
    }

    pub fn to_xml(&self) -> XmlDocument {
        debug!(
            "rendering GPX/XML ({} waypoints, {} routes, {} tracks)",
            self.waypoints.len(),
            self.routes.len(),
            self.tracks.len()
        );
        render_document(self)
    }

    pub fn to_xml_string(&self, opts: &RenderOptions) -> Result<String> {
        self.to_xml().to_xml_string(opts.pretty_print)
    }

    pub fn to_geojson(&self, mode: GeoJsonMode, opts: &RenderOptions) -> Result<FeatureCollection> {
        debug!("rendering GeoJSON {mode:?} ({} tracks)", self.tracks.len());
        let fmt = TimeFormatter::new(opts)?;
        Ok(to_feature_collection(self, mode, &fmt))
    }

    pub fn to_geojson_string(&self, mode: GeoJsonMode, opts: &RenderOptions) -> Result<String> {
        let fc = self.to_geojson(mode, opts)?;
        let json = if opts.pretty_print {
            serde_json::to_string_pretty(&fc)?
        } else {
            serde_json::to_string(&fc)?
        };
        Ok(json)
    }

    /// Render in the given format. XML is rendered but not written.
    pub fn render(&self, format: OutputFormat, opts: &RenderOptions) -> Result<String> {
        match format {
            OutputFormat::Xml => self.to_xml_string(opts),
            OutputFormat::Json => self.to_json(opts),
            OutputFormat::GeoJson(mode) => self.to_geojson_string(mode, opts),
        }
    }

    /// Write the document to `path`. The encoding is fully rendered before the
    /// file is created, so a render failure leaves the filesystem untouched.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        format: OutputFormat,
        opts: &RenderOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        debug!("saving {format} to {}", path.display());
        match format {
            OutputFormat::Xml => {
                let doc = self.to_xml();
                let mut writer = BufWriter::new(File::create(path)?);
                doc.write_to(&mut writer, opts.pretty_print)?;
                writer.flush()?;
            }
            other => {
                let text = self.render(other, opts)?;
                std::fs::write(path, text)?;
            }
        }
        Ok(())
    }

    /// [`GpxFile::save`] with the format given by name (`xml`, `json`,
    /// `geojson-points`, `geojson-lines`). Unknown names fail before any I/O.
    pub fn save_as(
        &self,
        path: impl AsRef<Path>,
        format: &str,
        opts: &RenderOptions,
    ) -> Result<()> {
        let format: OutputFormat = format.parse()?;
        self.save(path, format, opts)
    }
}
