//! Sidecar model and serialization.

use super::namespaces::{namespace_for, normalize_key, NS_MWG_RS, NS_RDF, NS_ST_AREA, NS_X};
use crate::error::XmpError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const TOOLKIT: &str = concat!("photo-curator ", env!("CARGO_PKG_VERSION"));

/// Rectangle of a region; coordinates are fractions of the image size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionArea {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub unit: String,
}

/// A face (or other) region written by a recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub area: RegionArea,
}

impl FaceRegion {
    /// An unnamed face at the given normalized rectangle
    pub fn unknown_face(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            name: "Unknown".to_string(),
            kind: "Face".to_string(),
            area: RegionArea {
                x,
                y,
                w,
                h,
                unit: "normalized".to_string(),
            },
        }
    }
}

/// Contents of one `.xmp` sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XmpSidecar {
    /// `prefix:local` to text, in key order
    pub tags: BTreeMap<String, String>,
    /// `None` when the sidecar has no region list at all; an empty list
    /// means regions were looked for and none found
    pub regions: Option<Vec<FaceRegion>>,
    /// Namespace URIs declared in the file for prefixes we do not know
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, String>,
}

impl XmpSidecar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one tag, replacing any previous value. Keys without a prefix go to `dc`.
    pub fn set_tag(&mut self, key: &str, value: &str) -> Result<(), XmpError> {
        let key = normalize_key(key)?;
        self.tags.insert(key, value.to_string());
        Ok(())
    }

    /// Set every tag in `tags`; other tags and regions are kept.
    pub fn upsert_tags(&mut self, tags: &[(String, String)]) -> Result<(), XmpError> {
        for (key, value) in tags {
            self.set_tag(key, value)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    fn uri_for(&self, prefix: &str) -> String {
        self.namespaces
            .get(prefix)
            .cloned()
            .unwrap_or_else(|| namespace_for(prefix))
    }

    /// Serialize to an indented XMP packet.
    ///
    /// Tags are grouped into one `rdf:Description` per namespace; regions
    /// go into their own description as `mwg-rs:Regions`.
    pub fn to_xml(&self) -> Result<String, XmpError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut meta = BytesStart::new("x:xmpmeta");
        meta.push_attribute(("xmlns:x", NS_X));
        meta.push_attribute(("x:xmptk", TOOLKIT));
        emit(&mut writer, Event::Start(meta))?;

        let mut rdf = BytesStart::new("rdf:RDF");
        rdf.push_attribute(("xmlns:rdf", NS_RDF));
        emit(&mut writer, Event::Start(rdf))?;

        let mut by_prefix: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for (key, value) in &self.tags {
            let prefix = key.split_once(':').map(|(p, _)| p).unwrap_or("dc");
            by_prefix.entry(prefix).or_default().push((key.as_str(), value.as_str()));
        }

        for (prefix, entries) in by_prefix {
            let declaration = format!("xmlns:{prefix}");
            let uri = self.uri_for(prefix);
            let mut description = BytesStart::new("rdf:Description");
            description.push_attribute(("rdf:about", ""));
            description.push_attribute((declaration.as_str(), uri.as_str()));
            emit(&mut writer, Event::Start(description))?;

            for (key, value) in entries {
                text_element(&mut writer, key, value)?;
            }
            emit(&mut writer, Event::End(BytesEnd::new("rdf:Description")))?;
        }

        if let Some(regions) = &self.regions {
            let mut description = BytesStart::new("rdf:Description");
            description.push_attribute(("rdf:about", ""));
            description.push_attribute(("xmlns:mwg-rs", NS_MWG_RS));
            description.push_attribute(("xmlns:stArea", NS_ST_AREA));
            emit(&mut writer, Event::Start(description))?;
            emit(&mut writer, Event::Start(BytesStart::new("mwg-rs:Regions")))?;
            emit(&mut writer, Event::Start(BytesStart::new("mwg-rs:RegionList")))?;
            emit(&mut writer, Event::Start(BytesStart::new("rdf:Seq")))?;

            for region in regions {
                emit(&mut writer, Event::Start(BytesStart::new("rdf:li")))?;
                emit(&mut writer, Event::Start(BytesStart::new("mwg-rs:Area")))?;
                text_element(&mut writer, "stArea:x", &format!("{:.6}", region.area.x))?;
                text_element(&mut writer, "stArea:y", &format!("{:.6}", region.area.y))?;
                text_element(&mut writer, "stArea:w", &format!("{:.6}", region.area.w))?;
                text_element(&mut writer, "stArea:h", &format!("{:.6}", region.area.h))?;
                text_element(&mut writer, "stArea:unit", &region.area.unit)?;
                emit(&mut writer, Event::End(BytesEnd::new("mwg-rs:Area")))?;
                text_element(&mut writer, "mwg-rs:Name", &region.name)?;
                text_element(&mut writer, "mwg-rs:Type", &region.kind)?;
                emit(&mut writer, Event::End(BytesEnd::new("rdf:li")))?;
            }

            emit(&mut writer, Event::End(BytesEnd::new("rdf:Seq")))?;
            emit(&mut writer, Event::End(BytesEnd::new("mwg-rs:RegionList")))?;
            emit(&mut writer, Event::End(BytesEnd::new("mwg-rs:Regions")))?;
            emit(&mut writer, Event::End(BytesEnd::new("rdf:Description")))?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("rdf:RDF")))?;
        emit(&mut writer, Event::End(BytesEnd::new("x:xmpmeta")))?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| XmpError::Serialize(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }

    /// Read a sidecar from disk
    pub fn read(path: &Path) -> Result<Self, XmpError> {
        let xml = fs::read_to_string(path).map_err(|source| XmpError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        super::parse::parse(&xml, path)
    }

    /// Write the sidecar, replacing the file if it exists
    pub fn write(&self, path: &Path) -> Result<(), XmpError> {
        let xml = self.to_xml()?;
        fs::write(path, xml).map_err(|source| XmpError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub(super) fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmpError> {
    writer
        .write_event(event)
        .map_err(|e| XmpError::Serialize(e.to_string()))
}

pub(super) fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), XmpError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}
