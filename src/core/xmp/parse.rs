//! Sidecar reader.
//!
//! Understands simple text properties (as elements or as attributes of
//! `rdf:Description`), `rdf:Alt`/`rdf:Bag`/`rdf:Seq` properties, which
//! are flattened to a comma-separated string, and MWG face regions with
//! `stArea` given either as child elements or as attributes.
//!
//! The flattened view is for reading. Seeding tags into an existing file
//! goes through [`super::upsert`], which leaves other properties as written.

use super::namespaces::{prefix_for, property_key, NS_MWG_RS, NS_RDF, NS_ST_AREA};
use super::sidecar::{FaceRegion, RegionArea, XmpSidecar};
use crate::error::XmpError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    ns: String,
    local: String,
}

impl Frame {
    fn is(&self, ns: &str, local: &str) -> bool {
        self.ns == ns && self.local == local
    }
}

#[derive(Debug, Default)]
struct RegionDraft {
    depth: usize,
    name: Option<String>,
    kind: Option<String>,
    has_area: bool,
    x: Option<String>,
    y: Option<String>,
    w: Option<String>,
    h: Option<String>,
    unit: Option<String>,
}

impl RegionDraft {
    fn set_area_field(&mut self, field: &str, value: String) {
        match field {
            "x" => self.x = Some(value),
            "y" => self.y = Some(value),
            "w" => self.w = Some(value),
            "h" => self.h = Some(value),
            "unit" => self.unit = Some(value),
            _ => {}
        }
    }

    /// Regions without an area or with unparsable coordinates are dropped.
    fn finish(self) -> Option<FaceRegion> {
        if !self.has_area {
            return None;
        }
        let coordinate = |v: &Option<String>| -> Option<f64> {
            match v {
                Some(text) => text.trim().parse().ok(),
                None => Some(0.0),
            }
        };
        Some(FaceRegion {
            name: self.name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unknown".to_string()),
            kind: self.kind.filter(|k| !k.is_empty()).unwrap_or_else(|| "Face".to_string()),
            area: RegionArea {
                x: coordinate(&self.x)?,
                y: coordinate(&self.y)?,
                w: coordinate(&self.w)?,
                h: coordinate(&self.h)?,
                unit: self.unit.unwrap_or_else(|| "normalized".to_string()),
            },
        })
    }
}

struct OpenProperty {
    key: String,
    depth: usize,
    parts: Vec<String>,
}

struct Parser<'p> {
    path: &'p Path,
    sidecar: XmpSidecar,
    stack: Vec<Frame>,
    text: String,
    property: Option<OpenProperty>,
    regions_depth: Option<usize>,
    region: Option<RegionDraft>,
}

pub(crate) fn parse(xml: &str, path: &Path) -> Result<XmpSidecar, XmpError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parser = Parser {
        path,
        sidecar: XmpSidecar::default(),
        stack: Vec::new(),
        text: String::new(),
        property: None,
        regions_depth: None,
        region: None,
    };

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| parser.error(e.to_string()))?;
        let ns = namespace_of(ns);

        match event {
            Event::Start(e) => parser.open(&reader, ns, &e)?,
            Event::Empty(e) => {
                parser.open(&reader, ns, &e)?;
                parser.close();
            }
            Event::End(_) => parser.close(),
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| parser.error(e.to_string()))?;
                parser.text.push_str(&text);
            }
            Event::CData(c) => parser.text.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.stack.is_empty() {
        return Err(parser.error("unexpected end of document".to_string()));
    }
    Ok(parser.sidecar)
}

pub(super) fn namespace_of(result: ResolveResult<'_>) -> String {
    match result {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
        _ => String::new(),
    }
}

pub(super) fn prefix_of(name: QName<'_>) -> Option<String> {
    name.prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
}

impl Parser<'_> {
    fn error(&self, reason: String) -> XmpError {
        XmpError::Parse {
            path: self.path.to_path_buf(),
            reason,
        }
    }

    /// `prefix:local` for a property, remembering namespaces we do not know
    fn tag_key(&mut self, ns: &str, local: &str, declared_prefix: Option<String>) -> Option<String> {
        let key = property_key(ns, local, declared_prefix)?;
        if prefix_for(ns).is_none() && !ns.is_empty() {
            if let Some((prefix, _)) = key.split_once(':') {
                self.sidecar.namespaces.insert(prefix.to_string(), ns.to_string());
            }
        }
        Some(key)
    }

    fn open(
        &mut self,
        reader: &NsReader<&[u8]>,
        ns: String,
        element: &BytesStart<'_>,
    ) -> Result<(), XmpError> {
        let local = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let frame = Frame { ns, local };
        let parent_is_description = self
            .stack
            .last()
            .is_some_and(|p| p.is(NS_RDF, "Description"));
        self.stack.push(frame.clone());
        let depth = self.stack.len();
        self.text.clear();

        if frame.is(NS_RDF, "Description") {
            for attribute in element.attributes() {
                let attribute = attribute.map_err(|e| self.error(e.to_string()))?;
                if attribute.key.as_ref().starts_with(b"xmlns") {
                    continue;
                }
                let (resolved, local) = reader.resolve_attribute(attribute.key);
                let ns = namespace_of(resolved);
                let local = String::from_utf8_lossy(local.as_ref()).into_owned();
                let value = attribute
                    .unescape_value()
                    .map_err(|e| self.error(e.to_string()))?
                    .trim()
                    .to_string();
                if ns == NS_RDF || value.is_empty() {
                    continue;
                }
                if let Some(key) = self.tag_key(&ns, &local, prefix_of(attribute.key)) {
                    self.sidecar.tags.insert(key, value);
                }
            }
            return Ok(());
        }

        if parent_is_description && self.regions_depth.is_none() && self.property.is_none() {
            if frame.is(NS_MWG_RS, "Regions") {
                self.regions_depth = Some(depth);
                self.sidecar.regions.get_or_insert_with(Vec::new);
            } else if let Some(key) = self.tag_key(&frame.ns, &frame.local, prefix_of(element.name())) {
                self.property = Some(OpenProperty {
                    key,
                    depth,
                    parts: Vec::new(),
                });
            }
            return Ok(());
        }

        if self.regions_depth.is_some() {
            if frame.is(NS_RDF, "li") && self.region.is_none() {
                self.region = Some(RegionDraft {
                    depth,
                    ..RegionDraft::default()
                });
            } else if frame.is(NS_MWG_RS, "Area") {
                if let Some(region) = self.region.as_mut() {
                    region.has_area = true;
                    for attribute in element.attributes().flatten() {
                        let (resolved, local) = reader.resolve_attribute(attribute.key);
                        if namespace_of(resolved) != NS_ST_AREA {
                            continue;
                        }
                        let field = String::from_utf8_lossy(local.as_ref()).into_owned();
                        if let Ok(value) = attribute.unescape_value() {
                            region.set_area_field(&field, value.into_owned());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        let depth = self.stack.len();
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let text = std::mem::take(&mut self.text).trim().to_string();

        if let Some(region) = self.region.as_mut() {
            if frame.ns == NS_ST_AREA {
                region.set_area_field(&frame.local, text);
                return;
            }
            if frame.is(NS_MWG_RS, "Name") {
                region.name = Some(text);
                return;
            }
            if frame.is(NS_MWG_RS, "Type") {
                region.kind = Some(text);
                return;
            }
            if region.depth == depth {
                if let Some(done) = self.region.take().and_then(RegionDraft::finish) {
                    self.sidecar.regions.get_or_insert_with(Vec::new).push(done);
                }
                return;
            }
        }

        if self.regions_depth == Some(depth) {
            self.regions_depth = None;
            return;
        }

        if let Some(property) = self.property.as_mut() {
            if property.depth == depth {
                let value = if property.parts.is_empty() {
                    text
                } else {
                    property.parts.join(", ")
                };
                let key = property.key.clone();
                self.property = None;
                if !value.is_empty() {
                    self.sidecar.tags.insert(key, value);
                }
            } else if !text.is_empty() {
                property.parts.push(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_str(xml: &str) -> XmpSidecar {
        parse(xml, &PathBuf::from("test.xmp")).unwrap()
    }

    const RECOGNIZED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/" x:xmptk="Python XMP Toolkit">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description xmlns:dc="http://purl.org/dc/elements/1.1/" rdf:about="">
      <dc:source>Box 3</dc:source>
    </rdf:Description>
    <rdf:Description xmlns:xmp="http://ns.adobe.com/xap/1.0/" rdf:about="">
      <xmp:CreateDate>1987-06-01</xmp:CreateDate>
    </rdf:Description>
    <rdf:Description rdf:about="" xmlns:mwg-rs="http://www.metadataworkinggroup.com/schemas/regions/" xmlns:stArea="http://ns.adobe.com/xmp/sType/Area#">
      <mwg-rs:Regions>
        <mwg-rs:RegionList>
          <rdf:Seq>
            <rdf:li>
              <mwg-rs:Area>
                <stArea:x>0.532909</stArea:x>
                <stArea:y>0.364185</stArea:y>
                <stArea:w>0.131635</stArea:w>
                <stArea:h>0.124748</stArea:h>
                <stArea:unit>normalized</stArea:unit>
              </mwg-rs:Area>
              <mwg-rs:Name>Grandma</mwg-rs:Name>
              <mwg-rs:Type>Face</mwg-rs:Type>
            </rdf:li>
          </rdf:Seq>
        </mwg-rs:RegionList>
      </mwg-rs:Regions>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;

    #[test]
    fn reads_tags_and_regions() {
        let sidecar = parse_str(RECOGNIZED);

        assert_eq!(sidecar.get("dc:source"), Some("Box 3"));
        assert_eq!(sidecar.get("xmp:CreateDate"), Some("1987-06-01"));
        let regions = sidecar.regions.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "Grandma");
        assert_eq!(regions[0].kind, "Face");
        assert!((regions[0].area.x - 0.532909).abs() < 1e-9);
        assert_eq!(regions[0].area.unit, "normalized");
    }

    #[test]
    fn attribute_properties_and_areas() {
        let sidecar = parse_str(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/" xmp:Rating="4"
        xmlns:mwg-rs="http://www.metadataworkinggroup.com/schemas/regions/"
        xmlns:stArea="http://ns.adobe.com/xmp/sType/Area#">
      <mwg-rs:Regions rdf:parseType="Resource">
        <mwg-rs:RegionList>
          <rdf:Bag>
            <rdf:li rdf:parseType="Resource">
              <mwg-rs:Area stArea:x="0.5" stArea:y="0.4" stArea:w="0.1" stArea:h="0.2" stArea:unit="normalized"/>
              <mwg-rs:Type>Face</mwg-rs:Type>
            </rdf:li>
          </rdf:Bag>
        </mwg-rs:RegionList>
      </mwg-rs:Regions>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#,
        );

        assert_eq!(sidecar.get("xmp:Rating"), Some("4"));
        let regions = sidecar.regions.unwrap();
        assert_eq!(regions[0].name, "Unknown");
        assert!((regions[0].area.h - 0.2).abs() < 1e-9);
    }

    #[test]
    fn alt_values_are_flattened() {
        let sidecar = parse_str(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
<rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:subject><rdf:Bag><rdf:li>beach</rdf:li><rdf:li>1970s</rdf:li></rdf:Bag></dc:subject>
</rdf:Description></rdf:RDF></x:xmpmeta>"#,
        );

        assert_eq!(sidecar.get("dc:subject"), Some("beach, 1970s"));
        assert!(sidecar.regions.is_none());
    }

    #[test]
    fn unknown_namespace_keeps_declared_prefix() {
        let sidecar = parse_str(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
<rdf:Description rdf:about="" xmlns:lr="http://ns.adobe.com/lightroom/1.0/">
<lr:privateRTKInfo>x</lr:privateRTKInfo>
</rdf:Description></rdf:RDF></x:xmpmeta>"#,
        );

        assert_eq!(sidecar.get("lr:privateRTKInfo"), Some("x"));
        assert_eq!(
            sidecar.namespaces.get("lr").map(String::as_str),
            Some("http://ns.adobe.com/lightroom/1.0/")
        );
    }

    #[test]
    fn written_sidecar_parses_back() {
        let mut sidecar = XmpSidecar::new();
        sidecar.set_tag("dc:creator", "Ada & Co").unwrap();
        sidecar.set_tag("family:branch", "north").unwrap();
        sidecar.regions = Some(vec![FaceRegion::unknown_face(0.1, 0.2, 0.3, 0.4)]);

        let reparsed = parse_str(&sidecar.to_xml().unwrap());

        assert_eq!(reparsed.tags, sidecar.tags);
        assert_eq!(reparsed.regions, sidecar.regions);
    }

    #[test]
    fn truncated_document_is_an_error() {
        let result = parse("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF", Path::new("bad.xmp"));
        assert!(matches!(result, Err(XmpError::Parse { .. })));
    }
}
