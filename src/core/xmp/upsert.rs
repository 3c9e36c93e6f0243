//! Tag upsert on an existing sidecar.
//!
//! The document is streamed event by event. A property being set is
//! replaced where it stands, whether it was written as an element or as an
//! attribute of `rdf:Description`; tags not found anywhere go into a new
//! `rdf:Description` before `</rdf:RDF>`. Every other event is copied
//! through as read, so arrays and language alternatives survive, as does
//! anything this crate does not model.

use super::namespaces::{namespace_for, property_key, NS_RDF};
use super::parse::{namespace_of, prefix_of};
use super::sidecar::{emit, text_element};
use crate::error::XmpError;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::reader::NsReader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

/// Rewrite `xml` with every `prefix:local` key of `tags` set to its value
pub(crate) fn upsert(
    xml: &str,
    path: &Path,
    tags: &BTreeMap<String, String>,
) -> Result<String, XmpError> {
    let error = |reason: String| XmpError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = NsReader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut missing: BTreeMap<&str, &str> = tags
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut stack: Vec<(String, String)> = Vec::new();
    // Depth of a replaced property whose old content is being dropped
    let mut skip_to: Option<usize> = None;
    let mut closed_rdf = false;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| error(e.to_string()))?;
        let ns = namespace_of(ns);

        if let Some(depth) = skip_to {
            match event {
                Event::Start(e) => stack.push((ns, local_of(&e))),
                Event::End(_) => {
                    if stack.len() == depth {
                        skip_to = None;
                    }
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => {
                let local = local_of(&e);
                let under_description = is_description(stack.last());
                stack.push((ns.clone(), local.clone()));

                if ns == NS_RDF && local == "Description" {
                    match rewrite_description(&reader, &e, tags, &mut missing).map_err(error)? {
                        Some(rewritten) => emit(&mut writer, Event::Start(rewritten))?,
                        None => emit(&mut writer, Event::Start(e))?,
                    }
                } else if let Some((key, value)) =
                    under_description.then(|| matching_tag(&ns, &local, &e, tags)).flatten()
                {
                    replace_property(&mut writer, &e, value)?;
                    missing.remove(key);
                    skip_to = Some(stack.len());
                } else {
                    emit(&mut writer, Event::Start(e))?;
                }
            }
            Event::Empty(e) => {
                let local = local_of(&e);
                if ns == NS_RDF && local == "Description" {
                    match rewrite_description(&reader, &e, tags, &mut missing).map_err(error)? {
                        Some(rewritten) => emit(&mut writer, Event::Empty(rewritten))?,
                        None => emit(&mut writer, Event::Empty(e))?,
                    }
                } else if let Some((key, value)) = is_description(stack.last())
                    .then(|| matching_tag(&ns, &local, &e, tags))
                    .flatten()
                {
                    replace_property(&mut writer, &e, value)?;
                    missing.remove(key);
                } else {
                    emit(&mut writer, Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                if stack.last().is_some_and(|(n, l)| n == NS_RDF && l == "RDF") {
                    append_description(&mut writer, &missing)?;
                    missing.clear();
                    closed_rdf = true;
                }
                stack.pop();
                emit(&mut writer, Event::End(e))?;
            }
            Event::Eof => break,
            other => emit(&mut writer, other)?,
        }
    }

    if !stack.is_empty() {
        return Err(error("unexpected end of document".to_string()));
    }
    if !closed_rdf {
        return Err(error("no rdf:RDF element".to_string()));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| XmpError::Serialize(e.to_string()))
}

fn local_of(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn is_description(frame: Option<&(String, String)>) -> bool {
    frame.is_some_and(|(ns, local)| ns == NS_RDF && local == "Description")
}

fn matching_tag<'t>(
    ns: &str,
    local: &str,
    element: &BytesStart<'_>,
    tags: &'t BTreeMap<String, String>,
) -> Option<(&'t str, &'t str)> {
    let key = property_key(ns, local, prefix_of(element.name()))?;
    tags.get_key_value(key.as_str())
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

/// New value for a property element; namespace declarations on it are kept
fn replace_property(
    writer: &mut Writer<Vec<u8>>,
    element: &BytesStart<'_>,
    value: &str,
) -> Result<(), XmpError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut replacement = BytesStart::new(name.clone());
    for attribute in element.attributes().flatten() {
        if attribute.key.as_ref().starts_with(b"xmlns") {
            replacement.push_attribute(attribute);
        }
    }
    emit(writer, Event::Start(replacement))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// `rdf:Description` with attribute-form properties replaced.
///
/// `None` when no attribute matched and the element can be copied as is.
fn rewrite_description<'t>(
    reader: &NsReader<&[u8]>,
    element: &BytesStart<'_>,
    tags: &'t BTreeMap<String, String>,
    missing: &mut BTreeMap<&'t str, &'t str>,
) -> Result<Option<BytesStart<'static>>, String> {
    let mut attributes: Vec<(Vec<u8>, Vec<u8>, Option<&'t str>)> = Vec::new();
    let mut replaced = false;

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let mut replacement = None;
        if !attribute.key.as_ref().starts_with(b"xmlns") {
            let (resolved, local) = reader.resolve_attribute(attribute.key);
            let ns = namespace_of(resolved);
            let local = String::from_utf8_lossy(local.as_ref()).into_owned();
            let matched = (ns != NS_RDF)
                .then(|| property_key(&ns, &local, prefix_of(attribute.key)))
                .flatten()
                .and_then(|key| tags.get_key_value(key.as_str()));
            if let Some((key, value)) = matched {
                missing.remove(key.as_str());
                replacement = Some(value.as_str());
                replaced = true;
            }
        }
        attributes.push((
            attribute.key.as_ref().to_vec(),
            attribute.value.into_owned(),
            replacement,
        ));
    }

    if !replaced {
        return Ok(None);
    }
    let mut rewritten = BytesStart::new(String::from_utf8_lossy(element.name().as_ref()).into_owned());
    for (key, raw, replacement) in &attributes {
        match replacement {
            Some(value) => {
                let key = String::from_utf8_lossy(key);
                rewritten.push_attribute((&*key, *value));
            }
            None => rewritten.push_attribute(Attribute {
                key: QName(key.as_slice()),
                value: Cow::Borrowed(raw.as_slice()),
            }),
        }
    }
    Ok(Some(rewritten))
}

/// Tags that were not in the document, one description per prefix
fn append_description(
    writer: &mut Writer<Vec<u8>>,
    missing: &BTreeMap<&str, &str>,
) -> Result<(), XmpError> {
    let mut by_prefix: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (key, value) in missing {
        let prefix = key.split_once(':').map(|(p, _)| p).unwrap_or("dc");
        by_prefix.entry(prefix).or_default().push((*key, *value));
    }

    for (prefix, entries) in by_prefix {
        let declaration = format!("xmlns:{prefix}");
        let uri = namespace_for(prefix);
        let mut description = BytesStart::new("rdf:Description");
        description.push_attribute(("xmlns:rdf", NS_RDF));
        description.push_attribute(("rdf:about", ""));
        description.push_attribute((declaration.as_str(), uri.as_str()));
        emit(writer, Event::Start(description))?;
        for (key, value) in entries {
            text_element(writer, key, value)?;
        }
        emit(writer, Event::End(BytesEnd::new("rdf:Description")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xmp::parse::parse;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const BAG_AND_ALT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/">
      <dc:subject><rdf:Bag><rdf:li>beach</rdf:li><rdf:li>1970s</rdf:li></rdf:Bag></dc:subject>
      <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Summer</rdf:li></rdf:Alt></dc:title>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>"#;

    #[test]
    fn arrays_and_language_alternatives_survive() {
        let path = Path::new("a.xmp");

        let updated = upsert(BAG_AND_ALT, path, &tags(&[("dc:event", "wedding")])).unwrap();

        assert!(updated.contains(
            "<dc:subject><rdf:Bag><rdf:li>beach</rdf:li><rdf:li>1970s</rdf:li></rdf:Bag></dc:subject>"
        ));
        assert!(updated.contains(
            r#"<dc:title><rdf:Alt><rdf:li xml:lang="x-default">Summer</rdf:li></rdf:Alt></dc:title>"#
        ));
        assert!(updated.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert_eq!(parse(&updated, path).unwrap().get("dc:event"), Some("wedding"));
    }

    #[test]
    fn existing_element_and_attribute_are_replaced_in_place() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
<rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/" xmp:Rating="4" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:source>Box 3</dc:source>
<dc:creator><rdf:Seq><rdf:li>Ada</rdf:li></rdf:Seq></dc:creator>
</rdf:Description></rdf:RDF></x:xmpmeta>"#;

        let updated = upsert(
            xml,
            Path::new("a.xmp"),
            &tags(&[("dc:source", "Box 4 & 5"), ("xmp:Rating", "5")]),
        )
        .unwrap();

        assert!(updated.contains("<dc:source>Box 4 &amp; 5</dc:source>"));
        assert!(!updated.contains("Box 3"));
        assert!(updated.contains(r#"xmp:Rating="5""#));
        assert!(updated.contains("<dc:creator><rdf:Seq><rdf:li>Ada</rdf:li></rdf:Seq></dc:creator>"));
        assert_eq!(updated.matches("<rdf:Description").count(), 1);
    }

    #[test]
    fn structured_property_is_overwritten_with_text() {
        let updated = upsert(
            BAG_AND_ALT,
            Path::new("a.xmp"),
            &tags(&[("dc:subject", "wedding")]),
        )
        .unwrap();

        assert!(updated.contains("<dc:subject>wedding</dc:subject>"));
        assert!(!updated.contains("beach"));
        assert!(updated.contains(r#"<rdf:li xml:lang="x-default">Summer</rdf:li>"#));
    }

    #[test]
    fn document_without_rdf_is_rejected() {
        let result = upsert(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"></x:xmpmeta>"#,
            Path::new("a.xmp"),
            &tags(&[("dc:event", "x")]),
        );
        assert!(matches!(result, Err(XmpError::Parse { .. })));
    }
}
