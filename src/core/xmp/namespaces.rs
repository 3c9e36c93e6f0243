//! Namespace prefixes understood by the sidecar reader and writer.

use crate::error::XmpError;

pub const NS_X: &str = "adobe:ns:meta/";
pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const NS_MWG_RS: &str = "http://www.metadataworkinggroup.com/schemas/regions/";
pub const NS_ST_AREA: &str = "http://ns.adobe.com/xmp/sType/Area#";

/// Prefixes tags may use without declaring anything
pub const TAG_NAMESPACES: &[(&str, &str)] = &[
    ("dc", NS_DC),
    ("xmp", "http://ns.adobe.com/xap/1.0/"),
    ("photoshop", "http://ns.adobe.com/photoshop/1.0/"),
    ("xmpRights", "http://ns.adobe.com/xap/1.0/rights/"),
    ("Iptc4xmpCore", "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/"),
    ("exif", "http://ns.adobe.com/exif/1.0/"),
];

const FALLBACK_PREFIX: &str = "http://ns.example.com/";
const FALLBACK_SUFFIX: &str = "/1.0/";

/// Namespace URI of a tag prefix; unknown prefixes get a placeholder namespace
pub fn namespace_for(prefix: &str) -> String {
    TAG_NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| uri.to_string())
        .unwrap_or_else(|| format!("{FALLBACK_PREFIX}{prefix}{FALLBACK_SUFFIX}"))
}

/// Tag prefix for a namespace URI, if it is one we hand out
pub fn prefix_for(uri: &str) -> Option<String> {
    if let Some((prefix, _)) = TAG_NAMESPACES.iter().find(|(_, u)| *u == uri) {
        return Some(prefix.to_string());
    }
    uri.strip_prefix(FALLBACK_PREFIX)
        .and_then(|rest| rest.strip_suffix(FALLBACK_SUFFIX))
        .filter(|p| !p.is_empty() && !p.contains('/'))
        .map(str::to_string)
}

/// True for prefixes that are part of the sidecar structure, not tags
pub fn is_structural(prefix: &str) -> bool {
    matches!(prefix, "x" | "rdf" | "mwg-rs" | "stArea" | "xml" | "xmlns")
}

/// `prefix:local` of a property element or attribute.
///
/// Namespaces we hand out map to their own prefix; any other namespace
/// keeps the prefix the file declared for it. Structural names are not tags.
pub fn property_key(ns: &str, local: &str, declared_prefix: Option<String>) -> Option<String> {
    if let Some(prefix) = prefix_for(ns) {
        return Some(format!("{prefix}:{local}"));
    }
    let prefix = declared_prefix.filter(|p| !is_structural(p))?;
    Some(format!("{prefix}:{local}"))
}

/// Normalize a user tag key to `prefix:local`.
///
/// Keys without a prefix go to Dublin Core.
pub fn normalize_key(key: &str) -> Result<String, XmpError> {
    let invalid = || XmpError::InvalidTag {
        key: key.to_string(),
    };

    let (prefix, local) = match key.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("dc", key),
    };
    if !is_xml_name(prefix) || !is_xml_name(local) || is_structural(prefix) {
        return Err(invalid());
    }
    Ok(format!("{prefix}:{local}"))
}

fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
