//! Attribute helpers shared by the XML rewriting passes.

use crate::error::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

/// Rebuilds an element with the given attribute overrides applied.
///
/// Attribute order is preserved so that rewriting a document twice yields
/// byte-identical output. Attributes already present keep their position and
/// have their value replaced; overrides for attributes the element does not
/// carry are appended at the end. Untouched attribute values are copied as-is
/// without re-escaping.
pub(crate) fn set_attributes(
    elem: &BytesStart<'_>,
    overrides: &[(&str, &str)],
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    let mut applied = vec![false; overrides.len()];
    for attr in elem.attributes() {
        let attr =
            attr.map_err(|e| Error::ConfigTransform(format!("Malformed attribute: {}", e)))?;
        let key = attr.key.as_ref();
        if let Some(pos) = overrides.iter().position(|(k, _)| k.as_bytes() == key) {
            rebuilt.push_attribute((overrides[pos].0, overrides[pos].1));
            applied[pos] = true;
        } else {
            rebuilt.push_attribute((key, attr.value.as_ref()));
        }
    }
    for (pos, (key, value)) in overrides.iter().enumerate() {
        if !applied[pos] {
            rebuilt.push_attribute((*key, *value));
        }
    }
    Ok(rebuilt)
}

/// Writes one event, mapping writer failures onto the crate error type.
pub(crate) fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::ConfigTransform(format!("Failed to write XML event: {}", e)))
}

/// Reads a single attribute value from an element, unescaped.
pub(crate) fn attr_value(elem: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr =
            attr.map_err(|e| Error::ConfigTransform(format!("Malformed attribute: {}", e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|e| {
                Error::ConfigTransform(format!("Malformed attribute value: {}", e))
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
