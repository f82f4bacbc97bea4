//! Byte-level encoding of pruned documents.
//!
//! JSON goes through `serde_json`; XML goes through `quick-xml`'s serde
//! serializer and requires the `xml` feature.

use crate::application::error::EncodeError;
use crate::application::ports::Mapper;
use crate::domain::mapper_config::BaseMapperConfig;
use crate::domain::media_type::WireFormat;
use crate::infrastructure::visitor::DocumentPruner;
use serde_json::Value;
use std::any::Any;
use std::io;

/// Element name used for each entry when a top-level array is written as XML.
pub const XML_ITEM_ELEMENT: &str = "item";

/// Encode an already-pruned document with the settings of `config`.
pub(crate) fn encode(
    config: &BaseMapperConfig,
    document: &Value,
    out: &mut dyn io::Write,
) -> Result<(), EncodeError> {
    match config.format() {
        WireFormat::Json => encode_json(document, config.is_pretty(), out),
        WireFormat::Xml => encode_xml(document, config.xml_root(), config.is_pretty(), out),
    }
}

fn encode_json(
    document: &Value,
    pretty: bool,
    out: &mut dyn io::Write,
) -> Result<(), EncodeError> {
    if pretty {
        serde_json::to_writer_pretty(out, document)?;
    } else {
        serde_json::to_writer(out, document)?;
    }
    Ok(())
}

#[cfg(feature = "xml")]
fn encode_xml(
    document: &Value,
    root: &str,
    pretty: bool,
    out: &mut dyn io::Write,
) -> Result<(), EncodeError> {
    use serde::Serialize;

    // XML has no anonymous sequences; a top-level array becomes repeated
    // item elements under the root.
    let wrapped;
    let document = if document.is_array() {
        let mut map = serde_json::Map::new();
        map.insert(XML_ITEM_ELEMENT.to_string(), document.clone());
        wrapped = Value::Object(map);
        &wrapped
    } else {
        document
    };

    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::with_root(&mut buffer, Some(root))
        .map_err(|err| EncodeError::Xml(err.to_string()))?;
    if pretty {
        serializer.indent(' ', 2);
    }
    document
        .serialize(serializer)
        .map_err(|err| EncodeError::Xml(err.to_string()))?;

    out.write_all(buffer.as_bytes())?;
    Ok(())
}

#[cfg(not(feature = "xml"))]
fn encode_xml(
    _document: &Value,
    _root: &str,
    _pretty: bool,
    _out: &mut dyn io::Write,
) -> Result<(), EncodeError> {
    Err(EncodeError::XmlDisabled)
}

/// A base configuration writes unfiltered output: it applies its own naming
/// and null handling but excludes nothing.
impl Mapper for BaseMapperConfig {
    fn wire_format(&self) -> WireFormat {
        self.format()
    }

    fn write_value(&self, value: Value, out: &mut dyn io::Write) -> Result<(), EncodeError> {
        let document = DocumentPruner::unfiltered(self).prune(value, None);
        encode(self, &document, out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
