//! Media types identifying the wire format of a response.
//!
//! A media type is the `(type, subtype, charset)` triple negotiated for a
//! response. It keys the registry of base mapper configurations, so equality
//! is structural after normalisation: type and subtype are compared
//! case-insensitively, as is the charset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a media type cannot be constructed or parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaTypeError {
    /// The primary type was empty
    #[error("media type must have a non-empty type")]
    EmptyType,
    /// The subtype was empty
    #[error("media type must have a non-empty subtype")]
    EmptySubtype,
    /// The string was not of the form `type/subtype[; param=value]*`
    #[error("malformed media type: {0:?}")]
    Malformed(String),
}

/// Wire formats the encoder knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON via `serde_json`
    Json,
    /// XML via `quick-xml`
    Xml,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => f.write_str("json"),
            WireFormat::Xml => f.write_str("xml"),
        }
    }
}

/// A normalised `(type, subtype, charset)` media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaType {
    kind: String,
    subtype: String,
    charset: Option<String>,
}

impl MediaType {
    /// Create a media type without a charset.
    pub fn new(kind: &str, subtype: &str) -> Result<Self, MediaTypeError> {
        let kind = kind.trim();
        let subtype = subtype.trim();
        if kind.is_empty() {
            return Err(MediaTypeError::EmptyType);
        }
        if subtype.is_empty() {
            return Err(MediaTypeError::EmptySubtype);
        }
        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            charset: None,
        })
    }

    /// Return a copy of this media type carrying the given charset.
    ///
    /// An empty charset clears it.
    pub fn with_charset(mut self, charset: &str) -> Self {
        let charset = charset.trim().trim_matches('"');
        self.charset = if charset.is_empty() {
            None
        } else {
            Some(charset.to_ascii_uppercase())
        };
        self
    }

    /// Parse `type/subtype[; charset=X]`. Parameters other than `charset`
    /// are accepted and dropped.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let mut parts = input.split(';');
        let essence = parts.next().unwrap_or_default();
        let (kind, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeError::Malformed(input.to_string()))?;
        let mut media = Self::new(kind, subtype)?;

        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError::Malformed(input.to_string()))?;
            if name.trim().eq_ignore_ascii_case("charset") {
                media = media.with_charset(value);
            }
        }

        Ok(media)
    }

    /// `application/json`
    pub fn application_json() -> Self {
        Self::known("application", "json")
    }

    /// `application/json;charset=UTF-8`
    pub fn application_json_utf8() -> Self {
        Self::application_json().with_charset("UTF-8")
    }

    /// `application/xml`
    pub fn application_xml() -> Self {
        Self::known("application", "xml")
    }

    /// `application/xml;charset=UTF-8`
    pub fn application_xml_utf8() -> Self {
        Self::application_xml().with_charset("UTF-8")
    }

    /// `text/xml`
    pub fn text_xml() -> Self {
        Self::known("text", "xml")
    }

    fn known(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            charset: None,
        }
    }

    /// Primary type, e.g. `application`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Subtype, e.g. `json` or `vnd.api+json`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Charset parameter, upper-cased.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Structured syntax suffix (`json` for `vnd.api+json`).
    pub fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Wire format implied by the subtype or its structured suffix.
    pub fn wire_format(&self) -> Option<WireFormat> {
        let format = self.suffix().unwrap_or(&self.subtype);
        match format {
            "json" => Some(WireFormat::Json),
            "xml" => Some(WireFormat::Xml),
            _ => None,
        }
    }

    /// The same media type with the charset removed.
    pub fn without_charset(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            subtype: self.subtype.clone(),
            charset: None,
        }
    }

    /// The structured-suffix wildcard this type falls under, e.g.
    /// `application/*+json` for `application/vnd.api+json`.
    pub fn suffix_wildcard(&self) -> Option<Self> {
        let suffix = self.suffix()?;
        Some(Self {
            kind: self.kind.clone(),
            subtype: format!("*+{}", suffix),
            charset: None,
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        if let Some(charset) = &self.charset {
            write!(f, ";charset={}", charset)?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MediaType {
    type Error = MediaTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_charset() {
        let media = MediaType::parse("Application/JSON; charset=utf-8").unwrap();
        assert_eq!(media.kind(), "application");
        assert_eq!(media.subtype(), "json");
        assert_eq!(media.charset(), Some("UTF-8"));
        assert_eq!(media, MediaType::application_json_utf8());
    }

    #[test]
    fn test_parse_ignores_other_parameters() {
        let media = MediaType::parse("application/xml; q=0.9").unwrap();
        assert_eq!(media, MediaType::application_xml());
    }

    #[test]
    fn test_parse_rejects_missing_subtype() {
        assert_eq!(
            MediaType::parse("application/"),
            Err(MediaTypeError::EmptySubtype)
        );
        assert_eq!(MediaType::parse("/json"), Err(MediaTypeError::EmptyType));
        assert!(matches!(
            MediaType::parse("json"),
            Err(MediaTypeError::Malformed(_))
        ));
    }

    #[test]
    fn test_charset_distinguishes_media_types() {
        assert_ne!(
            MediaType::application_json(),
            MediaType::application_json_utf8()
        );
        assert_eq!(
            MediaType::application_json_utf8().without_charset(),
            MediaType::application_json()
        );
    }

    #[test]
    fn test_wire_format_from_suffix() {
        let vendor = MediaType::parse("application/vnd.api+json").unwrap();
        assert_eq!(vendor.wire_format(), Some(WireFormat::Json));
        assert_eq!(
            vendor.suffix_wildcard().unwrap().to_string(),
            "application/*+json"
        );
        assert_eq!(MediaType::text_xml().wire_format(), Some(WireFormat::Xml));
        assert_eq!(
            MediaType::parse("text/plain").unwrap().wire_format(),
            None
        );
    }

    #[test]
    fn test_display_round_trip() {
        let media = MediaType::application_xml_utf8();
        let parsed: MediaType = media.to_string().parse().unwrap();
        assert_eq!(parsed, media);
    }
}
