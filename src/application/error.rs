//! Errors raised while filtering a single response.
//!
//! None of these abort a response: the engine logs them and falls back to
//! unfiltered output.

use crate::domain::media_type::MediaType;

/// Failure to turn a document into bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// `serde_json` rejected the document
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    /// `quick-xml` rejected the document
    #[error("XML encoding failed: {0}")]
    Xml(String),
    /// The crate was built without the `xml` feature
    #[error("XML support is disabled (enable the `xml` feature)")]
    XmlDisabled,
    /// Writing to the output failed
    #[error("failed to write encoded output: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request filtering failure.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// No base configuration is registered for the media type
    #[error("no base mapper registered for media type {0}")]
    ConfigurationMissing(MediaType),
    /// The media type does not map to a known wire format
    #[error("media type {0} has no supported wire format")]
    UnsupportedMediaType(MediaType),
    /// The response object could not be converted into a document
    #[error("failed to convert response object: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The document could not be encoded
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
