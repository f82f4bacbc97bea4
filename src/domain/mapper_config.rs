//! Base mapper configurations and global serialization options.

use crate::domain::media_type::WireFormat;
use serde::{Deserialize, Serialize};

/// How field names are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Names as declared
    #[default]
    AsDeclared,
    /// `userName`
    CamelCase,
    /// `user_name`
    SnakeCase,
    /// `user-name`
    KebabCase,
}

impl NamingStrategy {
    /// Rename a declared field name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::AsDeclared => name.to_string(),
            NamingStrategy::CamelCase => {
                let mut out = String::with_capacity(name.len());
                for (i, word) in split_words(name).iter().enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        let mut chars = word.chars();
                        if let Some(first) = chars.next() {
                            out.extend(first.to_uppercase());
                            out.push_str(chars.as_str());
                        }
                    }
                }
                out
            }
            NamingStrategy::SnakeCase => split_words(name).join("_"),
            NamingStrategy::KebabCase => split_words(name).join("-"),
        }
    }
}

/// Split `userName`, `user_name` or `user-name` into lowercase words.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// How `null` values are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    /// Write `null` fields
    #[default]
    Include,
    /// Drop fields whose value is `null`
    Omit,
}

/// A fully configured encoder for one wire format.
///
/// The engine never changes a registered configuration; every filtered
/// mapper works on its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseMapperConfig {
    format: WireFormat,
    #[serde(default)]
    naming: NamingStrategy,
    #[serde(default)]
    nulls: NullHandling,
    #[serde(default)]
    pretty: bool,
    #[serde(default = "default_xml_root")]
    xml_root: String,
}

fn default_xml_root() -> String {
    "response".to_string()
}

impl BaseMapperConfig {
    /// Default JSON configuration.
    pub fn json() -> Self {
        Self::for_format(WireFormat::Json)
    }

    /// Default XML configuration.
    pub fn xml() -> Self {
        Self::for_format(WireFormat::Xml)
    }

    /// Default configuration for a wire format.
    pub fn for_format(format: WireFormat) -> Self {
        Self {
            format,
            naming: NamingStrategy::default(),
            nulls: NullHandling::default(),
            pretty: false,
            xml_root: default_xml_root(),
        }
    }

    /// Set the naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Set null handling.
    pub fn with_null_handling(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    /// Enable or disable pretty printing.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the XML root element name. Ignored for JSON.
    pub fn with_xml_root(mut self, root: impl Into<String>) -> Self {
        self.xml_root = root.into();
        self
    }

    /// Wire format.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Naming strategy.
    pub fn naming(&self) -> NamingStrategy {
        self.naming
    }

    /// Null handling.
    pub fn null_handling(&self) -> NullHandling {
        self.nulls
    }

    /// Whether output is pretty printed.
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// XML root element name.
    pub fn xml_root(&self) -> &str {
        &self.xml_root
    }

    /// Layer process-wide options over this configuration.
    pub(crate) fn apply(&mut self, options: &SerializationConfig) {
        if let Some(nulls) = options.null_handling {
            self.nulls = nulls;
        }
        if let Some(pretty) = options.pretty {
            self.pretty = pretty;
        }
    }
}

/// Process-wide serialization options applied to every filtered mapper.
///
/// `None` keeps the base configuration's own setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationConfig {
    /// Null handling override
    #[serde(default)]
    pub null_handling: Option<NullHandling>,
    /// Pretty-print override
    #[serde(default)]
    pub pretty: Option<bool>,
}

impl SerializationConfig {
    /// Options that change nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override null handling.
    pub fn with_null_handling(mut self, nulls: NullHandling) -> Self {
        self.null_handling = Some(nulls);
        self
    }

    /// Override pretty printing.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = Some(pretty);
        self
    }
}
