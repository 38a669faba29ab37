//! Config documents: the in-memory form of `export default { … }` files.
//!
//! A document maps channel keys to value trees. Per-brand files are keyed
//! by host directly; the shared novel file is keyed by brand, then host.
//! [`ChannelSlot`] hides that difference from callers.

pub mod normalize;
pub mod value;

use indexmap::IndexMap;

pub use normalize::{to_strict_json, EXPORT_PREFIX};
pub use value::{ConfigMap, ConfigValue};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The text is not a valid object literal even after normalization.
    #[error("Malformed config document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize config document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A brand entry that must be a mapping holds some other shape.
    #[error("Entry '{key}' is a {found}, expected an object")]
    NotAMapping { key: String, found: &'static str },
}

/// Location of one channel inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelSlot {
    /// `{host: config}`
    Flat { host: String },
    /// `{brand: {host: config}}`
    Nested { brand: String, host: String },
}

impl ChannelSlot {
    pub fn host(&self) -> &str {
        match self {
            Self::Flat { host } | Self::Nested { host, .. } => host,
        }
    }
}

impl std::fmt::Display for ChannelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat { host } => f.write_str(host),
            Self::Nested { brand, host } => write!(f, "{brand}.{host}"),
        }
    }
}

/// Ordered top-level mapping of a config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse module text (`export default {…}`) into a document.
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        let json = to_strict_json(source);
        let entries: IndexMap<String, ConfigValue> =
            serde_json::from_str(&json).map_err(DocumentError::Parse)?;
        Ok(Self { entries })
    }

    /// Render as an `export default` module with two-space indentation.
    pub fn render(&self) -> Result<String, DocumentError> {
        let body = serde_json::to_string_pretty(&self.entries).map_err(DocumentError::Serialize)?;
        Ok(format!("{EXPORT_PREFIX} {body}\n"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a top-level entry, keeping its position if present.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> Option<ConfigValue> {
        self.entries.insert(key.into(), value)
    }

    /// Remove a top-level entry, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.entries.shift_remove(key)
    }

    /// Channel value at `slot`, if present.
    pub fn channel(&self, slot: &ChannelSlot) -> Option<&ConfigValue> {
        match slot {
            ChannelSlot::Flat { host } => self.entries.get(host),
            ChannelSlot::Nested { brand, host } => self.entries.get(brand)?.get(host),
        }
    }

    /// Write `value` at `slot`, creating the brand mapping when needed.
    pub fn set_channel(&mut self, slot: &ChannelSlot, value: ConfigValue) -> Result<(), DocumentError> {
        match slot {
            ChannelSlot::Flat { host } => {
                self.entries.insert(host.clone(), value);
            }
            ChannelSlot::Nested { brand, host } => {
                let entry = self
                    .entries
                    .entry(brand.clone())
                    .or_insert_with(ConfigValue::object);
                let found = entry.kind_name();
                let map = entry.as_object_mut().ok_or_else(|| DocumentError::NotAMapping {
                    key: brand.clone(),
                    found,
                })?;
                map.insert(host.clone(), value);
            }
        }
        Ok(())
    }

    /// Remove the value at `slot`. An emptied brand mapping is removed too.
    pub fn remove_channel(&mut self, slot: &ChannelSlot) -> Option<ConfigValue> {
        match slot {
            ChannelSlot::Flat { host } => self.entries.shift_remove(host),
            ChannelSlot::Nested { brand, host } => {
                let map = self.entries.get_mut(brand)?.as_object_mut()?;
                let removed = map.shift_remove(host);
                if map.is_empty() {
                    self.entries.shift_remove(brand);
                }
                removed
            }
        }
    }
}
