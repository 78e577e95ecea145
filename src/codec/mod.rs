//! Sectioned `key=value` text documents.
//!
//! Annotation files, the car roster and the co-driver packages all share the
//! same INI-like layout. [`StructuredTextCodec`] is the seam the rest of the
//! crate parses and writes them through; [`IniCodec`] is the implementation.
mod ini_codec;
pub use ini_codec::*;


#[cfg(test)]
use mockall::automock;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;

use crate::Result;

#[cfg_attr(test, automock)]
pub trait StructuredTextCodec: Send + Sync + 'static {
    fn parse(
        &self,
        text: &str,
    ) -> Result<IniDocument>;

    fn serialize(
        &self,
        document: &IniDocument,
    ) -> String;
}

/// One `[name]` block. Entries keep file order; a repeated key overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set(key, value);
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys starting with `prefix`, in file order
    pub fn entries_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries().filter(move |(k, _)| k.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed document. Keys that appear before the first header live in an
/// unnamed leading section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(
        &self,
        name: &str,
    ) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Returns the named section, appending an empty one when absent.
    pub fn section_mut(
        &mut self,
        name: &str,
    ) -> &mut IniSection {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(IniSection::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn push_section(
        &mut self,
        section: IniSection,
    ) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => {
                for (k, v) in section.entries {
                    existing.set(k, v);
                }
            }
            None => self.sections.push(section),
        }
    }

    pub fn get(
        &self,
        section: &str,
        key: &str,
    ) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    /// Sections whose name starts with `prefix`, with the prefix stripped
    pub fn sections_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a IniSection)> + 'a {
        self.sections
            .iter()
            .filter_map(move |s| s.name.strip_prefix(prefix).map(|rest| (rest, s)))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// JSON view: `{ "<section>": { "<key>": "<value>" } }`, leading unnamed
/// entries flattened at the top level.
impl Serialize for IniDocument {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for section in &self.sections {
            if section.name.is_empty() {
                for (k, v) in section.entries() {
                    map.serialize_entry(k, v)?;
                }
            } else {
                map.serialize_entry(&section.name, section)?;
            }
        }
        map.end()
    }
}

impl Serialize for IniSection {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in self.entries() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
