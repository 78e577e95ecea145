use std::fmt::Write;

use super::IniDocument;
use super::IniSection;
use super::StructuredTextCodec;
use crate::ParseError;
use crate::Result;

/// INI dialect used by the game plugins.
///
/// - `;` and `#` start comment lines
/// - `[name]` opens a section; repeated headers merge into the first one
/// - `key=value` splits at the first `=`; both sides are trimmed and one
///   level of matching quotes is removed from the value
/// - a bare `key` line is read as `key=true`
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl IniCodec {
    pub fn new() -> Self {
        IniCodec
    }
}

impl StructuredTextCodec for IniCodec {
    fn parse(
        &self,
        text: &str,
    ) -> Result<IniDocument> {
        let mut document = IniDocument::new();
        let mut current = IniSection::new("");

        // strip a UTF-8 BOM left by Windows editors
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') || line.len() < 2 {
                    return Err(ParseError::MalformedSection {
                        line: line_no,
                        content: line.to_string(),
                    }
                    .into());
                }
                let name = line[1..line.len() - 1].trim().to_string();
                let finished = std::mem::replace(&mut current, IniSection::new(name));
                if !finished.name().is_empty() || !finished.is_empty() {
                    document.push_section(finished);
                }
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), unquote(v.trim())),
                None => (line, "true"),
            };
            if key.is_empty() {
                return Err(ParseError::MissingKey { line: line_no }.into());
            }
            current.set(key, value);
        }

        if !current.name().is_empty() || !current.is_empty() {
            document.push_section(current);
        }
        Ok(document)
    }

    fn serialize(
        &self,
        document: &IniDocument,
    ) -> String {
        let mut out = String::new();
        let mut first = true;
        for section in document.sections() {
            if !first {
                out.push('\n');
            }
            first = false;
            if !section.name().is_empty() {
                let _ = writeln!(out, "[{}]", section.name());
            }
            for (k, v) in section.entries() {
                let _ = writeln!(out, "{}={}", k, v);
            }
        }
        out
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
