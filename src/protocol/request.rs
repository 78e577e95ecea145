use std::collections::BTreeMap;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;

use crate::DeviceId;
use crate::ProtocolError;
use crate::Result;

/// One decoded client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Register { device_id: DeviceId },
    ShowDragArea,
    GetStageTimes(StageTimesQuery),
    Save(SaveRequest),
    Replace(SaveRequest),
    PacenoteLabels { data: String },
    GetCodrivers,
}

impl ClientRequest {
    /// Short name used in logs and request metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::Register { .. } => "register",
            ClientRequest::ShowDragArea => "show-drag-area",
            ClientRequest::GetStageTimes(_) => "getStageTimes",
            ClientRequest::Save(_) => "save",
            ClientRequest::Replace(_) => "replace",
            ClientRequest::PacenoteLabels { .. } => "pacenoteLabels",
            ClientRequest::GetCodrivers => "getCodrivers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimesQuery {
    #[serde(deserialize_with = "lenient_u32")]
    pub stage_id: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub slot_id: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub pacenotes: Vec<PacenoteEntry>,
    pub stage_info: StageInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageInfo {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// One call of an annotation file, written as section `P<index>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PacenoteEntry {
    #[serde(rename = "type")]
    pub kind: IniScalar,
    pub distance: IniScalar,
    #[serde(default)]
    pub flag: IniScalar,
    /// Other client-side attributes; only scalars are written
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IniScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Default for IniScalar {
    fn default() -> Self {
        IniScalar::Int(0)
    }
}

impl IniScalar {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(IniScalar::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(IniScalar::Int)
                .or_else(|| n.as_f64().map(IniScalar::Float)),
            Value::String(s) => Some(IniScalar::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_ini_value(&self) -> String {
        match self {
            IniScalar::Bool(b) => b.to_string(),
            IniScalar::Int(i) => i.to_string(),
            IniScalar::Float(f) => f.to_string(),
            IniScalar::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command")]
enum CommandFrame {
    #[serde(rename = "show-drag-area")]
    ShowDragArea,
    #[serde(rename = "getCodrivers")]
    GetCodrivers,
}

const COMMANDS: &[&str] = &["show-drag-area", "getCodrivers"];

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TypedFrame {
    #[serde(rename = "getStageTimes")]
    GetStageTimes(StageTimesQuery),
    #[serde(rename = "save")]
    Save(SaveRequest),
    #[serde(rename = "replace")]
    Replace(SaveRequest),
    #[serde(rename = "pacenoteLabels")]
    PacenoteLabels { data: String },
}

const TYPES: &[&str] = &["getStageTimes", "save", "replace", "pacenoteLabels"];

/// Decodes one text frame. Frames are tagged by `command`, by `type`, or
/// carry a bare `deviceId` for registration, checked in that order.
pub fn decode_request(text: &str) -> Result<ClientRequest> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let object = match value.as_object() {
        Some(object) => object,
        None => return Err(ProtocolError::UnknownMessage(summarize(text)).into()),
    };

    if let Some(command) = object.get("command") {
        if !is_known_tag(command, COMMANDS) {
            return Err(ProtocolError::UnknownMessage(summarize(text)).into());
        }
        let frame: CommandFrame = serde_json::from_value(value).map_err(ProtocolError::Malformed)?;
        return Ok(match frame {
            CommandFrame::ShowDragArea => ClientRequest::ShowDragArea,
            CommandFrame::GetCodrivers => ClientRequest::GetCodrivers,
        });
    }

    if let Some(kind) = object.get("type") {
        if !is_known_tag(kind, TYPES) {
            return Err(ProtocolError::UnknownMessage(summarize(text)).into());
        }
        let kind = kind.as_str().unwrap_or_default().to_string();
        let frame: TypedFrame =
            serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { kind, source })?;
        return Ok(match frame {
            TypedFrame::GetStageTimes(query) => ClientRequest::GetStageTimes(query),
            TypedFrame::Save(request) => ClientRequest::Save(request),
            TypedFrame::Replace(request) => ClientRequest::Replace(request),
            TypedFrame::PacenoteLabels { data } => ClientRequest::PacenoteLabels { data },
        });
    }

    match object.get("deviceId").and_then(device_id_of) {
        Some(device_id) => Ok(ClientRequest::Register { device_id }),
        None => Err(ProtocolError::UnknownMessage(summarize(text)).into()),
    }
}

fn is_known_tag(
    tag: &Value,
    known: &[&str],
) -> bool {
    tag.as_str().map(|t| known.contains(&t)).unwrap_or(false)
}

fn device_id_of(value: &Value) -> Option<DeviceId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(DeviceId::new(s.trim())),
        Value::Number(n) => Some(DeviceId::new(n.to_string())),
        _ => None,
    }
}

fn summarize(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

/// Accepts `7` as well as `"7"`.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&s), &"an unsigned integer")),
    }
}
