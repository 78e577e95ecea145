use serde::Serialize;

use crate::CodriverCatalog;
use crate::IniDocument;
use crate::ProtocolError;
use crate::Result;
use crate::StageRecord;
use crate::StageTimeRow;

/// Frames sent to clients, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "file-content")]
    FileContent {
        path: String,
        data: IniDocument,
        /// RFC 3339 modification time
        date: String,
        #[serde(rename = "stageInfo")]
        stage_info: StageRecord,
    },
    /// Raw text of a file dropped on the host
    #[serde(rename = "file-content")]
    DroppedFile { content: String },
    #[serde(rename = "stageTimes")]
    StageTimes { data: Vec<StageTimeRow> },
    #[serde(rename = "save")]
    Save(Ack),
    #[serde(rename = "replace")]
    Replace(Ack),
    #[serde(rename = "pacenoteLabels")]
    PacenoteLabels(Ack),
    #[serde(rename = "codrivers")]
    Codrivers { data: CodriverCatalog },
    #[serde(rename = "codrivers")]
    CodriversFailed { error: String },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self).map_err(ProtocolError::Encode)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn success() -> Self {
        Self {
            status: AckStatus::Success,
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            status: AckStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(e) => Self::failure(e),
        }
    }
}
