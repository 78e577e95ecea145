use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::decode_request;
use super::Ack;
use super::ClientRequest;
use super::SaveRequest;
use super::ServerMessage;
use crate::handlers::list_codrivers;
use crate::handlers::lookup_stage_times;
use crate::handlers::write_annotation;
use crate::handlers::write_label_overrides;
use crate::metrics::REQUESTS_METRIC;
use crate::ConnectionId;
use crate::Error;
use crate::FileAccessError;
use crate::HostPaths;
use crate::ProtocolError;
use crate::RaceStatsStore;
use crate::Result;
use crate::SessionRegistry;
use crate::StructuredTextCodec;
use crate::SyncEngine;

/// Decodes client frames and runs the matching handler.
pub struct ProtocolRouter {
    codec: Arc<dyn StructuredTextCodec>,
    suffix: String,
    paths: Option<HostPaths>,
    store: Option<Arc<dyn RaceStatsStore>>,
}

impl ProtocolRouter {
    pub fn new(
        codec: Arc<dyn StructuredTextCodec>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            suffix: suffix.into(),
            paths: None,
            store: None,
        }
    }

    /// Points the handlers at a (new) game folder.
    pub fn bind(
        &mut self,
        paths: HostPaths,
        store: Option<Arc<dyn RaceStatsStore>>,
    ) {
        self.paths = Some(paths);
        self.store = store;
    }

    pub fn paths(&self) -> Option<&HostPaths> {
        self.paths.as_ref()
    }

    /// Handles one inbound text frame of connection `id`. Unknown messages
    /// are ignored and leave the connection open. Invalid write requests are
    /// acknowledged with an error status.
    pub async fn dispatch(
        &self,
        id: ConnectionId,
        text: &str,
        engine: &mut SyncEngine,
        sessions: &mut SessionRegistry,
    ) -> Result<()> {
        let request = match decode_request(text) {
            Ok(request) => request,
            Err(Error::Protocol(ProtocolError::UnknownMessage(summary))) => {
                warn!("connection {} sent unknown message: {}", id, summary);
                REQUESTS_METRIC.with_label_values(&["unknown"]).inc();
                return Ok(());
            }
            Err(Error::Protocol(ProtocolError::InvalidPayload { kind, source })) => {
                warn!("connection {} sent invalid {} request: {}", id, kind, source);
                REQUESTS_METRIC.with_label_values(&["invalid"]).inc();
                let ack = Ack::failure(format!("invalid {kind} request: {source}"));
                return match kind.as_str() {
                    "save" => reply(sessions, id, ServerMessage::Save(ack)),
                    "replace" => reply(sessions, id, ServerMessage::Replace(ack)),
                    "pacenoteLabels" => reply(sessions, id, ServerMessage::PacenoteLabels(ack)),
                    _ => Ok(()),
                };
            }
            Err(e) => return Err(e),
        };
        REQUESTS_METRIC.with_label_values(&[request.kind()]).inc();
        debug!("connection {} -> {}", id, request.kind());
        self.handle(id, request, engine, sessions).await
    }

    pub async fn handle(
        &self,
        id: ConnectionId,
        request: ClientRequest,
        engine: &mut SyncEngine,
        sessions: &mut SessionRegistry,
    ) -> Result<()> {
        match request {
            ClientRequest::Register { device_id } => {
                sessions.identify(id, device_id.clone())?;
                engine.on_device_registered(&device_id, sessions);
                Ok(())
            }
            ClientRequest::ShowDragArea => {
                sessions.set_drag_target(id);
                Ok(())
            }
            ClientRequest::GetStageTimes(query) => {
                let data = match &self.paths {
                    Some(paths) => {
                        lookup_stage_times(query, &paths.car_roster, self.codec.as_ref(), self.store.as_deref())
                            .await
                    }
                    None => {
                        warn!("stage times requested before a folder was configured");
                        Vec::new()
                    }
                };
                reply(sessions, id, ServerMessage::StageTimes { data })
            }
            ClientRequest::Save(request) => {
                let ack = self.save(&request).await;
                reply(sessions, id, ServerMessage::Save(ack))
            }
            ClientRequest::Replace(request) => {
                let ack = self.save(&request).await;
                reply(sessions, id, ServerMessage::Replace(ack))
            }
            ClientRequest::PacenoteLabels { data } => {
                let result = match &self.paths {
                    Some(paths) => write_label_overrides(&paths.label_override_file, &data).await,
                    None => Err(FileAccessError::FolderNotConfigured.into()),
                };
                if let Err(e) = &result {
                    warn!("saving pacenote labels failed: {}", e);
                }
                reply(sessions, id, ServerMessage::PacenoteLabels(Ack::from_result(&result)))
            }
            ClientRequest::GetCodrivers => {
                let result = match &self.paths {
                    Some(paths) => list_codrivers(paths.codriver_packages_dir.clone(), self.codec.clone()).await,
                    None => Err(FileAccessError::FolderNotConfigured.into()),
                };
                let message = match result {
                    Ok(data) => ServerMessage::Codrivers { data },
                    Err(e) => {
                        warn!("co-driver listing failed: {}", e);
                        ServerMessage::CodriversFailed { error: e.to_string() }
                    }
                };
                reply(sessions, id, message)
            }
        }
    }

    /// `save` and `replace` both overwrite the target unconditionally.
    async fn save(
        &self,
        request: &SaveRequest,
    ) -> Ack {
        let result: Result<PathBuf> = match &self.paths {
            Some(paths) => {
                write_annotation(&paths.pacenote_root, request, &self.suffix, self.codec.as_ref()).await
            }
            None => Err(FileAccessError::FolderNotConfigured.into()),
        };
        if let Err(e) = &result {
            warn!("saving annotation {:?} failed: {}", request.stage_info.name, e);
        }
        Ack::from_result(&result)
    }
}

fn reply(
    sessions: &SessionRegistry,
    id: ConnectionId,
    message: ServerMessage,
) -> Result<()> {
    sessions.send_to_connection(id, message.encode()?)
}
