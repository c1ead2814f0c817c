use serde::Serialize;

use crate::models::document::FilePayload;

/// Lifecycle of an uploaded document file.
///
/// The local file is shown as soon as it is encoded (`PendingLocal`). Once
/// the backend answers, the payload is either the file the backend returned
/// (`ConfirmedRemote`) or the original upload (`ConfirmedLocalFallback`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "file", rename_all = "snake_case")]
pub enum PayloadState {
    PendingLocal(FilePayload),
    ConfirmedRemote(FilePayload),
    ConfirmedLocalFallback(FilePayload),
}

impl PayloadState {
    pub fn pending(local: FilePayload) -> Self {
        PayloadState::PendingLocal(local)
    }

    /// Applies the backend's answer. Only a pending payload can be confirmed;
    /// confirming twice keeps the first outcome.
    pub fn confirm(self, returned: Option<FilePayload>) -> Self {
        match self {
            PayloadState::PendingLocal(local) => match returned {
                Some(remote) if !remote.base64.is_empty() => PayloadState::ConfirmedRemote(remote),
                _ => PayloadState::ConfirmedLocalFallback(local),
            },
            confirmed => confirmed,
        }
    }

    pub fn payload(&self) -> &FilePayload {
        match self {
            PayloadState::PendingLocal(p)
            | PayloadState::ConfirmedRemote(p)
            | PayloadState::ConfirmedLocalFallback(p) => p,
        }
    }

    pub fn display_uri(&self) -> String {
        self.payload().data_uri()
    }

    pub fn into_payload(self) -> FilePayload {
        match self {
            PayloadState::PendingLocal(p)
            | PayloadState::ConfirmedRemote(p)
            | PayloadState::ConfirmedLocalFallback(p) => p,
        }
    }
}
