//! Routing of facility callbacks back to the submission that caused them.
//!
//! The facility addresses a reply by owner name and method name. Each
//! submission registers its [`RequestId`] as owner, so replies are looked up
//! by id and several submissions can be outstanding at once without sharing
//! any processing context.

use crate::models::RequestId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Callback method of single-result entry points (`selectImage`, `openFile`)
pub const SINGLE_RESULT_METHOD: &str = "ImagePickerCallback";
/// Callback method of indexed entry points (`receiveFile`, `receiveAllFiles`)
pub const INDEXED_RESULT_METHOD: &str = "ImagePickerReceive";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Single,
    Indexed,
}

impl CallbackKind {
    pub fn method_name(self) -> &'static str {
        match self {
            CallbackKind::Single => SINGLE_RESULT_METHOD,
            CallbackKind::Indexed => INDEXED_RESULT_METHOD,
        }
    }
}

/// One raw reply as delivered by the facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackMessage {
    pub method: String,
    pub payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Owner is not a request id
    InvalidOwner(String),
    /// No submission with this id is waiting (never existed or already retired)
    UnknownOwner(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::InvalidOwner(owner) => write!(f, "Invalid callback owner: {}", owner),
            DispatchError::UnknownOwner(owner) => {
                write!(f, "No pending request for owner {}", owner)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

struct Pending {
    kind: CallbackKind,
    sender: mpsc::UnboundedSender<CallbackMessage>,
}

/// Pending submissions keyed by request id
#[derive(Default)]
pub struct CallbackRegistry {
    pending: Mutex<HashMap<RequestId, Pending>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Inserts and removals are single calls, so a poisoned map is still consistent
    fn entries(&self) -> MutexGuard<'_, HashMap<RequestId, Pending>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn register(
        &self,
        id: RequestId,
        kind: CallbackKind,
    ) -> mpsc::UnboundedReceiver<CallbackMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.entries().insert(id, Pending { kind, sender });
        log::debug!("Registered picker request {} ({:?})", id, kind);
        receiver
    }

    pub(crate) fn retire(&self, id: RequestId) {
        if self.entries().remove(&id).is_some() {
            log::debug!("Retired picker request {}", id);
        }
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.entries().contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.entries().len()
    }

    /// Entry point for the transport that receives facility replies.
    ///
    /// Safe to call from any thread. The method name is forwarded as-is; the
    /// waiting session decides whether it fits the submitted mode.
    pub fn dispatch(
        &self,
        owner: &str,
        method: &str,
        payload: Option<String>,
    ) -> Result<(), DispatchError> {
        let id = RequestId::parse(owner)
            .ok_or_else(|| DispatchError::InvalidOwner(owner.to_string()))?;

        let pending = self.entries();
        let entry = pending
            .get(&id)
            .ok_or_else(|| DispatchError::UnknownOwner(owner.to_string()))?;

        if method != entry.kind.method_name() {
            log::warn!(
                "Request {} expects {} but got {}",
                id,
                entry.kind.method_name(),
                method
            );
        }

        let message = CallbackMessage {
            method: method.to_string(),
            payload,
        };
        entry
            .sender
            .send(message)
            .map_err(|_| DispatchError::UnknownOwner(owner.to_string()))
    }
}
