//! One outstanding picker submission and the resolution of its callbacks.

use crate::codec::{self, CodecError};
use crate::decode;
use crate::error::PickerError;
use crate::facility::PickerFacility;
use crate::models::{PickerMode, PickerRequest, RequestId};
use crate::registry::{CallbackKind, CallbackMessage, CallbackRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

/// Lifecycle of one session. `Idle` and `Failed` are terminal; the next
/// submission starts a fresh session in `AwaitingCallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingCallback,
    Resolving,
    Failed,
}

/// An image that reached its sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredImage {
    pub index: Option<usize>,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// An entry that did not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub index: Option<usize>,
    pub reason: String,
}

/// Result of a completed session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerOutcome {
    pub delivered: Vec<DeliveredImage>,
    pub failures: Vec<EntryFailure>,
}

impl PickerOutcome {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

/// A submitted request waiting for (and then resolving) its callbacks.
///
/// Dropping the session retires its id; later callbacks for it are rejected
/// by the registry.
pub struct PickerSession {
    id: RequestId,
    mode: PickerMode,
    kind: CallbackKind,
    request: PickerRequest,
    expected: usize,
    receiver: mpsc::UnboundedReceiver<CallbackMessage>,
    facility: Arc<dyn PickerFacility>,
    registry: Arc<CallbackRegistry>,
    state: watch::Sender<SessionState>,
}

impl PickerSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: RequestId,
        mode: PickerMode,
        kind: CallbackKind,
        request: PickerRequest,
        expected: usize,
        receiver: mpsc::UnboundedReceiver<CallbackMessage>,
        facility: Arc<dyn PickerFacility>,
        registry: Arc<CallbackRegistry>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::AwaitingCallback);
        Self {
            id,
            mode,
            kind,
            request,
            expected,
            receiver,
            facility,
            registry,
            state,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn mode(&self) -> &PickerMode {
        &self.mode
    }

    /// Number of callbacks this session waits for
    pub fn expected_callbacks(&self) -> usize {
        self.expected
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            log::debug!("Picker request {}: {:?} -> {:?}", self.id, previous, state);
        }
    }

    /// Waits for the facility's callbacks and delivers the results.
    ///
    /// There is no timeout: if the facility never answers, this never returns.
    pub async fn complete(mut self) -> Result<PickerOutcome, PickerError> {
        match self.mode {
            PickerMode::ReceiveAll => self.complete_batch().await,
            _ => self.complete_single().await,
        }
    }

    async fn next_message(&mut self) -> Result<CallbackMessage, PickerError> {
        match self.receiver.recv().await {
            Some(message) => Ok(message),
            None => {
                self.set_state(SessionState::Failed);
                Err(PickerError::Disconnected(format!(
                    "Callback channel of request {} closed",
                    self.id
                )))
            }
        }
    }

    fn parse(&self, message: &CallbackMessage) -> Result<(Option<usize>, PathBuf), CodecError> {
        if message.method != self.kind.method_name() {
            return Err(CodecError::Malformed(format!(
                "{} via {}",
                message.payload.as_deref().unwrap_or_default(),
                message.method
            )));
        }

        match self.kind {
            CallbackKind::Single => {
                codec::decode_single(message.payload.as_deref()).map(|path| (None, path))
            }
            CallbackKind::Indexed => {
                let entry = codec::decode_indexed(message.payload.as_deref())?;
                if let PickerMode::ReceiveByIndex(requested) = self.mode {
                    if requested != entry.index {
                        log::warn!(
                            "Requested entry {} but facility answered with {}",
                            requested,
                            entry.index
                        );
                    }
                }
                Ok((Some(entry.index), entry.path))
            }
        }
    }

    /// Logs a failed entry and notifies the request's error handler
    fn report(&self, error: &PickerError) {
        match error {
            PickerError::Cancelled(msg) => log::warn!("{}, please try again", msg),
            other => log::error!("Picker request {} failed: {}", self.id, other),
        }
        self.request.report_error();
    }

    fn fail(&self, error: PickerError) -> PickerError {
        self.report(&error);
        self.set_state(SessionState::Failed);
        error
    }

    async fn complete_single(&mut self) -> Result<PickerOutcome, PickerError> {
        let message = self.next_message().await?;
        self.set_state(SessionState::Resolving);

        let (index, path) = self
            .parse(&message)
            .map_err(|e| self.fail(PickerError::from(e)))?;
        let sink = match index {
            Some(index) => self
                .request
                .sink_for_index(index)
                .map_err(|e| self.fail(e))?,
            None => self.request.sink.clone(),
        };

        match decode::resolve_into(path.clone(), self.request.settings.bounds(), &sink).await {
            Ok((width, height)) => {
                self.set_state(SessionState::Idle);
                Ok(PickerOutcome {
                    delivered: vec![DeliveredImage {
                        index,
                        path,
                        width,
                        height,
                    }],
                    failures: Vec::new(),
                })
            }
            Err(e) => {
                // decode failures are logged by the pipeline and never reach on_error
                self.set_state(SessionState::Failed);
                Err(PickerError::Decode(e))
            }
        }
    }

    async fn complete_batch(&mut self) -> Result<PickerOutcome, PickerError> {
        let bounds = self.request.settings.bounds();
        let mut outcome = PickerOutcome::default();
        let mut tasks = JoinSet::new();

        log::debug!(
            "Picker request {} waits for {} entries",
            self.id,
            self.expected
        );

        let mut consumed = 0;
        while consumed < self.expected {
            self.set_state(SessionState::AwaitingCallback);
            let message = self.next_message().await?;
            consumed += 1;
            self.set_state(SessionState::Resolving);

            let entry = match self.parse(&message) {
                Ok((index, path)) => {
                    let index = index.unwrap_or_default();
                    self.request
                        .sink_for_index(index)
                        .map(|sink| (index, path, sink))
                        .map_err(|e| (Some(index), e))
                }
                Err(e) => {
                    let index = match e {
                        CodecError::EmptyPath { index } => index,
                        CodecError::Malformed(_) => None,
                    };
                    Err((index, PickerError::from(e)))
                }
            };

            match entry {
                Ok((index, path, sink)) => {
                    tasks.spawn(async move {
                        let result = decode::resolve_into(path.clone(), bounds, &sink).await;
                        (index, path, result)
                    });
                }
                Err((index, error)) => {
                    self.report(&error);
                    outcome.failures.push(EntryFailure {
                        index,
                        reason: error.to_string(),
                    });
                }
            }
        }

        self.set_state(SessionState::Resolving);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, path, Ok((width, height)))) => {
                    outcome.delivered.push(DeliveredImage {
                        index: Some(index),
                        path,
                        width,
                        height,
                    });
                }
                Ok((index, _, Err(e))) => outcome.failures.push(EntryFailure {
                    index: Some(index),
                    reason: e.to_string(),
                }),
                Err(e) => log::error!("Decode task failed: {}", e),
            }
        }

        if self.request.remove_after_batch && self.expected > 0 {
            if let Err(e) = self.facility.remove_received_entry(0, self.expected) {
                log::error!("Could not remove processed entries: {}", e);
            }
        }

        outcome.delivered.sort_by_key(|d| d.index);
        self.set_state(SessionState::Idle);
        log::info!(
            "Picker request {} done: {} delivered, {} failed",
            self.id,
            outcome.delivered.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        self.registry.retire(self.id);
    }
}
