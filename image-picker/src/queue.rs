use crate::error::PickerError;
use crate::facility::PickerFacility;
use std::path::PathBuf;
use std::sync::Arc;

/// Live view of the files other apps have shared into this one.
///
/// Every call goes straight to the facility. New entries are appended at the
/// end; removing entries shifts the indices of everything behind them, so
/// callers running several receives at once must serialize their removals.
#[derive(Clone)]
pub struct ReceivedQueue {
    facility: Arc<dyn PickerFacility>,
}

impl ReceivedQueue {
    pub fn new(facility: Arc<dyn PickerFacility>) -> Self {
        Self { facility }
    }

    /// Number of entries waiting to be processed
    pub fn count(&self) -> Result<usize, PickerError> {
        self.facility.received_count()
    }

    /// Raw path of the entry at `index`, unprocessed and not downscaled
    pub fn peek(&self, index: usize) -> Result<Option<PathBuf>, PickerError> {
        Ok(self
            .facility
            .received_path(index)?
            .filter(|path| !path.is_empty())
            .map(PathBuf::from))
    }

    pub fn remove(&self, index: usize) -> Result<(), PickerError> {
        self.remove_range(index, 1)
    }

    /// The facility validates the range itself
    pub fn remove_range(&self, index: usize, count: usize) -> Result<(), PickerError> {
        log::debug!("Removing {} received entries at {}", count, index);
        self.facility.remove_received_entry(index, count)
    }
}
