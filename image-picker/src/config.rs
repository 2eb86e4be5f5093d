use crate::facility::DebugLevel;

const DEFAULT_PLUGIN_CLASS: &str = "com/ElicitIce/Plugin/ImagePicker";

/// How a receive-all submission knows that the facility has sent every entry.
///
/// The callback protocol has no end marker, so the expected number of
/// callbacks has to be fixed when the batch is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchCompletion {
    /// Read the received-queue length right before submitting
    #[default]
    QueueSnapshot,
    /// Caller knows how many callbacks will arrive
    Expected(usize),
}

/// Configuration for the image picker
#[derive(Debug, Clone)]
pub struct PickerConfig {
    /// Plugin class in slash format (e.g., "com/example/plugin/ImagePicker")
    pub plugin_class: String,
    /// Verbosity pushed to the facility when the picker is created
    pub debug_level: DebugLevel,
    pub batch_completion: BatchCompletion,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            plugin_class: DEFAULT_PLUGIN_CLASS.to_string(),
            debug_level: DebugLevel::Silent,
            batch_completion: BatchCompletion::QueueSnapshot,
        }
    }
}
