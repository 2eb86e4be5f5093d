//! The external picker facility: the native component that shows the
//! selection/camera UI and keeps the queue of files shared into the app.
//!
//! Entry points return as soon as the facility has accepted the request. The
//! actual result arrives later through [`crate::CallbackRegistry::dispatch`].

use crate::error::PickerError;
use std::path::PathBuf;

/// Verbosity of the facility's own logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    #[default]
    Silent,
    Errors,
    Warnings,
    Verbose,
}

impl DebugLevel {
    pub fn as_i32(self) -> i32 {
        match self {
            DebugLevel::Silent => 0,
            DebugLevel::Errors => 1,
            DebugLevel::Warnings => 2,
            DebugLevel::Verbose => 3,
        }
    }

    pub fn from_i32(level: i32) -> Self {
        match level {
            i32::MIN..=0 => DebugLevel::Silent,
            1 => DebugLevel::Errors,
            2 => DebugLevel::Warnings,
            _ => DebugLevel::Verbose,
        }
    }

    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Silent => log::LevelFilter::Off,
            DebugLevel::Errors => log::LevelFilter::Error,
            DebugLevel::Warnings => log::LevelFilter::Warn,
            DebugLevel::Verbose => log::LevelFilter::Debug,
        }
    }
}

/// Entry points of the native picker.
///
/// `settings` is the JSON projection of a request's scalar fields including
/// the correlation owner (`gameObject`) and callback method (`callback`).
pub trait PickerFacility: Send + Sync {
    fn select_image(&self, settings: &str) -> Result<(), PickerError>;
    fn receive_file(&self, settings: &str, index: usize) -> Result<(), PickerError>;
    fn receive_all_files(&self, settings: &str) -> Result<(), PickerError>;
    fn open_file(&self, settings: &str, path: &str) -> Result<(), PickerError>;

    fn received_count(&self) -> Result<usize, PickerError>;
    fn received_path(&self, index: usize) -> Result<Option<String>, PickerError>;
    fn remove_received_entry(&self, index: usize, count: usize) -> Result<(), PickerError>;

    fn debug_level(&self) -> Result<DebugLevel, PickerError>;
    fn set_debug_level(&self, level: DebugLevel) -> Result<(), PickerError>;

    /// Where images meant for the public gallery (and camera captures) go
    fn external_dir(&self) -> Result<PathBuf, PickerError>;
    /// Where cached copies of picked files are stored
    fn internal_dir(&self) -> Result<PathBuf, PickerError>;
}

/// Facility for platforms without a native picker.
///
/// Submissions fail straight away; the received queue is always empty.
#[derive(Debug, Clone)]
pub struct UnsupportedFacility {
    data_dir: PathBuf,
}

impl UnsupportedFacility {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn unsupported(what: &str) -> PickerError {
        PickerError::PlatformNotSupported(format!("{} not available on this platform", what))
    }
}

impl PickerFacility for UnsupportedFacility {
    fn select_image(&self, _settings: &str) -> Result<(), PickerError> {
        Err(Self::unsupported("Image picker"))
    }

    fn receive_file(&self, _settings: &str, _index: usize) -> Result<(), PickerError> {
        Err(Self::unsupported("Receiving shared files"))
    }

    fn receive_all_files(&self, _settings: &str) -> Result<(), PickerError> {
        Err(Self::unsupported("Receiving shared files"))
    }

    fn open_file(&self, _settings: &str, _path: &str) -> Result<(), PickerError> {
        Err(Self::unsupported("Opening files through the picker"))
    }

    fn received_count(&self) -> Result<usize, PickerError> {
        Ok(0)
    }

    fn received_path(&self, _index: usize) -> Result<Option<String>, PickerError> {
        Ok(None)
    }

    fn remove_received_entry(&self, _index: usize, _count: usize) -> Result<(), PickerError> {
        Ok(())
    }

    fn debug_level(&self) -> Result<DebugLevel, PickerError> {
        Ok(DebugLevel::Silent)
    }

    fn set_debug_level(&self, _level: DebugLevel) -> Result<(), PickerError> {
        Ok(())
    }

    fn external_dir(&self) -> Result<PathBuf, PickerError> {
        Ok(self.data_dir.clone())
    }

    fn internal_dir(&self) -> Result<PathBuf, PickerError> {
        Ok(self.data_dir.clone())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::registry::CallbackRegistry;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, OnceLock};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum FacilityCall {
        SelectImage(String),
        ReceiveFile(String, usize),
        ReceiveAllFiles(String),
        OpenFile(String, String),
        RemoveReceivedEntry(usize, usize),
    }

    /// Records every call and, when scripted, answers submissions by
    /// dispatching the next batch of payloads to the owner named in the
    /// settings blob.
    #[derive(Default)]
    pub(crate) struct ScriptedFacility {
        pub calls: Mutex<Vec<FacilityCall>>,
        pub queue: Mutex<Vec<String>>,
        replies: Mutex<VecDeque<Vec<Option<String>>>>,
        registry: OnceLock<Arc<CallbackRegistry>>,
        level: Mutex<DebugLevel>,
    }

    impl ScriptedFacility {
        pub fn with_queue(paths: &[&str]) -> Self {
            let facility = Self::default();
            *facility.queue.lock().unwrap() = paths.iter().map(|p| p.to_string()).collect();
            facility
        }

        pub fn attach(&self, registry: Arc<CallbackRegistry>) {
            let _ = self.registry.set(registry);
        }

        /// Payloads sent back for the next submission
        pub fn reply_with(&self, payloads: &[Option<&str>]) {
            self.replies
                .lock()
                .unwrap()
                .push_back(payloads.iter().map(|p| p.map(str::to_string)).collect());
        }

        pub fn calls(&self) -> Vec<FacilityCall> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(&self, settings: &str) {
            let Some(registry) = self.registry.get() else {
                return;
            };
            let Some(payloads) = self.replies.lock().unwrap().pop_front() else {
                return;
            };
            let blob: serde_json::Value = serde_json::from_str(settings).unwrap();
            let owner = blob["gameObject"].as_str().unwrap();
            let method = blob["callback"].as_str().unwrap();
            for payload in payloads {
                registry.dispatch(owner, method, payload).unwrap();
            }
        }
    }

    impl PickerFacility for ScriptedFacility {
        fn select_image(&self, settings: &str) -> Result<(), PickerError> {
            self.calls
                .lock()
                .unwrap()
                .push(FacilityCall::SelectImage(settings.to_string()));
            self.answer(settings);
            Ok(())
        }

        fn receive_file(&self, settings: &str, index: usize) -> Result<(), PickerError> {
            self.calls
                .lock()
                .unwrap()
                .push(FacilityCall::ReceiveFile(settings.to_string(), index));
            self.answer(settings);
            Ok(())
        }

        fn receive_all_files(&self, settings: &str) -> Result<(), PickerError> {
            self.calls
                .lock()
                .unwrap()
                .push(FacilityCall::ReceiveAllFiles(settings.to_string()));
            self.answer(settings);
            Ok(())
        }

        fn open_file(&self, settings: &str, path: &str) -> Result<(), PickerError> {
            self.calls.lock().unwrap().push(FacilityCall::OpenFile(
                settings.to_string(),
                path.to_string(),
            ));
            self.answer(settings);
            Ok(())
        }

        fn received_count(&self) -> Result<usize, PickerError> {
            Ok(self.queue.lock().unwrap().len())
        }

        fn received_path(&self, index: usize) -> Result<Option<String>, PickerError> {
            Ok(self.queue.lock().unwrap().get(index).cloned())
        }

        fn remove_received_entry(&self, index: usize, count: usize) -> Result<(), PickerError> {
            self.calls
                .lock()
                .unwrap()
                .push(FacilityCall::RemoveReceivedEntry(index, count));
            let mut queue = self.queue.lock().unwrap();
            if index < queue.len() {
                let end = (index + count).min(queue.len());
                queue.drain(index..end);
            }
            Ok(())
        }

        fn debug_level(&self) -> Result<DebugLevel, PickerError> {
            Ok(*self.level.lock().unwrap())
        }

        fn set_debug_level(&self, level: DebugLevel) -> Result<(), PickerError> {
            *self.level.lock().unwrap() = level;
            Ok(())
        }

        fn external_dir(&self) -> Result<PathBuf, PickerError> {
            Ok(PathBuf::from("/sdcard/Pictures"))
        }

        fn internal_dir(&self) -> Result<PathBuf, PickerError> {
            Ok(PathBuf::from("/data/user/0/app/files"))
        }
    }
}
