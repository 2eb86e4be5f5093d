use crate::config::{BatchCompletion, PickerConfig};
use crate::error::PickerError;
use crate::facility::{DebugLevel, PickerFacility};
use crate::models::{
    BatchSinks, ImageCallback, ImageSink, PickerMode, PickerRequest, PickerSettings, RequestId,
};
use crate::queue::ReceivedQueue;
use crate::registry::{CallbackKind, CallbackRegistry};
use crate::session::{PickerOutcome, PickerSession};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the facility receives for a submission
#[derive(Serialize)]
struct SettingsBlob<'a> {
    #[serde(flatten)]
    settings: &'a PickerSettings,
    #[serde(rename = "gameObject")]
    owner: String,
    callback: &'static str,
}

/// Issues picker requests and owns the callback registry they are routed by
pub struct ImagePicker {
    facility: Arc<dyn PickerFacility>,
    registry: Arc<CallbackRegistry>,
    config: PickerConfig,
}

impl ImagePicker {
    pub fn new(facility: Arc<dyn PickerFacility>, config: PickerConfig) -> Self {
        if let Err(e) = facility.set_debug_level(config.debug_level) {
            log::warn!("Could not set picker debug level: {}", e);
        }
        Self {
            facility,
            registry: Arc::new(CallbackRegistry::new()),
            config,
        }
    }

    /// Picker backed by the native plugin on Android; elsewhere every
    /// submission fails with `PlatformNotSupported`.
    pub fn for_platform(config: PickerConfig, data_dir: PathBuf) -> Self {
        #[cfg(target_os = "android")]
        {
            let _ = data_dir;
            let facility = Arc::new(crate::android::AndroidFacility::new(&config));
            let picker = Self::new(facility, config);
            crate::android::install_dispatcher(picker.dispatcher());
            picker
        }

        #[cfg(not(target_os = "android"))]
        {
            let facility = crate::facility::UnsupportedFacility::new(data_dir);
            Self::new(Arc::new(facility), config)
        }
    }

    /// Registry the callback transport dispatches replies into
    pub fn dispatcher(&self) -> Arc<CallbackRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn received(&self) -> ReceivedQueue {
        ReceivedQueue::new(self.facility.clone())
    }

    pub fn debug_level(&self) -> Result<DebugLevel, PickerError> {
        self.facility.debug_level()
    }

    pub fn set_debug_level(&self, level: DebugLevel) -> Result<(), PickerError> {
        self.facility.set_debug_level(level)
    }

    pub fn external_dir(&self) -> Result<PathBuf, PickerError> {
        self.facility.external_dir()
    }

    pub fn internal_dir(&self) -> Result<PathBuf, PickerError> {
        self.facility.internal_dir()
    }

    /// Validates and submits `request`; the returned session resolves the
    /// callbacks.
    pub fn start(
        &self,
        request: PickerRequest,
        mode: PickerMode,
    ) -> Result<PickerSession, PickerError> {
        if let Err(e) = request.validate(&mode) {
            log::error!("Picker request rejected: {}", e);
            return Err(e);
        }

        let id = RequestId::new();
        let kind = match mode {
            PickerMode::SelectNew | PickerMode::OpenFile(_) => CallbackKind::Single,
            PickerMode::ReceiveByIndex(_) | PickerMode::ReceiveAll => CallbackKind::Indexed,
        };
        let expected = match (&mode, self.config.batch_completion) {
            (PickerMode::ReceiveAll, BatchCompletion::QueueSnapshot) => {
                self.facility.received_count()?
            }
            (PickerMode::ReceiveAll, BatchCompletion::Expected(count)) => count,
            _ => 1,
        };

        let settings = serde_json::to_string(&SettingsBlob {
            settings: &request.settings,
            owner: id.to_string(),
            callback: kind.method_name(),
        })?;

        let receiver = self.registry.register(id, kind);
        let session = PickerSession::new(
            id,
            mode.clone(),
            kind,
            request,
            expected,
            receiver,
            self.facility.clone(),
            self.registry.clone(),
        );

        let submitted = match &mode {
            PickerMode::SelectNew => self.facility.select_image(&settings),
            PickerMode::ReceiveByIndex(index) => self.facility.receive_file(&settings, *index),
            PickerMode::ReceiveAll => self.facility.receive_all_files(&settings),
            PickerMode::OpenFile(path) => self
                .facility
                .open_file(&settings, &path.to_string_lossy()),
        };
        if let Err(e) = submitted {
            log::error!("Picker submission {:?} failed: {}", mode, e);
            return Err(e);
        }

        Ok(session)
    }

    /// Submits `request` and waits for its result
    pub async fn run(
        &self,
        request: PickerRequest,
        mode: PickerMode,
    ) -> Result<PickerOutcome, PickerError> {
        self.start(request, mode)?.complete().await
    }

    /// Shows the picker UI and loads the selection into `sink`
    pub async fn pick_image(
        &self,
        sink: ImageSink,
        settings: PickerSettings,
    ) -> Result<PickerOutcome, PickerError> {
        let request = PickerRequest::new(sink).with_settings(settings);
        self.run(request, PickerMode::SelectNew).await
    }

    /// Loads the first received file into `sink`
    pub async fn receive_first(
        &self,
        sink: ImageSink,
        settings: PickerSettings,
    ) -> Result<PickerOutcome, PickerError> {
        let request = PickerRequest::new(sink).with_settings(settings);
        self.run(request, PickerMode::ReceiveByIndex(0)).await
    }

    /// Loads every received file into `sinks`, slot by queue index
    pub async fn receive_all_into(
        &self,
        sinks: BatchSinks,
        settings: PickerSettings,
        remove_processed: bool,
    ) -> Result<PickerOutcome, PickerError> {
        let fallback = sinks.get(0).cloned().unwrap_or_default();
        let request = PickerRequest::into_texture(fallback)
            .with_settings(settings)
            .with_batch_sinks(sinks, remove_processed);
        self.run(request, PickerMode::ReceiveAll).await
    }

    /// Hands every received file to `callback`
    pub async fn receive_all_with(
        &self,
        callback: ImageCallback,
        settings: PickerSettings,
        remove_processed: bool,
    ) -> Result<PickerOutcome, PickerError> {
        let mut request = PickerRequest::new(ImageSink::Callback(callback)).with_settings(settings);
        request.remove_after_batch = remove_processed;
        self.run(request, PickerMode::ReceiveAll).await
    }

    /// Has the facility cache a file from a known location, then loads it
    pub async fn process_image(
        &self,
        request: PickerRequest,
        path: &Path,
    ) -> Result<PickerOutcome, PickerError> {
        self.run(request, PickerMode::OpenFile(path.to_path_buf()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::write_png;
    use crate::facility::testing::{FacilityCall, ScriptedFacility};
    use crate::models::TextureHandle;
    use crate::registry::{INDEXED_RESULT_METHOD, SINGLE_RESULT_METHOD};
    use crate::session::SessionState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn scripted(queue: &[&str]) -> (Arc<ScriptedFacility>, ImagePicker) {
        let facility = Arc::new(ScriptedFacility::with_queue(queue));
        let picker = ImagePicker::new(facility.clone(), PickerConfig::default());
        facility.attach(picker.dispatcher());
        (facility, picker)
    }

    fn counting_error(request: PickerRequest) -> (PickerRequest, Arc<AtomicUsize>) {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        let request = request.on_error(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (request, errors)
    }

    #[tokio::test]
    async fn test_select_new_loads_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "pick.png", 30, 20);
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some(path.to_str().unwrap())]);

        let texture = TextureHandle::placeholder();
        let outcome = picker
            .pick_image(ImageSink::Texture(texture.clone()), PickerSettings::default())
            .await
            .unwrap();

        assert_eq!(outcome.delivered_count(), 1);
        assert_eq!(texture.dimensions(), (30, 20));
        assert_eq!(picker.dispatcher().pending_count(), 0);

        let calls = facility.calls();
        let FacilityCall::SelectImage(blob) = &calls[0] else {
            panic!("expected selectImage, got {:?}", calls);
        };
        let blob: serde_json::Value = serde_json::from_str(blob).unwrap();
        assert_eq!(blob["callback"], SINGLE_RESULT_METHOD);
        assert_eq!(blob["maxWidth"], 1024);
        assert!(blob.get("sink").is_none());
    }

    #[tokio::test]
    async fn test_select_new_empty_result_reports_error_once() {
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some("")]);

        let texture = TextureHandle::placeholder();
        let (request, errors) = counting_error(PickerRequest::into_texture(texture.clone()));
        let session = picker.start(request, PickerMode::SelectNew).unwrap();
        let mut states = session.subscribe_state();
        assert_eq!(*states.borrow_and_update(), SessionState::AwaitingCallback);

        let result = session.complete().await;
        assert!(matches!(result, Err(PickerError::Cancelled(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(!texture.is_loaded());
        assert_eq!(*states.borrow_and_update(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_successful_pick_ends_idle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "ok.png", 8, 8);
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some(path.to_str().unwrap())]);

        let session = picker
            .start(
                PickerRequest::into_texture(TextureHandle::placeholder()),
                PickerMode::SelectNew,
            )
            .unwrap();
        let states = session.subscribe_state();

        session.complete().await.unwrap();
        assert_eq!(*states.borrow(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_receive_by_index_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "photo.png", 1000, 500);
        let (facility, picker) = scripted(&[]);
        let reply = format!("2|{}", path.display());
        facility.reply_with(&[Some(&reply)]);

        let texture = TextureHandle::placeholder();
        let request = PickerRequest::into_texture(texture.clone()).with_settings(PickerSettings {
            max_width: 800,
            max_height: 600,
            best_fit: true,
            ..Default::default()
        });
        let outcome = picker
            .run(request, PickerMode::ReceiveByIndex(2))
            .await
            .unwrap();

        let (w, h) = texture.dimensions();
        assert!(w <= 800 && h <= 600);
        assert_eq!((w, h), (800, 400));
        assert_eq!(outcome.delivered[0].index, Some(2));
        assert!(matches!(facility.calls()[0], FacilityCall::ReceiveFile(_, 2)));
    }

    #[tokio::test]
    async fn test_receive_by_index_into_batch_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "b.png", 8, 8);
        let (facility, picker) = scripted(&[]);
        let reply = format!("1|{}", path.display());
        facility.reply_with(&[Some(&reply)]);

        let sinks = BatchSinks::with_len(2);
        let request = PickerRequest::into_texture(TextureHandle::placeholder())
            .with_batch_sinks(sinks.clone(), false);
        picker
            .run(request, PickerMode::ReceiveByIndex(1))
            .await
            .unwrap();

        assert!(!sinks.get(0).unwrap().is_loaded());
        assert_eq!(sinks.get(1).unwrap().dimensions(), (8, 8));
    }

    #[tokio::test]
    async fn test_malformed_indexed_callback() {
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some("/sdcard/no-index.png")]);

        let (request, errors) =
            counting_error(PickerRequest::into_texture(TextureHandle::placeholder()));
        let result = picker.run(request, PickerMode::ReceiveByIndex(0)).await;

        assert!(matches!(result, Err(PickerError::Malformed(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_callback_method_is_malformed() {
        let (_facility, picker) = scripted(&[]);
        let (request, errors) =
            counting_error(PickerRequest::into_texture(TextureHandle::placeholder()));
        let session = picker.start(request, PickerMode::SelectNew).unwrap();

        picker
            .dispatcher()
            .dispatch(
                &session.id().to_string(),
                INDEXED_RESULT_METHOD,
                Some("0|/a.png".to_string()),
            )
            .unwrap();

        assert!(matches!(
            session.complete().await,
            Err(PickerError::Malformed(_))
        ));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_skips_error_callback() {
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some("/definitely/missing.png")]);

        let (request, errors) =
            counting_error(PickerRequest::into_texture(TextureHandle::placeholder()));
        let result = picker.run(request, PickerMode::SelectNew).await;

        assert!(matches!(result, Err(PickerError::Decode(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_bounds_never_submitted() {
        let (facility, picker) = scripted(&[]);
        let request =
            PickerRequest::into_texture(TextureHandle::placeholder()).with_settings(PickerSettings {
                max_height: 0,
                ..Default::default()
            });

        assert!(matches!(
            picker.start(request, PickerMode::SelectNew),
            Err(PickerError::InvalidRequest(_))
        ));
        assert!(facility.calls().is_empty());
        assert_eq!(picker.dispatcher().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_receive_all_mixed_results() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 10, 10);
        let c = write_png(dir.path(), "c.png", 12, 6);
        let (facility, picker) = scripted(&["x", "y", "z"]);
        let first = format!("1|{}", a.display());
        let last = format!("2|{}", c.display());
        facility.reply_with(&[Some(&first), Some("0|"), Some(&last)]);

        let sinks = BatchSinks::with_len(3);
        let (request, errors) = counting_error(
            PickerRequest::into_texture(TextureHandle::placeholder())
                .with_batch_sinks(sinks.clone(), false),
        );
        let outcome = picker.run(request, PickerMode::ReceiveAll).await.unwrap();

        assert!(!sinks.get(0).unwrap().is_loaded());
        assert_eq!(sinks.get(1).unwrap().dimensions(), (10, 10));
        assert_eq!(sinks.get(2).unwrap().dimensions(), (12, 6));
        assert_eq!(outcome.delivered_count(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, Some(0));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(!facility
            .calls()
            .iter()
            .any(|c| matches!(c, FacilityCall::RemoveReceivedEntry(..))));
    }

    #[tokio::test]
    async fn test_receive_all_fills_every_slot_once_in_any_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| write_png(dir.path(), &format!("{}.png", i), 4 + i, 4))
            .collect();
        let (facility, picker) = scripted(&["0", "1", "2", "3"]);
        let replies: Vec<String> = [2usize, 0, 3, 1]
            .iter()
            .map(|&i| format!("{}|{}", i, paths[i].display()))
            .collect();
        let reply_refs: Vec<Option<&str>> = replies.iter().map(|r| Some(r.as_str())).collect();
        facility.reply_with(&reply_refs);

        let sinks = BatchSinks::with_len(4);
        let outcome = picker
            .receive_all_into(sinks.clone(), PickerSettings::default(), true)
            .await
            .unwrap();

        for (i, sink) in sinks.iter().enumerate() {
            assert_eq!(sink.loads(), 1);
            assert_eq!(sink.dimensions(), (4 + i as u32, 4));
        }
        let indices: Vec<_> = outcome.delivered.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);

        let removals: Vec<_> = facility
            .calls()
            .into_iter()
            .filter(|c| matches!(c, FacilityCall::RemoveReceivedEntry(..)))
            .collect();
        assert_eq!(removals, vec![FacilityCall::RemoveReceivedEntry(0, 4)]);
        assert_eq!(picker.received().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_receive_all_index_beyond_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 9, 3);
        let b = write_png(dir.path(), "b.png", 7, 7);
        let (facility, picker) = scripted(&["a", "b"]);
        let first = format!("0|{}", a.display());
        let stray = format!("5|{}", b.display());
        facility.reply_with(&[Some(&first), Some(&stray)]);

        let sinks = BatchSinks::with_len(2);
        let (request, errors) = counting_error(
            PickerRequest::into_texture(TextureHandle::placeholder())
                .with_batch_sinks(sinks.clone(), true),
        );
        let outcome = picker.run(request, PickerMode::ReceiveAll).await.unwrap();

        assert_eq!(outcome.delivered_count(), 1);
        assert_eq!(outcome.delivered[0].index, Some(0));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, Some(5));
        assert!(outcome.failures[0].reason.contains("index 5"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        assert_eq!(sinks.get(0).unwrap().dimensions(), (9, 3));
        assert!(!sinks.get(1).unwrap().is_loaded());
        assert!(facility
            .calls()
            .contains(&FacilityCall::RemoveReceivedEntry(0, 2)));
    }

    #[tokio::test]
    async fn test_receive_all_with_callback() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 5, 5);
        let (facility, picker) = scripted(&["a", "b"]);
        let good = format!("0|{}", a.display());
        facility.reply_with(&[Some("garbage"), Some(&good)]);

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let callback: ImageCallback = Arc::new(move |img| sink.lock().unwrap().push(img));
        let outcome = picker
            .receive_all_with(callback, PickerSettings::default(), false)
            .await
            .unwrap();

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, None);
    }

    #[tokio::test]
    async fn test_empty_queue_completes_immediately() {
        let (facility, picker) = scripted(&[]);
        let outcome = picker
            .receive_all_into(BatchSinks::with_len(1), PickerSettings::default(), true)
            .await
            .unwrap();

        assert_eq!(outcome, PickerOutcome::default());
        assert_eq!(facility.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_keep_their_own_context() {
        let dir = tempfile::tempdir().unwrap();
        let small = write_png(dir.path(), "small.png", 3, 3);
        let large = write_png(dir.path(), "large.png", 9, 9);
        let (_facility, picker) = scripted(&[]);

        let first = TextureHandle::placeholder();
        let second = TextureHandle::placeholder();
        let session_a = picker
            .start(PickerRequest::into_texture(first.clone()), PickerMode::SelectNew)
            .unwrap();
        let session_b = picker
            .start(PickerRequest::into_texture(second.clone()), PickerMode::SelectNew)
            .unwrap();
        assert_eq!(picker.dispatcher().pending_count(), 2);

        // answers arrive in reverse submission order
        let registry = picker.dispatcher();
        registry
            .dispatch(
                &session_b.id().to_string(),
                SINGLE_RESULT_METHOD,
                Some(large.display().to_string()),
            )
            .unwrap();
        registry
            .dispatch(
                &session_a.id().to_string(),
                SINGLE_RESULT_METHOD,
                Some(small.display().to_string()),
            )
            .unwrap();

        let (a, b) = tokio::join!(session_a.complete(), session_b.complete());
        a.unwrap();
        b.unwrap();
        assert_eq!(first.dimensions(), (3, 3));
        assert_eq!(second.dimensions(), (9, 9));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_open_file_passes_path() {
        let dir = tempfile::tempdir().unwrap();
        let cached = write_png(dir.path(), "cached.png", 6, 6);
        let (facility, picker) = scripted(&[]);
        facility.reply_with(&[Some(cached.to_str().unwrap())]);

        let texture = TextureHandle::placeholder();
        picker
            .process_image(
                PickerRequest::into_texture(texture.clone()),
                Path::new("/sdcard/DCIM/original.jpg"),
            )
            .await
            .unwrap();

        assert_eq!(texture.dimensions(), (6, 6));
        assert!(matches!(
            &facility.calls()[0],
            FacilityCall::OpenFile(_, path) if path == "/sdcard/DCIM/original.jpg"
        ));
    }

    #[test]
    fn test_debug_level_pushed_on_creation() {
        let facility = Arc::new(ScriptedFacility::default());
        let picker = ImagePicker::new(
            facility.clone(),
            PickerConfig {
                debug_level: DebugLevel::Warnings,
                ..Default::default()
            },
        );
        assert_eq!(picker.debug_level().unwrap(), DebugLevel::Warnings);
        assert_eq!(
            picker.internal_dir().unwrap(),
            PathBuf::from("/data/user/0/app/files")
        );
    }
}
