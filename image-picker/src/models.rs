use crate::decode::FitBounds;
use crate::error::PickerError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Callback sink receiving a freshly decoded image
pub type ImageCallback = Arc<dyn Fn(RgbaImage) + Send + Sync>;

/// Zero-argument failure handler
pub type ErrorCallback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one submission; doubles as the correlation owner the facility
/// addresses its callbacks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(owner: &str) -> Option<Self> {
        Uuid::parse_str(owner).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct TextureState {
    image: RgbaImage,
    loads: u32,
}

/// Shared, mutable pixel buffer a picker result can be loaded into.
///
/// Starts as a 1x1 placeholder and takes the dimensions of whatever is
/// loaded into it. Clones share the same buffer.
#[derive(Clone)]
pub struct TextureHandle {
    inner: Arc<Mutex<TextureState>>,
}

impl TextureHandle {
    pub fn placeholder() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TextureState {
                image: RgbaImage::new(1, 1),
                loads: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, TextureState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.state().image.dimensions()
    }

    /// Number of images loaded into this buffer so far
    pub fn loads(&self) -> u32 {
        self.state().loads
    }

    pub fn is_loaded(&self) -> bool {
        self.loads() > 0
    }

    /// Copy of the current pixels
    pub fn snapshot(&self) -> RgbaImage {
        self.state().image.clone()
    }

    /// Replaces the buffer contents, resizing it to the image dimensions
    pub(crate) fn load(&self, image: RgbaImage) {
        let mut state = self.state();
        state.image = image;
        state.loads += 1;
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("TextureHandle")
            .field("dimensions", &state.image.dimensions())
            .field("loads", &state.loads)
            .finish()
    }
}

/// Where a decoded image ends up
#[derive(Clone)]
pub enum ImageSink {
    Texture(TextureHandle),
    Callback(ImageCallback),
}

impl ImageSink {
    pub fn callback(f: impl Fn(RgbaImage) + Send + Sync + 'static) -> Self {
        ImageSink::Callback(Arc::new(f))
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, ImageSink::Callback(_))
    }
}

impl std::fmt::Debug for ImageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSink::Texture(t) => f.debug_tuple("Texture").field(t).finish(),
            ImageSink::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Pre-sized, 0-based destination buffers for indexed receives.
///
/// Every slot is allocated up front so concurrently resolving entries only
/// ever touch their own buffer.
#[derive(Debug, Clone, Default)]
pub struct BatchSinks {
    slots: Vec<TextureHandle>,
}

impl BatchSinks {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| TextureHandle::placeholder()).collect(),
        }
    }

    pub fn from_handles(slots: Vec<TextureHandle>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TextureHandle> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureHandle> {
        self.slots.iter()
    }
}

/// Output format the facility caches picked files in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ImageEncoding {
    Png,
    Jpeg(u8),
}

impl From<i32> for ImageEncoding {
    fn from(compression: i32) -> Self {
        if compression < 0 {
            ImageEncoding::Png
        } else {
            ImageEncoding::Jpeg(compression.min(100) as u8)
        }
    }
}

impl From<ImageEncoding> for i32 {
    fn from(encoding: ImageEncoding) -> Self {
        match encoding {
            ImageEncoding::Png => -1,
            ImageEncoding::Jpeg(quality) => quality.min(100) as i32,
        }
    }
}

/// Scalar settings of a request; this is all the facility ever sees of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerSettings {
    /// Base name for cached copies; batch receives append an increasing suffix
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(rename = "fileSubDir")]
    pub sub_directory: Option<String>,
    #[serde(rename = "maxWidth")]
    pub max_width: u32,
    #[serde(rename = "maxHeight")]
    pub max_height: u32,
    /// true: fit inside the bounds keeping aspect ratio, false: clamp each axis
    #[serde(rename = "bestFit")]
    pub best_fit: bool,
    /// Offer camera apps next to the gallery
    #[serde(rename = "showCamera")]
    pub allow_capture: bool,
    #[serde(rename = "selectMultiple")]
    pub select_multiple: bool,
    #[serde(rename = "useDefault")]
    pub use_default_picker: bool,
    #[serde(rename = "compression")]
    pub encoding: ImageEncoding,
}

impl Default for PickerSettings {
    fn default() -> Self {
        Self {
            file_name: None,
            sub_directory: None,
            max_width: 1024,
            max_height: 1024,
            best_fit: true,
            allow_capture: false,
            select_multiple: false,
            use_default_picker: false,
            encoding: ImageEncoding::Png,
        }
    }
}

impl PickerSettings {
    pub fn bounds(&self) -> FitBounds {
        FitBounds {
            max_width: self.max_width,
            max_height: self.max_height,
            best_fit: self.best_fit,
        }
    }
}

/// Which facility entry point a request is submitted through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerMode {
    /// `selectImage`: show the picker UI
    SelectNew,
    /// `receiveFile`: load one entry of the received queue
    ReceiveByIndex(usize),
    /// `receiveAllFiles`: load every queued entry
    ReceiveAll,
    /// `openFile`: cache and load an image from a known location
    OpenFile(PathBuf),
}

/// One picker operation plus the destination for its result
pub struct PickerRequest {
    pub sink: ImageSink,
    pub settings: PickerSettings,
    pub batch_sinks: Option<BatchSinks>,
    /// Purge the consumed entries from the received queue once a batch is done
    pub remove_after_batch: bool,
    pub on_error: Option<ErrorCallback>,
}

impl PickerRequest {
    pub fn new(sink: ImageSink) -> Self {
        Self {
            sink,
            settings: PickerSettings::default(),
            batch_sinks: None,
            remove_after_batch: false,
            on_error: None,
        }
    }

    pub fn into_texture(texture: TextureHandle) -> Self {
        Self::new(ImageSink::Texture(texture))
    }

    pub fn with_callback(f: impl Fn(RgbaImage) + Send + Sync + 'static) -> Self {
        Self::new(ImageSink::callback(f))
    }

    pub fn with_settings(mut self, settings: PickerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_batch_sinks(mut self, sinks: BatchSinks, remove_after_batch: bool) -> Self {
        self.batch_sinks = Some(sinks);
        self.remove_after_batch = remove_after_batch;
        self
    }

    pub fn on_error(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Pre-flight checks run before anything is sent to the facility
    pub fn validate(&self, mode: &PickerMode) -> Result<(), PickerError> {
        if self.settings.max_width == 0 || self.settings.max_height == 0 {
            return Err(PickerError::InvalidRequest(format!(
                "Bounds must be positive, got {}x{}",
                self.settings.max_width, self.settings.max_height
            )));
        }

        match (mode, &self.sink, &self.batch_sinks) {
            (PickerMode::ReceiveByIndex(index), ImageSink::Texture(_), Some(sinks))
                if *index >= sinks.len() =>
            {
                Err(PickerError::InvalidRequest(format!(
                    "Batch sinks hold {} slots, cannot receive index {}",
                    sinks.len(),
                    index
                )))
            }
            (PickerMode::ReceiveAll, ImageSink::Texture(_), None) => Err(
                PickerError::InvalidRequest(
                    "Receiving all files needs batch sinks or a callback sink".to_string(),
                ),
            ),
            _ => Ok(()),
        }
    }

    /// Sink for an indexed result: callback first, then the batch slot at
    /// `index`, then the direct texture.
    pub(crate) fn sink_for_index(&self, index: usize) -> Result<ImageSink, PickerError> {
        if self.sink.is_callback() {
            return Ok(self.sink.clone());
        }
        match &self.batch_sinks {
            Some(sinks) => sinks
                .get(index)
                .cloned()
                .map(ImageSink::Texture)
                .ok_or_else(|| {
                    PickerError::InvalidRequest(format!(
                        "Array not large enough to receive index {} ({} slots)",
                        index,
                        sinks.len()
                    ))
                }),
            None => Ok(self.sink.clone()),
        }
    }

    pub(crate) fn report_error(&self) {
        if let Some(on_error) = &self.on_error {
            on_error();
        }
    }
}
