use crate::config::AppConfig;
use crate::error::AppError;
use crate::filesystem;
use image::RgbaImage;
use image_picker::{ImageCallback, ImagePicker, ImageSink, PickerSettings, TextureHandle};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

// Global picker and config
static PICKER: OnceLock<ImagePicker> = OnceLock::new();
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

pub fn app_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| AppConfig::load(&filesystem::get_app_data_dir()))
}

/// Initialize the image picker for this platform
pub fn init_picker() -> &'static ImagePicker {
    PICKER.get_or_init(|| {
        ImagePicker::for_platform(
            app_config().picker_config(),
            filesystem::get_app_data_dir(),
        )
    })
}

pub fn gallery_dir() -> PathBuf {
    filesystem::gallery_dir(&filesystem::get_app_data_dir())
}

/// Shows the picker and stores the selection in `gallery`
pub async fn pick_into_gallery(
    picker: &ImagePicker,
    settings: PickerSettings,
    gallery: &Path,
) -> Result<PathBuf, AppError> {
    let texture = TextureHandle::placeholder();
    picker
        .pick_image(ImageSink::Texture(texture.clone()), settings)
        .await?;
    Ok(filesystem::save_image(gallery, &texture.snapshot())?)
}

/// Loads every file shared into the app and stores them in `gallery`.
///
/// Entries that fail are skipped; the picker already logged them.
pub async fn import_received_into_gallery(
    picker: &ImagePicker,
    settings: PickerSettings,
    remove_received: bool,
    gallery: &Path,
) -> Result<Vec<PathBuf>, AppError> {
    let collected: Arc<Mutex<Vec<RgbaImage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = collected.clone();
    let callback: ImageCallback = Arc::new(move |image| {
        if let Ok(mut images) = sink.lock() {
            images.push(image);
        }
    });

    let outcome = picker
        .receive_all_with(callback, settings, remove_received)
        .await?;
    if !outcome.failures.is_empty() {
        log::warn!("{} received files could not be imported", outcome.failures.len());
    }

    let images = match collected.lock() {
        Ok(mut images) => std::mem::take(&mut *images),
        Err(_) => return Err(AppError::Other("Import buffer poisoned".to_string())),
    };
    let mut saved = Vec::with_capacity(images.len());
    for image in &images {
        saved.push(filesystem::save_image(gallery, image)?);
    }
    Ok(saved)
}

pub async fn open_gallery(with_camera: bool) -> Result<PathBuf, AppError> {
    let mut settings = app_config().picker_settings();
    settings.allow_capture = with_camera;
    pick_into_gallery(init_picker(), settings, &gallery_dir()).await
}

pub async fn import_received() -> Result<Vec<PathBuf>, AppError> {
    let config = app_config();
    import_received_into_gallery(
        init_picker(),
        config.picker_settings(),
        config.remove_received,
        &gallery_dir(),
    )
    .await
}

pub fn received_count() -> usize {
    init_picker().received().count().unwrap_or_else(|e| {
        log::warn!("Could not read received count: {}", e);
        0
    })
}
