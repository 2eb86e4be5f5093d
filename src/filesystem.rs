use image::RgbaImage;
use std::fs;
use std::io::Result;
use std::path::{Path, PathBuf};

const GALLERY_DIR: &str = "gallery";
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[cfg(target_os = "android")]
fn android_files_dir() -> Option<PathBuf> {
    use jni::{objects::{JObject, JString}, JavaVM};
    unsafe {
        let ctx = ndk_context::android_context();
        let vm = JavaVM::from_raw(ctx.vm().cast()).ok()?;
        let mut env = vm.attach_current_thread().ok()?; // mutable for JNI calls
        let activity = JObject::from_raw(ctx.context().cast());
        let files_dir = env
            .call_method(activity, "getFilesDir", "()Ljava/io/File;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path_obj = env
            .call_method(files_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .ok()?
            .l()
            .ok()?;
        let abs_path_jstring: JString = JString::from(abs_path_obj);
        let abs_path: String = env.get_string(&abs_path_jstring).ok()?.into();
        Some(PathBuf::from(abs_path))
    }
}

/// Get the app data directory for the current platform
pub fn get_app_data_dir() -> PathBuf {
    #[cfg(target_os = "android")]
    {
        if let Some(dir) = android_files_dir() { return dir; }
        PathBuf::from("./data")
    }

    #[cfg(not(target_os = "android"))]
    {
        // On desktop, use ./data directory
        PathBuf::from("./data")
    }
}

/// Directory holding the images shown in the gallery grid
pub fn gallery_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(GALLERY_DIR)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List gallery images, oldest file name first
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    images.sort();

    Ok(images)
}

/// Store a picked image in the gallery as PNG and return its path
pub fn save_image(dir: &Path, image: &RgbaImage) -> std::result::Result<PathBuf, image::ImageError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.png", uuid::Uuid::new_v4()));
    image.save_with_format(&path, image::ImageFormat::Png)?;
    log::debug!("Saved picked image to {:?}", path);
    Ok(path)
}

/// Delete an image, refusing anything outside the gallery directory
pub fn delete_image(dir: &Path, path: &Path) -> Result<()> {
    if path.parent() != Some(dir) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{:?} is not a gallery image", path),
        ));
    }
    fs::remove_file(path)?;
    log::info!("Deleted {:?}", path);
    Ok(())
}
