use crate::filesystem;
use crate::image_processing::image_path_to_data_url;
use crate::services;
use crate::Screen;
use dioxus::prelude::*;
use std::path::PathBuf;

#[component]
pub fn ViewerScreen(path: PathBuf, on_navigate: EventHandler<Screen>) -> Element {
    let mut error = use_signal(String::new);
    let dimensions = image::image_dimensions(&path).ok();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let target = path.clone();

    rsx! {
        div { style: "display: flex; flex-direction: column; min-height: 100vh; background: #111; color: white;",
            div { style: "display: flex; justify-content: space-between; align-items: center; padding: 12px 16px;",
                button {
                    style: "padding: 8px 14px; background: rgba(255,255,255,0.15); color: white; border-radius: 8px;",
                    onclick: move |_| on_navigate.call(Screen::Gallery),
                    "← Back"
                }
                button {
                    style: "padding: 8px 14px; background: #d32f2f; color: white; border-radius: 8px;",
                    onclick: move |_| match filesystem::delete_image(&services::gallery_dir(), &target) {
                        Ok(()) => on_navigate.call(Screen::Gallery),
                        Err(e) => error.set(format!("Deleting failed: {}", e)),
                    },
                    "🗑️ Delete"
                }
            }

            div { style: "flex: 1; display: flex; align-items: center; justify-content: center;",
                match image_path_to_data_url(&path) {
                    Ok(data_url) => rsx! {
                        img { src: data_url, alt: name.clone(), style: "max-width: 100%; max-height: 80vh; object-fit: contain;" }
                    },
                    Err(e) => rsx! {
                        p { style: "color: #f88;", "{e.user_message()}" }
                    },
                }
            }

            div { style: "padding: 12px 16px; font-size: 12px; color: #aaa;",
                p { style: "margin: 2px 0; word-break: break-all;", "{name}" }
                if let Some((w, h)) = dimensions {
                    p { style: "margin: 2px 0;", "{w} × {h}" }
                }
                if !error().is_empty() {
                    p { style: "margin: 2px 0; color: #f88;", "{error()}" }
                }
            }
        }
    }
}
