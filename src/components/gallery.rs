use crate::filesystem;
use crate::image_processing::image_path_to_data_url;
use crate::services;
use crate::Screen;
use dioxus::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

fn load_images() -> Vec<PathBuf> {
    filesystem::list_images(&services::gallery_dir()).unwrap_or_else(|e| {
        log::error!("Listing gallery failed: {}", e);
        Vec::new()
    })
}

#[component]
pub fn GalleryScreen(on_navigate: EventHandler<Screen>) -> Element {
    let mut images = use_signal(load_images);
    let mut received = use_signal(services::received_count);
    let mut busy = use_signal(|| false);
    let mut error = use_signal(String::new);
    let mut selecting = use_signal(|| false);
    let mut selected = use_signal(HashSet::<PathBuf>::new);

    let mut pick = move |with_camera: bool| {
        busy.set(true);
        error.set(String::new());
        spawn(async move {
            match services::open_gallery(with_camera).await {
                Ok(path) => log::info!("Added {:?}", path),
                Err(e) => {
                    log::warn!("Picking failed: {}", e);
                    error.set(e.user_message());
                }
            }
            images.set(load_images());
            busy.set(false);
        });
    };

    let delete_selected = move |_| {
        let gallery = services::gallery_dir();
        for path in selected.read().iter() {
            if let Err(e) = filesystem::delete_image(&gallery, path) {
                error.set(format!("Deleting failed: {}", e));
            }
        }
        selected.write().clear();
        selecting.set(false);
        images.set(load_images());
    };

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",
            h1 { style: "color: #0066cc; text-align: center; margin: 32px 0 24px 0; font-size: 28px; font-weight: 700;",
                "Galagy"
            }

            div { class: "card", style: "display: flex; gap: 12px; margin-bottom: 16px;",
                button {
                    class: "btn-primary",
                    style: "flex: 1; padding: 14px; font-size: 16px;",
                    disabled: busy(),
                    onclick: move |_| pick(false),
                    if busy() { "⏳" } else { "🖼️ Gallery" }
                }
                button {
                    class: "btn-success",
                    style: "flex: 1; padding: 14px; font-size: 16px;",
                    disabled: busy(),
                    onclick: move |_| pick(true),
                    if busy() { "⏳" } else { "📷 Camera" }
                }
            }

            if received() > 0 {
                button {
                    class: "btn-secondary",
                    style: "width: 100%; padding: 14px; font-size: 16px; margin-bottom: 16px;",
                    disabled: busy(),
                    onclick: move |_| {
                        busy.set(true);
                        error.set(String::new());
                        spawn(async move {
                            match services::import_received().await {
                                Ok(saved) => log::info!("Imported {} shared images", saved.len()),
                                Err(e) => error.set(e.user_message()),
                            }
                            received.set(services::received_count());
                            images.set(load_images());
                            busy.set(false);
                        });
                    },
                    "📥 Import shared files ({received()})"
                }
            }

            if !error().is_empty() {
                div { style: "background: #fdecea; color: #b00020; padding: 12px; border-radius: 8px; margin-bottom: 16px; font-size: 14px;",
                    "{error()}"
                }
            }

            div { style: "display: flex; justify-content: space-between; align-items: center; margin-bottom: 8px;",
                span { style: "font-size: 14px; color: #666;", "{images().len()} images" }
                div { style: "display: flex; gap: 8px;",
                    if selecting() && !selected().is_empty() {
                        button {
                            style: "padding: 6px 12px; background: #d32f2f; color: white; border-radius: 6px;",
                            onclick: delete_selected,
                            "🗑️ Delete ({selected().len()})"
                        }
                    }
                    button {
                        style: "padding: 6px 12px; border-radius: 6px;",
                        onclick: move |_| {
                            selecting.toggle();
                            selected.write().clear();
                        },
                        if selecting() { "Cancel" } else { "Select" }
                    }
                }
            }

            if images().is_empty() {
                p { style: "text-align: center; color: #999; margin-top: 48px;",
                    "No images yet. Pick one from the gallery or take a photo."
                }
            }

            div { style: "display: grid; grid-template-columns: repeat(3, 1fr); gap: 6px; margin-bottom: 96px;",
                for path in images() {
                    {
                        let is_selected = selected().contains(&path);
                        let border = if is_selected { "3px solid #0066cc" } else { "3px solid transparent" };
                        let key = path.display().to_string();
                        let target = path.clone();
                        rsx! {
                            div {
                                key: "{key}",
                                style: "aspect-ratio: 1; overflow: hidden; border-radius: 6px; background: #ddd; border: {border}; cursor: pointer;",
                                onclick: move |_| {
                                    if selecting() {
                                        let mut set = selected.write();
                                        if !set.remove(&target) {
                                            set.insert(target.clone());
                                        }
                                    } else {
                                        on_navigate.call(Screen::Viewer(target.clone()));
                                    }
                                },
                                match image_path_to_data_url(&path) {
                                    Ok(data_url) => rsx! {
                                        img { src: data_url, style: "width: 100%; height: 100%; object-fit: cover;" }
                                    },
                                    Err(_) => rsx! {
                                        div { style: "font-size: 32px; color: #999; text-align: center; padding-top: 30%;", "🖼️" }
                                    },
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
