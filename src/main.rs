use dioxus::prelude::*;
use std::path::PathBuf;

mod components;
mod config;
mod error;
mod filesystem;
mod image_processing;
mod logging;
mod services;

use components::{GalleryScreen, ViewerScreen};

fn main() {
    logging::init_logging(services::app_config().log_level());
    dioxus::launch(App);
}

/// Screens of the app
#[derive(Clone, PartialEq, Debug)]
pub enum Screen {
    Gallery,
    Viewer(PathBuf),
}

#[component]
fn App() -> Element {
    let mut current_screen = use_signal(|| Screen::Gallery);

    rsx! {
        div { style: "display: flex; flex-direction: column; height: 100vh; font-family: sans-serif;",
            div { style: "flex: 1; overflow-y: auto;",
                match current_screen() {
                    Screen::Gallery => rsx! {
                        GalleryScreen { on_navigate: move |s| current_screen.set(s) }
                    },
                    Screen::Viewer(path) => rsx! {
                        ViewerScreen { path, on_navigate: move |s| current_screen.set(s) }
                    },
                }
            }
        }
    }
}
