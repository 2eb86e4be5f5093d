pub mod gallery;
pub mod viewer;

pub use gallery::GalleryScreen;
pub use viewer::ViewerScreen;
