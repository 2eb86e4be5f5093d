//! # Image Picker
//!
//! Bridge between application code and a native image picker facility.
//!
//! A submission hands a serialized projection of a [`PickerRequest`] to the
//! facility and returns immediately. The facility shows its UI (or walks the
//! queue of files shared into the app) out of process and later calls back
//! with a string result, addressed by the request id. This crate provides:
//! - The request data model and its sinks (texture buffers or callbacks)
//! - Decoding of the callback strings (single path or `index|path`)
//! - An async decode pipeline from file path to downscaled pixels
//! - A registry correlating callbacks with outstanding submissions
//! - A live facade over the facility's received-files queue
//!
//! ## Platform Separation
//!
//! On Android the facility is the Java plugin reached through JNI. Other
//! platforms get a facility that rejects every submission.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use image_picker::{ImagePicker, ImageSink, PickerConfig, PickerSettings, TextureHandle};
//!
//! let picker = ImagePicker::for_platform(PickerConfig::default(), "./data".into());
//! let texture = TextureHandle::placeholder();
//! picker
//!     .pick_image(ImageSink::Texture(texture.clone()), PickerSettings::default())
//!     .await?;
//! ```

pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod facility;
pub mod models;
pub mod picker;
pub mod queue;
pub mod registry;
pub mod session;

#[cfg(target_os = "android")]
pub mod android;

pub use codec::{decode_indexed, decode_single, CodecError, IndexedResult};
pub use config::{BatchCompletion, PickerConfig};
pub use decode::{fit_dimensions, DecodeError, FitBounds};
pub use error::PickerError;
pub use facility::{DebugLevel, PickerFacility, UnsupportedFacility};
pub use models::{
    BatchSinks, ErrorCallback, ImageCallback, ImageEncoding, ImageSink, PickerMode, PickerRequest,
    PickerSettings, RequestId, TextureHandle,
};
pub use picker::ImagePicker;
pub use queue::ReceivedQueue;
pub use registry::{CallbackRegistry, DispatchError, INDEXED_RESULT_METHOD, SINGLE_RESULT_METHOD};
pub use session::{DeliveredImage, EntryFailure, PickerOutcome, PickerSession, SessionState};

#[cfg(target_os = "android")]
pub use android::{install_dispatcher, AndroidFacility};
