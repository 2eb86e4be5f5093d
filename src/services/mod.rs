pub mod picker_service;

pub use picker_service::*;
