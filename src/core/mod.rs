//! The core module holds the error type and the settings a render graph is created with.

pub mod error;
pub mod settings;
