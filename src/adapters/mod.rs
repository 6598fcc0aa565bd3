//! Adapters layer: concrete implementations of ports, plus the request
//! endpoint that drives the application.
//!
//! - `fs_store`: JSON model artifacts on the local file system
//! - `endpoint`: newline-delimited JSON prediction protocol
//! - `sanitize`: redaction of survey answers and identifiers in logs

pub mod endpoint;
pub mod fs_store;
pub mod sanitize;

pub use fs_store::FsModelStore;
pub use sanitize::SanitizingMakeWriter;
