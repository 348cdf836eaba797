//! Core library for porter: the `.pkg` container codec, the file naming
//! grammar, package metadata, the archive index model, the archive HTTP
//! client, and the client-side install cache.

pub mod cache;
pub mod changelog;
pub mod client;
pub mod config;
pub mod container;
pub mod index;
pub mod meta;
pub mod name;
pub mod paths;

pub use container::{Container, Entry};
pub use meta::Meta;
pub use name::{FileName, PackageKind};

/// User Agent string for archive client operations
pub const USER_AGENT: &str = concat!("porter-core/", env!("CARGO_PKG_VERSION"));
