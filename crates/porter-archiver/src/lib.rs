//! porter-archiver: the archive server.
//!
//! Accepts signed package uploads, verifies them against the maintainer
//! keyring, counter-signs them with the archive key, persists artifact and
//! signature to the storage backend and maintains the release index.

pub mod error;
pub mod http;
pub mod keyring;
pub mod pipeline;
pub mod signer;
pub mod storage;

pub use http::{AppState, app};
pub use pipeline::Archiver;
