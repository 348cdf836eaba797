//! Subcommand implementations: thin glue over porter-core.

pub mod install;
pub mod keygen;
pub mod list;
pub mod remove;
pub mod sign;
pub mod upload;
