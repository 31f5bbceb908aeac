//! showroom-core: shared building blocks for the Showroom image service.
//!
//! Holds the structured error that crosses the HTTP boundary and the
//! string key/value configuration store every other crate reads from.

pub mod config;
pub mod errors;

pub use config::{load_env_config, ShowroomConfig, ShowroomConfigSnapshot};
pub use errors::{ErrorKind, ShowroomError};
