//! Runtime assembly for PulseTrack: configuration, backend selection and the
//! seed utility shared by the `server` and `seed` binaries.

#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod seed;
pub mod source;

pub use config::{BackendConfig, QueriesConfig, ServerConfig};
pub use error::{Error, Result};
pub use source::AnySource;
