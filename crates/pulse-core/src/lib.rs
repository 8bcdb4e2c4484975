//! Core types and trait definitions for PulseTrack.
//!
//! This crate is free of HTTP and database dependencies. It holds
//! the domain model, the [`source::DataSource`] storage port, the chart
//! aggregation utility, and the framework-free cached-query layer that the
//! dashboard sections are built on.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod model;
pub mod opinion;
pub mod query;
pub mod source;
pub mod theme;

pub use error::{Error, Result};
