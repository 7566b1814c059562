#![forbid(unsafe_code)]
//! sitepulse-core library.
//!
//! Data model, repository traits and the SQLite store consumed by the
//! schedule health engine.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at the library seams, `anyhow::Result`
//!   for config and store plumbing.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod memory;
pub mod model;
pub mod repo;
