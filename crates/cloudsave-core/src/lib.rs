//! Core types and trait definitions for the cloudsave service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The storage backend and the server both depend on it; it depends on
//! nothing but small, pure-Rust helpers.

pub mod blob;
pub mod code;
pub mod error;
pub mod identity;
pub mod limits;
pub mod log;
pub mod store;
pub mod subscription;

pub use error::{Error, Result};
