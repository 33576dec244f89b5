//! Backend driver implementations.
//!
//! - [`postgres`]: reference script-based backend (tokio-postgres)
//! - [`generic`]: named-method backend over a relational session
//! - [`common`]: shared session plumbing and TLS setup
//!
//! Each backend keeps its connection, reconnect, and advisory-lock details
//! private and exposes only the [`crate::driver::Driver`] contract. New
//! backends register a constructor under their URL scheme via
//! `registry::global().register(...)`.

pub mod common;
pub mod generic;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
