//! Shared plumbing for relational backends.

pub mod session;
pub mod tls;

pub(crate) use session::PgSession;
pub use tls::{SslMode, TlsBuilder};
