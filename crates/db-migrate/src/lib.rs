//! # db-migrate
//!
//! Backend-agnostic schema migration engine.
//!
//! Given an ordered set of migration files and a target database connection,
//! the engine applies or reverts them one at a time, tracks the
//! currently-applied version, and streams progress/errors to the caller
//! through an asynchronous pipe. Backends as different as relational SQL
//! engines and document stores plug in behind one driver contract:
//!
//! - **Driver contract & registry**: a URL scheme selects a registered
//!   backend implementation ([`driver`])
//! - **Advisory lock**: concurrent runners serialize their bootstrap step on
//!   a deterministic, backend-native lock ([`driver::lock`])
//! - **Pipe protocol**: each `migrate` call streams its outcome through a
//!   close-terminated channel ([`pipe`])
//! - **Named-method invocation**: backends can apply migrations by invoking
//!   registered callables instead of executing scripts ([`methods`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_migrate::{connect, pipe, Direction, MigrationFile};
//!
//! #[tokio::main]
//! async fn main() -> db_migrate::Result<()> {
//!     let mut driver = connect("postgres://localhost/app?sslmode=disable").await?;
//!
//!     let file = MigrationFile::new("migrations/0001_init.up.sql", "init", 1, Direction::Up);
//!     let (tx, mut rx) = pipe::channel();
//!     driver.migrate(file, tx).await;
//!     for err in pipe::read_errors(&mut rx).await {
//!         eprintln!("migration failed: {err}");
//!     }
//!
//!     println!("now at version {}", driver.version().await?);
//!     driver.close().await
//! }
//! ```

pub mod driver;
pub mod drivers;
pub mod error;
pub mod file;
pub mod methods;
pub mod pipe;

// Re-exports for convenient access
pub use driver::registry::Registry;
pub use driver::{connect, lock, registry, Driver};
pub use drivers::{SslMode, TlsBuilder};
pub use error::{MigrateError, Result};
pub use file::{Direction, MigrationFile};
pub use methods::{MethodSet, MethodSetBuilder, Migrator};
pub use pipe::{Pipe, PipeMessage, PipeReceiver};
