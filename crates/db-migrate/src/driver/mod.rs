//! The driver contract every backend implementation satisfies.
//!
//! A [`Driver`] owns exactly one live backend connection/session. It is
//! constructed by the [`registry`], initialized once with a connection URL,
//! and torn down explicitly via [`Driver::close`]. Drivers are not shared
//! across concurrent callers: the advisory lock only protects the bootstrap
//! step, so callers must serialize their own migration runs.

pub mod lock;
pub mod registry;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::file::MigrationFile;
use crate::methods::MethodSet;
use crate::pipe::Pipe;

/// Backend-specific implementation of the migration contract.
#[async_trait]
pub trait Driver: Send {
    /// First call on a fresh driver. Validates the URL, opens and verifies
    /// the connection, and bootstraps the version table under the advisory
    /// lock. Fails with a connection error if the backend is unreachable and
    /// a configuration error if a required option is missing.
    async fn initialize(&mut self, url: &str) -> Result<()>;

    /// Last call. Releases the connection. Safe to call once after any
    /// sequence of successful or failed operations; must not panic.
    async fn close(&mut self) -> Result<()>;

    /// Extension of the migration files this driver accepts. Must be
    /// non-empty and must not begin with a dot; the registry enforces this
    /// at registration time.
    fn filename_extension(&self) -> &'static str;

    /// Apply exactly one migration file, streaming progress and errors
    /// through `pipe`. The channel closes when this returns; all outcomes,
    /// including success (silence after the echoed file), are observable
    /// only through the channel.
    async fn migrate(&mut self, file: MigrationFile, pipe: Pipe);

    /// Highest recorded version, or 0 if no migration has been applied.
    async fn version(&mut self) -> Result<u64>;

    /// Attach the method set for drivers that apply migrations by invoking
    /// named callables. Script-based drivers reject this.
    fn register_methods(&mut self, _methods: MethodSet) -> Result<()> {
        Err(crate::error::MigrateError::config(
            "driver does not support named-method migrations",
        ))
    }
}

impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("extension", &self.filename_extension())
            .finish_non_exhaustive()
    }
}

/// Resolve a connection URL to an initialized driver.
///
/// The URL scheme selects the driver via the process-wide registry; the
/// driver is then constructed (applying any registered init hooks) and
/// initialized against the backend.
pub async fn connect(url: &str) -> Result<Box<dyn Driver>> {
    let parsed = Url::parse(url)?;
    let mut driver = registry::global().build(parsed.scheme())?;
    driver.initialize(url).await?;
    Ok(driver)
}
