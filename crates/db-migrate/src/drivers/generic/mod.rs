//! Named-method backend over a relational session.
//!
//! For migrations that cannot be expressed as a script, a `.mth` file lists
//! registered method names, one per line. The driver resolves each name
//! through its attached [`MethodSet`] and invokes it against the live
//! session, in file order. Version bookkeeping lives in a relational
//! database selected by the required `migrations_db_type` URL parameter,
//! which is stripped before the underlying client connects.
//!
//! Method effects are not transactional: on failure, already-invoked
//! methods stay applied and only the version row is withheld.

use async_trait::async_trait;
use url::Url;

use crate::driver::Driver;
use crate::drivers::common::PgSession;
use crate::error::{MigrateError, Result};
use crate::file::{Direction, MigrationFile};
use crate::methods::{MethodSet, Migrator};
use crate::pipe::{Pipe, PipeMessage};

pub const DRIVER_NAME: &str = "generic";

const VERSION_TABLE: &str = "db_migrations";

pub struct GenericDriver {
    session: PgSession,
    methods: Option<MethodSet>,
}

impl GenericDriver {
    pub fn new() -> Self {
        Self {
            session: PgSession::new(VERSION_TABLE, DRIVER_NAME),
            methods: None,
        }
    }
}

impl Default for GenericDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry constructor for the `generic` scheme.
pub fn constructor() -> Box<dyn Driver> {
    Box::new(GenericDriver::new())
}

/// Resolve the real backend named by the `migrations_db_type` parameter.
fn migrations_backend(url: &Url) -> Result<String> {
    let backend = url
        .query_pairs()
        .find(|(key, _)| key == "migrations_db_type")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();
    match backend.as_str() {
        "" => Err(MigrateError::config(
            "migrations_db_type query parameter was not provided",
        )),
        "postgres" => Ok(backend),
        other => Err(MigrateError::Config(format!(
            "could not deduce migrations database from migrations_db_type '{other}'"
        ))),
    }
}

#[async_trait]
impl Driver for GenericDriver {
    async fn initialize(&mut self, url: &str) -> Result<()> {
        if self.methods.is_none() {
            return Err(MigrateError::UnregisteredReceiver(DRIVER_NAME.to_string()));
        }
        let parsed = Url::parse(url)?;
        migrations_backend(&parsed)?;
        self.session.connect(&parsed).await
    }

    async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }

    fn filename_extension(&self) -> &'static str {
        "mth"
    }

    async fn migrate(&mut self, mut file: MigrationFile, pipe: Pipe) {
        let _ = pipe.send(PipeMessage::File(file.clone()));

        let methods = match self.methods.clone() {
            Some(methods) => methods,
            None => {
                let _ = pipe.send(PipeMessage::Error(MigrateError::UnregisteredReceiver(
                    DRIVER_NAME.to_string(),
                )));
                return;
            }
        };

        let client = match self.session.client().await {
            Ok(client) => client,
            Err(err) => {
                let _ = pipe.send(PipeMessage::Error(MigrateError::connection(format!(
                    "failed to ensure connection is open: {err}"
                ))));
                return;
            }
        };

        let migrator = Migrator::new(methods);
        if let Err(err) = migrator.migrate(&mut file, &pipe, &mut *client).await {
            let _ = pipe.send(PipeMessage::Error(err));
            return;
        }

        let version = file.version as i64;
        let bookkeeping = match file.direction {
            Direction::Up => {
                client
                    .execute(
                        &format!("INSERT INTO {VERSION_TABLE} (version) VALUES ($1)"),
                        &[&version],
                    )
                    .await
            }
            Direction::Down => {
                client
                    .execute(
                        &format!("DELETE FROM {VERSION_TABLE} WHERE version = $1"),
                        &[&version],
                    )
                    .await
            }
        };
        if let Err(err) = bookkeeping {
            let _ = pipe.send(PipeMessage::Error(err.into()));
        }
    }

    async fn version(&mut self) -> Result<u64> {
        self.session.version().await
    }

    fn register_methods(&mut self, methods: MethodSet) -> Result<()> {
        if self.methods.is_some() {
            panic!("methods receiver already registered for driver '{DRIVER_NAME}'");
        }
        self.methods = Some(methods);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_backend_param_required() {
        let err = migrations_backend(&url("generic://localhost/db")).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_backend_param_postgres_accepted() {
        let backend =
            migrations_backend(&url("generic://localhost/db?migrations_db_type=postgres"))
                .unwrap();
        assert_eq!(backend, "postgres");
    }

    #[test]
    fn test_backend_param_unknown_rejected() {
        let err = migrations_backend(&url("generic://localhost/db?migrations_db_type=oracle"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[tokio::test]
    async fn test_initialize_requires_method_set() {
        let mut driver = GenericDriver::new();
        let err = driver
            .initialize("generic://localhost/db?migrations_db_type=postgres")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnregisteredReceiver(_)));
    }

    #[tokio::test]
    async fn test_migrate_without_method_set_reports_unregistered() {
        let mut driver = GenericDriver::new();
        let file = MigrationFile::with_content("m", 1, Direction::Up, "a_up\n");
        let (tx, mut rx) = pipe::channel();
        driver.migrate(file, tx).await;

        let errors = pipe::read_errors(&mut rx).await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], MigrateError::UnregisteredReceiver(_)));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_second_method_set_is_fatal() {
        let mut driver = GenericDriver::new();
        driver
            .register_methods(MethodSet::builder().build())
            .unwrap();
        let _ = driver.register_methods(MethodSet::builder().build());
    }

    #[test]
    fn test_extension() {
        assert_eq!(GenericDriver::new().filename_extension(), "mth");
    }
}
