//! Reference script-based backend for PostgreSQL.
//!
//! Applies `.sql` migration files through a single tokio-postgres session.
//! The version-table mutation and the file content execute in one native
//! transaction; statement failures are reported with line/column diagnostics
//! derived from the server's error position.

use async_trait::async_trait;
use tokio_postgres::error::ErrorPosition;
use url::Url;

use crate::driver::Driver;
use crate::drivers::common::PgSession;
use crate::error::{MigrateError, Result};
use crate::file::{self, Direction, MigrationFile};
use crate::pipe::{Pipe, PipeMessage};

const VERSION_TABLE: &str = "schema_migrations";
const LOCK_PRODUCT: &str = "postgres";

/// Lines of source context rendered around a failing statement.
const ERROR_CONTEXT_LINES: usize = 5;

pub struct PostgresDriver {
    session: PgSession,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self {
            session: PgSession::new(VERSION_TABLE, LOCK_PRODUCT),
        }
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry constructor for the `postgres` scheme.
pub fn constructor() -> Box<dyn Driver> {
    Box::new(PostgresDriver::new())
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn initialize(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)?;
        self.session.connect(&parsed).await
    }

    async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }

    fn filename_extension(&self) -> &'static str {
        "sql"
    }

    async fn migrate(&mut self, mut file: MigrationFile, pipe: Pipe) {
        let _ = pipe.send(PipeMessage::File(file.clone()));

        let client = match self.session.client().await {
            Ok(client) => client,
            Err(err) => {
                let _ = pipe.send(PipeMessage::Error(MigrateError::connection(format!(
                    "failed to ensure connection is open: {err}"
                ))));
                return;
            }
        };

        let tx = match client.transaction().await {
            Ok(tx) => tx,
            Err(err) => {
                let _ = pipe.send(PipeMessage::Error(err.into()));
                return;
            }
        };

        let version = file.version as i64;
        let bookkeeping = match file.direction {
            Direction::Up => {
                tx.execute(
                    &format!("INSERT INTO {VERSION_TABLE} (version) VALUES ($1)"),
                    &[&version],
                )
                .await
            }
            Direction::Down => {
                tx.execute(
                    &format!("DELETE FROM {VERSION_TABLE} WHERE version = $1"),
                    &[&version],
                )
                .await
            }
        };
        if let Err(err) = bookkeeping {
            let _ = pipe.send(PipeMessage::Error(err.into()));
            if let Err(err) = tx.rollback().await {
                let _ = pipe.send(PipeMessage::Error(err.into()));
            }
            return;
        }

        let content = match file.read_content().await {
            Ok(content) => content,
            Err(err) => {
                let _ = pipe.send(PipeMessage::Error(err));
                if let Err(err) = tx.rollback().await {
                    let _ = pipe.send(PipeMessage::Error(err.into()));
                }
                return;
            }
        };

        if let Err(err) = tx.batch_execute(content).await {
            let _ = pipe.send(PipeMessage::Error(statement_error(content, err)));
            if let Err(err) = tx.rollback().await {
                let _ = pipe.send(PipeMessage::Error(err.into()));
            }
            return;
        }

        if let Err(err) = tx.commit().await {
            let _ = pipe.send(PipeMessage::Error(err.into()));
        }
    }

    async fn version(&mut self) -> Result<u64> {
        self.session.version().await
    }
}

/// Translate a statement failure into a migration error, attaching
/// line/column diagnostics when the server reported a position.
fn statement_error(content: &str, err: tokio_postgres::Error) -> MigrateError {
    match err.as_db_error() {
        Some(db) => {
            let offset = db.position().and_then(|position| match position {
                ErrorPosition::Original(offset) => Some(*offset as usize),
                ErrorPosition::Internal { .. } => None,
            });
            MigrateError::Migration(format_db_error(
                db.severity(),
                db.code().code(),
                db.message(),
                content,
                offset,
            ))
        }
        None => err.into(),
    }
}

/// Format severity/code/message, with a marked source window when a 1-based
/// byte offset into `content` is available.
fn format_db_error(
    severity: &str,
    code: &str,
    message: &str,
    content: &str,
    offset: Option<usize>,
) -> String {
    match offset.filter(|offset| *offset >= 1) {
        Some(offset) => {
            let (line, column) = file::line_column_from_offset(content, offset - 1);
            let window = file::lines_before_and_after(
                content,
                line,
                ERROR_CONTEXT_LINES,
                ERROR_CONTEXT_LINES,
                true,
            );
            format!("{severity} {code}: {message} in line {line}, column {column}:\n\n{window}")
        }
        None => format!("{severity} {code}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "CREATE TABLE a (id int);\nCREATE TABLE b (id int);\nSELEC broken;\nCREATE TABLE c (id int);\n";

    #[test]
    fn test_format_db_error_with_offset() {
        // Server positions are 1-based.
        let offset = CONTENT.find("SELEC").unwrap() + 1;
        let rendered = format_db_error("ERROR", "42601", "syntax error", CONTENT, Some(offset));
        assert!(rendered.contains("ERROR 42601: syntax error in line 3, column 1:"));
        assert!(rendered.contains("-> SELEC broken;"));
        assert!(rendered.contains("   CREATE TABLE a (id int);"));
    }

    #[test]
    fn test_format_db_error_window_is_bounded() {
        let many_lines = "x;\n".repeat(40);
        let rendered = format_db_error("ERROR", "42601", "boom", &many_lines, Some(60));
        // 5 lines before, target, 5 after
        assert_eq!(rendered.lines().skip(1).filter(|l| !l.is_empty()).count(), 11);
    }

    #[test]
    fn test_format_db_error_without_offset() {
        let rendered = format_db_error("ERROR", "42601", "syntax error", CONTENT, None);
        assert_eq!(rendered, "ERROR 42601: syntax error");
    }

    #[test]
    fn test_format_db_error_zero_offset_degrades() {
        let rendered = format_db_error("FATAL", "57P01", "shutting down", CONTENT, Some(0));
        assert_eq!(rendered, "FATAL 57P01: shutting down");
    }

    #[test]
    fn test_extension() {
        assert_eq!(PostgresDriver::new().filename_extension(), "sql");
    }

    #[test]
    fn test_script_driver_rejects_method_sets() {
        let mut driver = PostgresDriver::new();
        let methods = crate::methods::MethodSet::builder().build();
        assert!(driver.register_methods(methods).is_err());
    }
}
