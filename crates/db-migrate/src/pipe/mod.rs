//! Migration pipe protocol.
//!
//! A pipe is a one-directional asynchronous channel through which a driver
//! streams progress and errors while applying a single migration file. The
//! contract:
//!
//! 1. The driver closes the channel when (and only when) `migrate` returns,
//!    success or failure. Closure is the sole completion signal; consumers
//!    must read until closure and never assume a fixed message count.
//! 2. The first message is always the input file, echoed back so a consumer
//!    multiplexing many migrations can correlate messages to files.
//! 3. Any [`PipeMessage::Error`] means that file's migration failed and no
//!    further side effects beyond what was already committed will occur.
//!
//! The channel is unbounded so a producer never blocks on a slow reader.

use tokio::sync::mpsc;

use crate::error::MigrateError;
use crate::file::MigrationFile;

/// A message streamed through a migration pipe.
#[derive(Debug)]
pub enum PipeMessage {
    /// Echo of the file being applied; always the first message.
    File(MigrationFile),
    /// Free-form progress marker.
    Progress(String),
    /// The migration failed.
    Error(MigrateError),
}

/// Sending half of a migration pipe, held by the driver for the duration of
/// one `migrate` call. Dropping the last sender closes the channel.
pub type Pipe = mpsc::UnboundedSender<PipeMessage>;

/// Receiving half, drained by the caller.
pub type PipeReceiver = mpsc::UnboundedReceiver<PipeMessage>;

/// Create a new migration pipe.
pub fn channel() -> (Pipe, PipeReceiver) {
    mpsc::unbounded_channel()
}

/// Drain a pipe until closure, returning every message in order.
pub async fn drain(rx: &mut PipeReceiver) -> Vec<PipeMessage> {
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages
}

/// Drain a pipe until closure and collect only the errors.
pub async fn read_errors(rx: &mut PipeReceiver) -> Vec<MigrateError> {
    let mut errors = Vec::new();
    while let Some(message) = rx.recv().await {
        if let PipeMessage::Error(err) = message {
            errors.push(err);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{Direction, MigrationFile};

    #[tokio::test]
    async fn test_drain_stops_on_closure() {
        let (tx, mut rx) = channel();
        let file = MigrationFile::with_content("a", 1, Direction::Up, "");
        tx.send(PipeMessage::File(file)).unwrap();
        tx.send(PipeMessage::Progress("halfway".into())).unwrap();
        drop(tx);

        let messages = drain(&mut rx).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], PipeMessage::File(_)));
    }

    #[tokio::test]
    async fn test_read_errors_filters() {
        let (tx, mut rx) = channel();
        tx.send(PipeMessage::Progress("ok".into())).unwrap();
        tx.send(PipeMessage::Error(MigrateError::migration("boom")))
            .unwrap();
        drop(tx);

        let errors = read_errors(&mut rx).await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], MigrateError::Migration(_)));
    }

    #[tokio::test]
    async fn test_empty_pipe_closes() {
        let (tx, mut rx) = channel();
        drop(tx);
        assert!(drain(&mut rx).await.is_empty());
    }
}
