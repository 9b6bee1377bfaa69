//! Single-owner task around a [`Table`].
//!
//! Connection tasks never touch the table directly. They hold a cloneable
//! [`TableHandle`] and send [`TableEvent`]s over a bounded channel; the
//! actor applies them one at a time, in arrival order.

use super::Table;
use crate::connection::Session;
use crate::error::{ProtocolError, ServerError};
use crate::messaging::ClientMessage;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Requests a connection task can make of the table.
#[derive(Debug)]
pub enum TableEvent {
    /// Register a session. The reply carries the refusal reason, if any.
    Join {
        session: Session,
        reply: oneshot::Sender<Result<(), ProtocolError>>,
    },
    Message {
        name: String,
        message: ClientMessage,
    },
    /// The connection of `name` has ended.
    Leave { name: String },
}

/// Cloneable sender side of the table actor.
#[derive(Debug, Clone)]
pub struct TableHandle {
    sender: mpsc::Sender<TableEvent>,
}

impl TableHandle {
    /// Moves `table` into a new task and returns the handle used to reach it.
    ///
    /// The task ends once every handle has been dropped and hands the table
    /// back through its `JoinHandle`.
    pub fn spawn(table: Table, capacity: usize) -> (Self, JoinHandle<Table>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run(table, receiver));
        (Self { sender }, task)
    }

    /// Registers `session`, waiting for the table's answer.
    pub async fn join(&self, session: Session) -> Result<(), ServerError> {
        let (reply, answer) = oneshot::channel();
        self.dispatch(TableEvent::Join { session, reply }).await?;
        answer
            .await
            .map_err(|_| ServerError::Internal("table dropped a join request".to_string()))?
            .map_err(ServerError::from)
    }

    pub async fn send(&self, name: &str, message: ClientMessage) -> Result<(), ServerError> {
        self.dispatch(TableEvent::Message {
            name: name.to_string(),
            message,
        })
        .await
    }

    pub async fn leave(&self, name: &str) -> Result<(), ServerError> {
        self.dispatch(TableEvent::Leave {
            name: name.to_string(),
        })
        .await
    }

    async fn dispatch(&self, event: TableEvent) -> Result<(), ServerError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| ServerError::Internal("table is no longer running".to_string()))
    }
}

async fn run(mut table: Table, mut receiver: mpsc::Receiver<TableEvent>) -> Table {
    info!("🎴 Table actor started");
    while let Some(event) = receiver.recv().await {
        match event {
            TableEvent::Join { session, reply } => {
                let outcome = match table.join(session).await {
                    Ok(()) => Ok(()),
                    Err((refused, reason)) => {
                        debug!("Refused {}: {}", refused.name(), reason);
                        refused.close().await;
                        Err(reason)
                    }
                };
                let _ = reply.send(outcome);
            }
            TableEvent::Message { name, message } => {
                debug!("📨 {} from {}", message.kind(), name);
                table.handle_message(&name, message).await;
            }
            TableEvent::Leave { name } => table.leave(&name).await,
        }
    }
    info!("🎴 Table actor stopped");
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::codec::{read_frame, DEFAULT_MAX_FRAME_LEN};
    use crate::messaging::ServerMessage;
    use crate::rating::MemoryRatingStore;
    use crate::table::{Phase, TableConfig};
    use tokio::io::duplex;

    fn spawn() -> (TableHandle, JoinHandle<Table>) {
        let table = Table::new(
            TableConfig {
                initial_k: 32,
                seed: Some(1),
            },
            Box::new(MemoryRatingStore::new()),
        );
        TableHandle::spawn(table, 8)
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let (handle, task) = spawn();
        let mut inboxes = Vec::new();
        for name in ["a", "b", "c"] {
            let (outbox, inbox) = duplex(1 << 16);
            handle.join(Session::new(name, Box::new(outbox))).await.unwrap();
            inboxes.push(inbox);
        }
        handle
            .send("a", ClientMessage::Cmd { cmd: "start".into() })
            .await
            .unwrap();
        handle.leave("b").await.unwrap();
        drop(handle);

        let table = task.await.unwrap();
        assert_eq!(table.registry().names(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(table.game().phase(), Phase::Idle);
        assert_eq!(table.game().k(), 32);
    }

    #[tokio::test]
    async fn test_duplicate_join_is_refused_and_closed() {
        let (handle, _task) = spawn();
        let (first, _keep) = duplex(1 << 16);
        handle.join(Session::new("a", Box::new(first))).await.unwrap();

        let (second, mut refused_inbox) = duplex(1 << 16);
        let err = handle.join(Session::new("a", Box::new(second))).await.unwrap_err();
        assert!(matches!(err, ServerError::Protocol(ProtocolError::DuplicateName(_))));

        let next: Option<ServerMessage> = read_frame(&mut refused_inbox, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();
        assert_eq!(next, None);
    }
}
