//! Fan-out of outgoing envelopes to the roster.
//!
//! A broadcast is encoded once and then written to every session
//! concurrently. The call returns after every write has finished, so a slow
//! client delays the caller but not delivery to the other clients.

use crate::connection::{Registry, Session};
use crate::messaging::{codec, ServerMessage};
use futures::future::join_all;
use tracing::{debug, warn};

/// Sends `message` to every registered session.
///
/// Write failures are logged and otherwise ignored: the failing connection
/// is torn down by its own read loop.
pub async fn send_all(registry: &mut Registry, message: &ServerMessage) {
    let frame = match codec::encode(message) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Dropping broadcast that failed to encode: {}", e);
            return;
        }
    };

    let writes = registry
        .sessions_mut()
        .iter_mut()
        .map(|session| deliver(session, &frame));
    let delivered = join_all(writes).await.into_iter().filter(|ok| *ok).count();

    debug!("📢 Broadcast delivered to {}/{} sessions", delivered, registry.len());
}

/// Sends `message` to the session called `name`, if it is still registered.
pub async fn send_to(registry: &mut Registry, name: &str, message: &ServerMessage) {
    match registry.get_mut(name) {
        Some(session) => {
            if let Err(e) = session.send(message).await {
                warn!("Failed to send to {}: {}", name, e);
            }
        }
        None => debug!("Dropping message for unregistered player {}", name),
    }
}

async fn deliver(session: &mut Session, frame: &[u8]) -> bool {
    match session.send_raw(frame).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to deliver broadcast to {}: {}", session.name(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::codec::{read_frame, DEFAULT_MAX_FRAME_LEN};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWrite};

    /// A writer that never makes progress.
    struct Stalled;

    impl AsyncWrite for Stalled {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Pending
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Pending
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// A writer whose peer is gone.
    struct Broken;

    impl AsyncWrite for Broken {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_send_all_reaches_every_session() {
        let mut registry = Registry::new();
        let mut inboxes = Vec::new();
        for name in ["a", "b", "c"] {
            let (outbox, inbox) = duplex(1024);
            registry.insert(Session::new(name, Box::new(outbox))).unwrap();
            inboxes.push(inbox);
        }

        send_all(&mut registry, &ServerMessage::tell("hello")).await;

        for inbox in inboxes.iter_mut() {
            let msg: Option<ServerMessage> = read_frame(inbox, DEFAULT_MAX_FRAME_LEN).await.unwrap();
            assert_eq!(msg, Some(ServerMessage::tell("hello")));
        }
    }

    #[tokio::test]
    async fn test_broken_peer_does_not_stop_broadcast() {
        let mut registry = Registry::new();
        registry.insert(Session::new("gone", Box::new(Broken))).unwrap();
        let (outbox, mut inbox) = duplex(1024);
        registry.insert(Session::new("here", Box::new(outbox))).unwrap();

        send_all(&mut registry, &ServerMessage::tell("still here")).await;

        let msg: Option<ServerMessage> = read_frame(&mut inbox, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(msg, Some(ServerMessage::tell("still here")));
    }

    #[tokio::test]
    async fn test_stalled_peer_delays_return_but_not_delivery() {
        let mut registry = Registry::new();
        registry.insert(Session::new("slow", Box::new(Stalled))).unwrap();
        let (outbox, mut inbox) = duplex(1024);
        registry.insert(Session::new("fast", Box::new(outbox))).unwrap();

        let message = ServerMessage::tell("go");
        let broadcast = send_all(&mut registry, &message);
        tokio::pin!(broadcast);

        let received = tokio::select! {
            _ = &mut broadcast => panic!("broadcast returned while a peer was stalled"),
            msg = read_frame::<_, ServerMessage>(&mut inbox, DEFAULT_MAX_FRAME_LEN) => msg.unwrap(),
        };
        assert_eq!(received, Some(ServerMessage::tell("go")));
    }

    #[tokio::test]
    async fn test_send_to_targets_one_session() {
        let mut registry = Registry::new();
        let (outbox_a, mut inbox_a) = duplex(1024);
        let (outbox_b, mut inbox_b) = duplex(1024);
        registry.insert(Session::new("a", Box::new(outbox_a))).unwrap();
        registry.insert(Session::new("b", Box::new(outbox_b))).unwrap();

        send_to(&mut registry, "b", &ServerMessage::error("nope")).await;
        send_all(&mut registry, &ServerMessage::tell("all")).await;

        let first_a: Option<ServerMessage> = read_frame(&mut inbox_a, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(first_a, Some(ServerMessage::tell("all")));
        let first_b: Option<ServerMessage> = read_frame(&mut inbox_b, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(first_b, Some(ServerMessage::error("nope")));
    }
}
