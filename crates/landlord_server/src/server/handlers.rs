//! Per-connection handling.

use crate::connection::Session;
use crate::error::{ProtocolError, ServerError};
use crate::messaging::codec;
use crate::messaging::ClientMessage;
use crate::table::TableHandle;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Runs one client connection to completion.
///
/// The first frame must be a `join` carrying a free name; anything else
/// closes the connection without telling the table. After that every frame
/// is forwarded to the table until the stream ends or breaks, and the
/// session is then removed.
///
/// # Arguments
///
/// * `stream` - Any duplex byte stream: a TCP socket in production, an
///   in-memory pipe in tests
/// * `table` - Handle of the table actor
/// * `max_frame_len` - Largest accepted frame body
pub async fn handle_connection<S>(stream: S, table: TableHandle, max_frame_len: usize) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);

    let name = match codec::read_frame::<_, ClientMessage>(&mut reader, max_frame_len).await? {
        Some(ClientMessage::Join { name }) => name,
        Some(other) => return Err(ProtocolError::ExpectedJoin(other.kind()).into()),
        None => {
            debug!("Connection closed before joining");
            return Ok(());
        }
    };

    table.join(Session::new(name.clone(), Box::new(writer))).await?;
    info!("🔗 Session {} established", name);

    let result = loop {
        match codec::read_frame::<_, ClientMessage>(&mut reader, max_frame_len).await {
            Ok(Some(message)) => {
                if let Err(e) = table.send(&name, message).await {
                    break Err(e);
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => {
                warn!("Closing session {}: {}", name, e);
                break Err(ServerError::from(e));
            }
        }
    };

    if let Err(e) = table.leave(&name).await {
        warn!("Could not remove {} from the table: {}", name, e);
    }
    info!("🔌 Session {} closed", name);
    result
}
