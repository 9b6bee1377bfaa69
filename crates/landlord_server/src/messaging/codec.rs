//! Length-prefixed JSON framing.
//!
//! ```text
//! | body length (u32, big endian) | body (UTF-8 JSON) |
//! |              4B               |   length bytes    |
//! ```
//!
//! The same framing is used in both directions.

use crate::error::ProtocolError;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Default upper bound for a single frame body.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// Serializes `message` into a complete frame (header included).
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(message)?;
    let len = u32::try_from(body.len())
        .map_err(|_| ProtocolError::FrameTooLarge(body.len(), u32::MAX as usize))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes a frame body (without header).
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(serde_json::from_str(text)?)
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new header
/// starts. A stream that ends in the middle of a header or body yields
/// [`ProtocolError::Truncated`].
///
/// # Arguments
///
/// * `reader` - Inbound half of the connection
/// * `max_len` - Largest body accepted; longer frames are rejected before
///   their body is read
pub async fn read_frame<R, T>(reader: &mut R, max_len: usize) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; HEADER_LEN];
    let read = read_full(reader, &mut header).await?;
    if read == 0 {
        return Ok(None);
    }
    if read < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: HEADER_LEN,
            read,
        });
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_len {
        return Err(ProtocolError::FrameTooLarge(len, max_len));
    }

    let mut body = vec![0u8; len];
    let read = read_full(reader, &mut body).await?;
    if read < len {
        return Err(ProtocolError::Truncated { expected: len, read });
    }

    decode(&body).map(Some)
}

/// Encodes `message` and writes it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Fills `buf` until it is full or the stream ends, returning the byte count.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{ClientMessage, ServerMessage};
    use tokio::io::duplex;

    #[test]
    fn test_encode_prefixes_big_endian_length() {
        let frame = encode(&ServerMessage::tell("hi")).unwrap();
        let body = br#"{"type":"tell","content":"hi"}"#;
        assert_eq!(&frame[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&frame[4..], body);
    }

    #[tokio::test]
    async fn test_frames_survive_a_stream() {
        let (mut client, mut server) = duplex(1024);
        write_frame(&mut client, &ClientMessage::Join { name: "alice".into() })
            .await
            .unwrap();
        write_frame(&mut client, &ClientMessage::Play { cards: "33".into() })
            .await
            .unwrap();
        drop(client);

        let first: Option<ClientMessage> = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(first, Some(ClientMessage::Join { name: "alice".into() }));
        let second: Option<ClientMessage> = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(second, Some(ClientMessage::Play { cards: "33".into() }));
        let end: Option<ClientMessage> = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        let (mut client, mut server) = duplex(1024);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(b"{\"ty").await.unwrap();
        drop(client);

        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await;
        assert!(matches!(
            result,
            Err(ProtocolError::Truncated { expected: 10, read: 4 })
        ));
    }

    #[tokio::test]
    async fn test_truncated_header_is_an_error() {
        let (mut client, mut server) = duplex(1024);
        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await;
        assert!(matches!(result, Err(ProtocolError::Truncated { .. })));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = duplex(1024);
        client.write_all(&4096u32.to_be_bytes()).await.unwrap();

        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server, 1024).await;
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge(4096, 1024))));
    }

    #[test]
    fn test_decode_rejects_bad_utf8_and_json() {
        assert!(matches!(
            decode::<ClientMessage>(&[0xff, 0xfe]),
            Err(ProtocolError::InvalidUtf8)
        ));
        assert!(matches!(
            decode::<ClientMessage>(b"{not json"),
            Err(ProtocolError::Json(_))
        ));
    }
}
