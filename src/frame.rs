//! Newline-delimited frame codec.
//!
//! One frame is a single UTF-8 JSON value terminated by `\n`:
//!
//! ```text
//! {"Model":"Rodigo","Brand":"LP","Size":{...}}\n
//! ```
//!
//! Reads tolerate partial arrivals and a peer that closes without sending the
//! newline (the bytes seen so far are returned). Buffer growth is capped by a
//! maximum payload size; anything longer fails with `FrameTooLarge`.

use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frame delimiter
pub const DELIMITER: u8 = b'\n';

/// Initial read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Read one frame.
///
/// Returns `Ok(None)` when the stream ended (or carried only whitespace)
/// before any payload arrived. The returned payload excludes the newline and
/// has trailing whitespace trimmed. A payload of exactly `max_size` bytes is
/// accepted; one byte more is `FrameTooLarge`.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Option<Bytes>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
    let mut scanned = 0;

    loop {
        // Only the newly arrived bytes need scanning
        if let Some(pos) = find_delimiter(&buffer[scanned..]) {
            let end = scanned + pos;
            if end > max_size {
                return Err(FrameError::FrameTooLarge { limit: max_size });
            }
            buffer.truncate(end);
            return Ok(finish(buffer));
        }

        if buffer.len() > max_size {
            return Err(FrameError::FrameTooLarge { limit: max_size });
        }
        scanned = buffer.len();

        if buffer.capacity() == buffer.len() {
            buffer.reserve(BUFFER_SIZE);
        }
        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            // Peer closed without a delimiter: best-effort partial frame
            return Ok(finish(buffer));
        }
    }
}

/// Write one frame: the payload followed by exactly one newline, fully
/// flushed before returning.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = BytesMut::with_capacity(payload.len() + 1);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[DELIMITER]);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// `read_frame` bounded by a deadline.
pub async fn read_frame_timeout<R>(
    reader: &mut R,
    max_size: usize,
    timeout: Duration,
) -> Result<Option<Bytes>, FrameError>
where
    R: AsyncRead + Unpin,
{
    with_timeout(timeout, read_frame(reader, max_size)).await
}

/// `write_frame` bounded by a deadline.
pub async fn write_frame_timeout<W>(
    writer: &mut W,
    payload: &[u8],
    timeout: Duration,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    with_timeout(timeout, write_frame(writer, payload)).await
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, FrameError>
where
    F: Future<Output = Result<T, FrameError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FrameError::Timeout(timeout)),
    }
}

fn finish(mut buffer: BytesMut) -> Option<Bytes> {
    let len = buffer.trim_ascii_end().len();
    buffer.truncate(len);
    if buffer.is_empty() {
        None
    } else {
        Some(buffer.freeze())
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_single_frame() {
        let mut mock = Builder::new().read(b"{\"a\":1}\n").build();
        let frame = read_frame(&mut mock, 1024).await.unwrap().unwrap();
        assert_eq!(&frame[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_read_partial_arrivals() {
        let mut mock = Builder::new()
            .read(b"{\"Model\":")
            .read(b"\"Rodigo\"")
            .read(b"}")
            .read(b"\n")
            .build();
        let frame = read_frame(&mut mock, 1024).await.unwrap().unwrap();
        assert_eq!(&frame[..], b"{\"Model\":\"Rodigo\"}");
    }

    #[tokio::test]
    async fn test_read_stops_at_first_newline() {
        let mut mock = Builder::new().read(b"first\nsecond\n").build();
        let frame = read_frame(&mut mock, 1024).await.unwrap().unwrap();
        assert_eq!(&frame[..], b"first");
    }

    #[tokio::test]
    async fn test_read_trims_trailing_whitespace() {
        let mut mock = Builder::new().read(b"{}  \r\n").build();
        let frame = read_frame(&mut mock, 1024).await.unwrap().unwrap();
        assert_eq!(&frame[..], b"{}");
    }

    #[tokio::test]
    async fn test_read_partial_frame_at_eof() {
        let mut mock = Builder::new().read(b"{\"a\":").read(b"1}").build();
        let frame = read_frame(&mut mock, 1024).await.unwrap().unwrap();
        assert_eq!(&frame[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_read_empty_stream() {
        let mut mock = Builder::new().build();
        assert!(read_frame(&mut mock, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_whitespace_only() {
        let mut mock = Builder::new().read(b"  \n").build();
        assert!(read_frame(&mut mock, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_exactly_max_size() {
        let payload = vec![b'x'; 64];
        let mut input = payload.clone();
        input.push(b'\n');

        let mut mock = Builder::new().read(&input).build();
        let frame = read_frame(&mut mock, 64).await.unwrap().unwrap();
        assert_eq!(frame.len(), 64);
    }

    #[tokio::test]
    async fn test_read_one_over_max_size() {
        let mut input = vec![b'x'; 65];
        input.push(b'\n');

        let mut mock = Builder::new().read(&input).build();
        match read_frame(&mut mock, 64).await {
            Err(FrameError::FrameTooLarge { limit }) => assert_eq!(limit, 64),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_oversized_without_newline() {
        // Fails as soon as the limit is passed, without waiting for more input
        let mut mock = Builder::new().read(&[b'x'; 40]).read(&[b'x'; 40]).build();
        assert!(matches!(
            read_frame(&mut mock, 64).await,
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_oversized_at_eof() {
        let mut mock = Builder::new().read(&[b'x'; 65]).build();
        assert!(matches!(
            read_frame(&mut mock, 64).await,
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_io_error() {
        let mut mock = Builder::new()
            .read(b"{\"a\"")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        assert!(matches!(
            read_frame(&mut mock, 1024).await,
            Err(FrameError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_write_appends_single_newline() {
        let mut mock = Builder::new().write(b"{\"ok\":true}\n").build();
        write_frame(&mut mock, b"{\"ok\":true}").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let mut mock = Builder::new()
            .wait(Duration::from_secs(10))
            .build();
        match read_frame_timeout(&mut mock, 1024, Duration::from_secs(1)).await {
            Err(FrameError::Timeout(d)) => assert_eq!(d, Duration::from_secs(1)),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
