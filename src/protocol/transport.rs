use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Result, ServiceError};

use super::frame::{Frame, FRAME_LEN};

/// Connect retries for the primary (client -> name node) hop.
pub const CONNECT_ATTEMPTS: usize = 3;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// I/O timeout on control-channel exchanges.
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn write_frame(stream: &mut TcpStream, frame: &Frame) -> Result<()> {
    let buf = frame.encode()?;
    stream
        .write_all(&buf)
        .await
        .map_err(|e| ServiceError::Internal(format!("frame write failed: {}", e)))?;
    Ok(())
}

/// Reads one full frame. A short read is fatal to the session and is
/// surfaced as an error; callers must not retry on the same connection.
pub async fn read_frame(stream: &mut TcpStream) -> Result<Frame> {
    let mut buf = vec![0u8; FRAME_LEN];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| ServiceError::Internal(format!("frame read failed: {}", e)))?;
    Frame::decode(&buf)
}

pub async fn connect(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .map_err(|e| ServiceError::Internal(format!("connect to {} failed: {}", addr, e)))
}

/// Connects with the client retry policy: three attempts, two seconds apart.
pub async fn connect_with_retry(addr: &str) -> Result<TcpStream> {
    let mut last_err = ServiceError::Internal("no connect attempt made".to_string());

    for attempt in 0..CONNECT_ATTEMPTS {
        match connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::warn!(
                    "Connect to {} failed (attempt {}/{}): {}",
                    addr,
                    attempt + 1,
                    CONNECT_ATTEMPTS,
                    e
                );
                last_err = e;
                if attempt + 1 < CONNECT_ATTEMPTS {
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
    }

    Err(last_err)
}

/// One-shot exchange for secondary hops: connect, send, receive, close.
pub async fn request(addr: &str, frame: &Frame) -> Result<Frame> {
    let mut stream = connect(addr).await.map_err(|_| ServiceError::StorageNodeDown)?;

    let exchange = async {
        write_frame(&mut stream, frame).await?;
        read_frame(&mut stream).await
    };

    match tokio::time::timeout(IO_TIMEOUT, exchange).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::StorageNodeDown),
    }
}
