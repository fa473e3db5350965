//! LSP base protocol framing: `Content-Length: N\r\n\r\n<json>`.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::OracleError;

const CONTENT_LENGTH: &str = "content-length:";

/// Serialize one message with its header.
pub fn encode_message(message: &Value) -> Result<Vec<u8>, OracleError> {
    let body = serde_json::to_vec(message)?;
    let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Value of a `Content-Length` header line, case-insensitive.
pub fn parse_content_length(line: &str) -> Option<usize> {
    let line = line.trim();
    let name = line.get(..CONTENT_LENGTH.len())?;
    if !name.eq_ignore_ascii_case(CONTENT_LENGTH) {
        return None;
    }
    line[CONTENT_LENGTH.len()..].trim().parse().ok()
}

pub async fn write_message<W>(writer: &mut W, message: &Value) -> Result<(), OracleError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_message(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message. Headers other than `Content-Length` are ignored.
pub async fn read_message<R>(reader: &mut R) -> Result<Value, OracleError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length = None;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(OracleError::Closed);
        }
        if line == "\r\n" || line == "\n" {
            break;
        }
        if let Some(len) = parse_content_length(&line) {
            content_length = Some(len);
        }
    }
    let len = content_length
        .ok_or_else(|| OracleError::Protocol("missing Content-Length header".to_string()))?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}
