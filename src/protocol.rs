use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Hard cap on a single wire request. Requests carry an action and a file
/// path, so anything past this is garbage, not a long note.
pub const MAX_REQUEST_BYTES: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "--add")]
    Add,
    #[serde(rename = "--view")]
    View,
    #[serde(rename = "--view-all")]
    ViewAll,
}

/// One fire-and-forget request, one connection. `file_path` is null for
/// `--view-all` and is always present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Request {
    pub fn add(path: impl Into<String>) -> Self {
        Self {
            action: Action::Add,
            file_path: Some(path.into()),
        }
    }

    pub fn view(path: impl Into<String>) -> Self {
        Self {
            action: Action::View,
            file_path: Some(path.into()),
        }
    }

    pub fn view_all() -> Self {
        Self {
            action: Action::ViewAll,
            file_path: None,
        }
    }
}

pub fn encode(request: &Request) -> Result<Vec<u8>> {
    serde_json::to_vec(request).context("failed to encode request")
}

pub fn decode(raw: &[u8]) -> Result<Request> {
    serde_json::from_slice(raw).context("malformed request")
}

/// Reads one request: everything until end-of-stream, bounded by
/// [`MAX_REQUEST_BYTES`]. Oversized, empty, or unparsable payloads are
/// errors; the caller logs and drops them.
pub async fn read_request<R>(reader: R) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    reader
        .take(MAX_REQUEST_BYTES as u64 + 1)
        .read_to_end(&mut raw)
        .await
        .context("failed to read request")?;
    if raw.is_empty() {
        bail!("connection closed before any data arrived");
    }
    if raw.len() > MAX_REQUEST_BYTES {
        bail!("request exceeds {MAX_REQUEST_BYTES} bytes");
    }
    decode(&raw)
}

/// Writes one request and shuts the write side down so the peer sees
/// end-of-stream. Nothing is ever read back.
pub async fn write_request<W>(mut writer: W, request: &Request) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let raw = encode(request)?;
    writer
        .write_all(&raw)
        .await
        .context("failed to write request")?;
    writer
        .shutdown()
        .await
        .context("failed to finish writing request")?;
    Ok(())
}
