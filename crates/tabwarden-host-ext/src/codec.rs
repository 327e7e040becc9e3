//! Native messaging framing and wire types
//!
//! Each frame is a 4-byte little-endian byte length followed by that many
//! bytes of UTF-8 JSON. Frames larger than [`MAX_FRAME_BYTES`] are
//! rejected outright; a runaway length prefix must not trigger a huge
//! allocation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tabwarden_util::TabId;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound for a single frame in either direction.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame of {0} bytes exceeds the frame cap")]
    FrameTooLarge(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Messages arriving from the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtMessage {
    Event(ExtEvent),
    Reply(ReplyEnvelope),
}

/// Tab lifecycle events forwarded by the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtEvent {
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        url: String,
    },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    TabActivated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
}

/// Correlated answer to a [`HostOp::QueryTab`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub reply: QueryReply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReply {
    pub id: u64,
    #[serde(default)]
    pub exists: bool,
}

/// Operations sent to the extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    QueryTab {
        id: u64,
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    CloseTab {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    Notify {
        #[serde(rename = "notificationId")]
        notification_id: String,
        title: String,
        message: String,
    },
}

/// Read one raw frame. `Ok(None)` on clean EOF at a frame boundary.
pub async fn read_frame<R>(reader: &mut R) -> CodecResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one raw frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> CodecResult<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one message. `Ok(None)` on clean EOF.
pub async fn read_message<R, T>(reader: &mut R) -> CodecResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
        None => Ok(None),
    }
}

/// Encode and write one message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> CodecResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{\"event\":\"tab_removed\",\"tabId\":3}")
            .await
            .unwrap();

        // Length prefix is little-endian byte count
        assert_eq!(&buf[..4], &(33u32).to_le_bytes());

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(frame, b"{\"event\":\"tab_removed\",\"tabId\":3}");
    }

    #[tokio::test]
    async fn eof_at_boundary_is_clean() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let frame = read_frame(&mut cursor).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES as u32 + 1).to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(CodecError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn message_round_trip() {
        let op = HostOp::QueryTab {
            id: 9,
            tab_id: TabId::new(44),
        };

        let mut buf = Vec::new();
        write_message(&mut buf, &op).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let parsed: HostOp = read_message(&mut cursor).await.unwrap().unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn ext_event_wire_shape() {
        let json = r#"{"event":"tab_updated","tabId":12,"url":"https://facebook.com/"}"#;
        let msg: ExtMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ExtMessage::Event(ExtEvent::TabUpdated { tab_id, .. }) if tab_id == TabId::new(12)
        ));
    }

    #[test]
    fn reply_wire_shape() {
        let json = r#"{"reply":{"id":7,"exists":true}}"#;
        let msg: ExtMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ExtMessage::Reply(ReplyEnvelope {
                reply: QueryReply { id: 7, exists: true }
            })
        ));
    }

    #[test]
    fn host_op_wire_shape() {
        let json = serde_json::to_string(&HostOp::CloseTab {
            tab_id: TabId::new(5),
        })
        .unwrap();
        assert_eq!(json, r#"{"op":"close_tab","tabId":5}"#);

        let json = serde_json::to_string(&HostOp::Notify {
            notification_id: "blocked".into(),
            title: "Time's up".into(),
            message: "Blocked for 60 minutes.".into(),
        })
        .unwrap();
        assert!(json.contains(r#""op":"notify""#));
        assert!(json.contains(r#""notificationId":"blocked""#));
    }
}
