//! 实时通道上的消息帧
//!
//! 帧是自描述的 JSON 文本：
//! `{"senderId": 1, "receiverId": 2, "content": "hi", "timestamp": 1000}`。
//! 转发时使用收到的原始文本，不重新序列化。

use serde::Deserialize;
use thiserror::Error;

use crate::message::NewMessage;
use crate::value_objects::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFrame {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: i64,
}

/// 单帧错误，只影响当前帧，连接保持活跃
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not a valid message payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame sender {claimed} does not match connection identity {actual}")]
    SenderMismatch { claimed: UserId, actual: UserId },
}

impl MessageFrame {
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 解析帧并确认发送者就是已认证的连接身份
    pub fn parse_from(raw: &str, connection_user: UserId) -> Result<Self, FrameError> {
        let frame = Self::parse(raw)?;
        if frame.sender_id != connection_user {
            return Err(FrameError::SenderMismatch {
                claimed: frame.sender_id,
                actual: connection_user,
            });
        }
        Ok(frame)
    }
}

impl From<MessageFrame> for NewMessage {
    fn from(frame: MessageFrame) -> Self {
        NewMessage {
            sender_id: frame.sender_id,
            receiver_id: frame.receiver_id,
            content: frame.content,
            timestamp: frame.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_payload() {
        let frame =
            MessageFrame::parse(r#"{"senderId":1,"receiverId":2,"content":"hi","timestamp":1000}"#)
                .unwrap();
        assert_eq!(frame.sender_id, UserId::new(1));
        assert_eq!(frame.receiver_id, UserId::new(2));
        assert_eq!(frame.content, "hi");
        assert_eq!(frame.timestamp, 1000);
    }

    #[test]
    fn tolerates_unknown_fields() {
        let frame = MessageFrame::parse(
            r#"{"senderId":1,"receiverId":2,"content":"hi","timestamp":1,"client":"web"}"#,
        );
        assert!(frame.is_ok());
    }

    #[test]
    fn rejects_missing_or_mistyped_fields() {
        for raw in [
            "not json",
            r#"{"senderId":1,"receiverId":2,"content":"hi"}"#,
            r#"{"senderId":"1","receiverId":2,"content":"hi","timestamp":1}"#,
            r#"{"senderId":1,"receiverId":2,"content":5,"timestamp":1}"#,
        ] {
            assert!(
                matches!(MessageFrame::parse(raw), Err(FrameError::Malformed(_))),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_frames_sent_on_behalf_of_someone_else() {
        let raw = r#"{"senderId":3,"receiverId":2,"content":"hi","timestamp":1}"#;
        let err = MessageFrame::parse_from(raw, UserId::new(1)).unwrap_err();
        assert!(matches!(err, FrameError::SenderMismatch { .. }));
    }
}
