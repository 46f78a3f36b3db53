use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, UserId};

/// 尚未持久化的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: i64,
}

/// 已持久化的消息，写入后不可修改。
///
/// 序列化格式与实时通道上的消息帧一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip)]
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: i64,
}

impl Message {
    pub fn from_new(id: MessageId, message: NewMessage) -> Self {
        Self {
            id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}
