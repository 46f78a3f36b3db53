//! 进程内在线状态表
//!
//! 每个用户最多一条记录：用户 ID 映射到当前连接的出站通道。
//! 新连接覆盖旧记录（后写者胜），连接结束时只删除仍指向自己的记录。
//! 所有操作都是短小的同步临界区，不会跨越 `.await` 持有锁。

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use domain::UserId;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// 转发给客户端的原始帧文本
pub type OutboundFrame = String;

/// 单个实时连接的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 指向某个连接的出站通道句柄
#[derive(Debug, Clone)]
pub struct PresenceChannel {
    connection_id: ConnectionId,
    sender: mpsc::Sender<OutboundFrame>,
}

impl PresenceChannel {
    /// 创建有界通道；接收端交给负责写 socket 的任务
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                connection_id: ConnectionId::new(),
                sender,
            },
            receiver,
        )
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// 非阻塞投递，队列满或接收端已关闭时立即失败
    pub fn try_forward(&self, frame: OutboundFrame) -> Result<(), UnreachableReason> {
        self.sender.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => UnreachableReason::QueueFull,
            TrySendError::Closed(_) => UnreachableReason::ChannelClosed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableReason {
    /// 接收方消费太慢
    QueueFull,
    /// 接收方连接已经结束
    ChannelClosed,
}

/// 一次转发尝试的结果；除 `Delivered` 外都只是"未实时送达"，消息本身已持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Offline,
    Unreachable(UnreachableReason),
}

#[derive(Debug, Default)]
pub struct PresenceTable {
    entries: RwLock<HashMap<UserId, PresenceChannel>>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 无条件写入；返回被替换的旧通道（不会通知或关闭它）
    pub fn register(&self, user_id: UserId, channel: PresenceChannel) -> Option<PresenceChannel> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, channel)
    }

    pub fn lookup(&self, user_id: UserId) -> Option<PresenceChannel> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    /// 幂等删除
    pub fn remove(&self, user_id: UserId) -> Option<PresenceChannel> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id)
    }

    /// 仅当记录仍属于 `connection_id` 时删除，返回是否删除
    pub fn remove_if(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&user_id) {
            Some(channel) if channel.connection_id == connection_id => {
                entries.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user_id)
    }

    pub fn online_count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 查找接收方并尝试转发。查找和投递之间不持有锁。
    pub fn deliver(&self, receiver: UserId, frame: OutboundFrame) -> DeliveryOutcome {
        let Some(channel) = self.lookup(receiver) else {
            return DeliveryOutcome::Offline;
        };
        match channel.try_forward(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(reason) => DeliveryOutcome::Unreachable(reason),
        }
    }
}

/// 持有期间代表一条在线记录；drop 时做比较删除。
///
/// 连接任务被取消时同样会清理，不依赖显式的断开路径。
#[derive(Debug)]
pub struct PresenceGuard {
    table: Arc<PresenceTable>,
    user_id: UserId,
    connection_id: ConnectionId,
}

impl PresenceGuard {
    /// 注册通道并返回守卫
    pub fn register(table: Arc<PresenceTable>, user_id: UserId, channel: PresenceChannel) -> Self {
        let connection_id = channel.connection_id();
        if let Some(previous) = table.register(user_id, channel) {
            tracing::info!(
                user_id = %user_id,
                replaced_connection = %previous.connection_id(),
                connection_id = %connection_id,
                "presence entry superseded by newer connection"
            );
        }
        Self {
            table,
            user_id,
            connection_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let removed = self.table.remove_if(self.user_id, self.connection_id);
        tracing::debug!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            removed,
            "presence entry released"
        );
    }
}
