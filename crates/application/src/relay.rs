//! 实时消息中继
//!
//! 每个连接经历 `Connecting -> Authenticating -> Active -> Terminated`：
//!
//! - 认证失败直接终止，不产生任何在线状态或存储副作用；
//! - 进入 Active 时登记在线状态，然后按接收顺序逐帧处理：
//!   先持久化，再按接收方在线状态转发原始帧；
//! - 终止时只删除仍属于本连接的在线记录。

use std::{fmt, sync::Arc};

use domain::{FrameError, MessageFrame, MessageId, NewMessage, RepositoryError, Session, UserId};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::{
    error::ApplicationError,
    presence::{ConnectionId, DeliveryOutcome, OutboundFrame, PresenceChannel, PresenceGuard, PresenceTable},
    repository::MessageRepository,
    session::SessionValidator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticating,
    Active,
    Terminated,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Active => "active",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// 传输层交给中继的入站事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// 连接终止原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// 客户端正常断开或传输流结束
    Disconnected,
    /// 传输层不可恢复的错误
    TransportError(String),
    /// 持久化失败，触发该错误的消息没有被转发
    StoreUnavailable(RepositoryError),
}

/// 单帧处理结果
#[derive(Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Relayed {
        message_id: MessageId,
        delivery: DeliveryOutcome,
    },
    /// 非法帧被丢弃，连接保持活跃
    Dropped,
}

pub struct RelayEngineDependencies {
    pub validator: SessionValidator,
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<PresenceTable>,
}

pub struct RelayEngine {
    deps: RelayEngineDependencies,
    outbound_buffer: usize,
}

/// 已认证并登记在线状态的连接
#[derive(Debug)]
pub struct ActiveConnection {
    guard: PresenceGuard,
    state: ConnectionState,
}

impl ActiveConnection {
    pub fn user_id(&self) -> UserId {
        self.guard.user_id()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.guard.connection_id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

impl RelayEngine {
    pub fn new(deps: RelayEngineDependencies, relay_config: &config::RelayConfig) -> Self {
        Self {
            deps,
            outbound_buffer: relay_config.outbound_buffer,
        }
    }

    pub fn presence(&self) -> &Arc<PresenceTable> {
        &self.deps.presence
    }

    /// Authenticating：校验令牌属于声明的身份
    pub async fn authenticate(
        &self,
        token: Option<&str>,
        claimed: UserId,
    ) -> Result<Session, ApplicationError> {
        tracing::debug!(user_id = %claimed, state = %ConnectionState::Authenticating, "authenticating connection");
        let validation = self.deps.validator.validate(token, claimed).await?;
        validation.into_result().inspect_err(|err| {
            tracing::info!(user_id = %claimed, error = %err, state = %ConnectionState::Terminated, "connection rejected");
        })
    }

    /// 进入 Active：登记在线状态，返回连接句柄和出站队列接收端
    pub fn open(&self, user_id: UserId) -> (ActiveConnection, mpsc::Receiver<OutboundFrame>) {
        let (channel, receiver) = PresenceChannel::new(self.outbound_buffer);
        let guard = PresenceGuard::register(self.deps.presence.clone(), user_id, channel);
        tracing::info!(
            user_id = %user_id,
            connection_id = %guard.connection_id(),
            state = %ConnectionState::Active,
            online = self.deps.presence.online_count(),
            "connection active"
        );
        (
            ActiveConnection {
                guard,
                state: ConnectionState::Active,
            },
            receiver,
        )
    }

    /// 认证后立即登记在线状态
    pub async fn connect(
        &self,
        token: Option<&str>,
        claimed: UserId,
    ) -> Result<(ActiveConnection, mpsc::Receiver<OutboundFrame>), ApplicationError> {
        let session = self.authenticate(token, claimed).await?;
        Ok(self.open(session.user_id))
    }

    /// Active 主循环，直到传输结束、传输出错或存储不可用
    pub async fn run<S, E>(&self, mut connection: ActiveConnection, inbound: S) -> Termination
    where
        S: Stream<Item = Result<InboundEvent, E>>,
        E: fmt::Display,
    {
        let user_id = connection.user_id();
        let connection_id = connection.connection_id();
        futures_util::pin_mut!(inbound);

        let termination = loop {
            let event = match inbound.next().await {
                None => break Termination::Disconnected,
                Some(Err(err)) => break Termination::TransportError(err.to_string()),
                Some(Ok(event)) => event,
            };

            let raw = match event {
                InboundEvent::Close => break Termination::Disconnected,
                InboundEvent::Text(raw) => raw,
                InboundEvent::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(raw) => raw,
                    Err(_) => {
                        tracing::warn!(user_id = %user_id, "dropping non utf-8 binary frame");
                        continue;
                    }
                },
            };

            if let Err(err) = self.relay_frame(user_id, raw).await {
                tracing::error!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    error = %err,
                    "message could not be persisted, terminating connection"
                );
                break Termination::StoreUnavailable(err);
            }
        };

        connection.state = ConnectionState::Terminated;
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            state = %connection.state,
            reason = ?termination,
            "connection terminated"
        );
        drop(connection);
        termination
    }

    /// 处理一帧：解析、持久化、转发。
    ///
    /// 只有持久化失败会返回 `Err`；此时消息不会被转发。
    pub async fn relay_frame(
        &self,
        sender: UserId,
        raw: String,
    ) -> Result<FrameOutcome, RepositoryError> {
        let frame = match MessageFrame::parse_from(&raw, sender) {
            Ok(frame) => frame,
            Err(err) => {
                log_dropped_frame(sender, &err);
                return Ok(FrameOutcome::Dropped);
            }
        };

        let receiver = frame.receiver_id;
        let message_id = self
            .deps
            .message_repository
            .append(NewMessage::from(frame))
            .await?;

        let delivery = self.deps.presence.deliver(receiver, raw);
        match delivery {
            DeliveryOutcome::Delivered => {
                tracing::debug!(sender = %sender, receiver_id = %receiver, message_id = %message_id, "message forwarded")
            }
            DeliveryOutcome::Offline => {
                tracing::debug!(sender = %sender, receiver_id = %receiver, message_id = %message_id, "receiver offline, message stored only")
            }
            DeliveryOutcome::Unreachable(reason) => {
                tracing::warn!(sender = %sender, receiver_id = %receiver, message_id = %message_id, ?reason, "receiver unreachable, message stored only")
            }
        }

        Ok(FrameOutcome::Relayed {
            message_id,
            delivery,
        })
    }
}

fn log_dropped_frame(sender: UserId, err: &FrameError) {
    tracing::warn!(user_id = %sender, error = %err, "dropping malformed frame");
}
