//! WebSocket 传输适配
//!
//! 把已认证的 socket 接入中继：发送任务把出站队列写入 socket，
//! 接收方向转换成 `InboundEvent` 流交给 `RelayEngine::run`。

use std::time::Duration;

use application::{InboundEvent, Termination};
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use domain::UserId;
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;

/// 连接结束后等待发送任务把剩余帧写完的时间
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// 存储不可用时的关闭码（1011 internal error）
const CLOSE_INTERNAL_ERROR: u16 = 1011;

pub async fn serve(socket: WebSocket, state: AppState, user_id: UserId) {
    let (connection, mut outbound) = state.relay.open(user_id);
    let connection_id = connection.connection_id();
    let (mut sender, incoming) = socket.split();
    let (close_tx, close_rx) = tokio::sync::oneshot::channel::<Option<CloseFrame>>();

    // 发送任务：出站队列关闭（在线记录被移除或被新连接替换后最后一个句柄释放）时结束
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                tracing::debug!(user_id = %user_id, "websocket sink closed");
                return;
            }
        }
        let close = close_rx.await.ok().flatten();
        let _ = sender.send(WsMessage::Close(close)).await;
    });

    let inbound = incoming.filter_map(|message| async move {
        match message {
            Ok(WsMessage::Text(text)) => Some(Ok(InboundEvent::Text(text.as_str().to_owned()))),
            Ok(WsMessage::Binary(bytes)) => Some(Ok(InboundEvent::Binary(bytes.to_vec()))),
            Ok(WsMessage::Close(_)) => Some(Ok(InboundEvent::Close)),
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => None,
            Err(err) => Some(Err(err)),
        }
    });

    let termination = state.relay.run(connection, inbound).await;

    let close = match &termination {
        Termination::StoreUnavailable(_) => Some(CloseFrame {
            code: CLOSE_INTERNAL_ERROR,
            reason: "store unavailable".into(),
        }),
        Termination::Disconnected | Termination::TransportError(_) => None,
    };
    let _ = close_tx.send(close);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        tracing::debug!(user_id = %user_id, connection_id = %connection_id, "writer did not drain in time, aborting");
        send_task.abort();
    }
}
