//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP 请求委托给应用层服务，并把 WebSocket 连接接入实时中继。

mod error;
mod routes;
mod state;
mod trace;
mod ws_connection;

pub use error::{ApiError, ErrorBody};
pub use routes::{router, SESSION_COOKIE};
pub use state::AppState;
pub use trace::{trace_layer, RequestTraceLayer};
