//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例：会话校验、在线状态表、实时消息中继，
//! 以及注册登录与历史查询等服务，并定义对外部适配器（存储、密码哈希、时钟）的抽象。

pub mod clock;
pub mod error;
pub mod memory;
pub mod password;
pub mod presence;
pub mod relay;
pub mod repository;
pub mod services;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError};
pub use presence::{
    ConnectionId, DeliveryOutcome, OutboundFrame, PresenceChannel, PresenceGuard, PresenceTable,
    UnreachableReason,
};
pub use relay::{
    ActiveConnection, ConnectionState, FrameOutcome, InboundEvent, RelayEngine,
    RelayEngineDependencies, Termination,
};
pub use repository::{MessageRepository, SessionRepository, UserRepository};
pub use services::{
    AuthenticateUserRequest, LoginOutcome, MessageService, RegisterUserRequest, UserService,
    UserServiceDependencies,
};
pub use session::{RejectionReason, SessionValidation, SessionValidator};
