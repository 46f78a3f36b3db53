//! 消息中继核心领域模型
//!
//! 包含用户、会话、消息等实体，以及实时通道上交换的消息帧格式。

pub mod errors;
pub mod frame;
pub mod message;
pub mod session;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use frame::{FrameError, MessageFrame};
pub use message::{Message, NewMessage};
pub use session::Session;
pub use user::{NewUser, PresenceStatus, User, UserProfile};
pub use value_objects::*;
