//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 注册时邮箱已被占用
    #[error("email already registered")]
    EmailTaken,

    /// 注册时用户名已被占用
    #[error("username already registered")]
    UsernameTaken,

    /// 用户不存在或已停用
    #[error("user not found")]
    UserNotFound,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误类型
///
/// `Storage` 表示底层存储不可用，调用方不得把它当作"未找到"处理。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated on {field}")]
    Conflict { field: String },
    #[error("storage unavailable: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn conflict(field: impl Into<String>) -> Self {
        Self::Conflict {
            field: field.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
