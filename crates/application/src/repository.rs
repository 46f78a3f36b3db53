use async_trait::async_trait;
use domain::{
    Message, MessageId, NewMessage, NewUser, RepositoryError, Session, User, UserEmail, UserId,
    Username,
};

/// 用户存储，同时充当身份目录（存在性与停用检查）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 邮箱或用户名重复时返回 `RepositoryError::Conflict`，`field` 为冲突字段
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;
}

/// 会话存储，只在登录时写入
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> Result<(), RepositoryError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError>;
}

/// 只追加的消息日志
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 持久化一条消息；存储不可用时返回 `RepositoryError::Storage`，不做透明重试
    async fn append(&self, message: NewMessage) -> Result<MessageId, RepositoryError>;

    /// 返回 `sender -> receiver` 单向的全部消息，按时间戳升序，同一时间戳按写入顺序
    async fn history(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;
}
