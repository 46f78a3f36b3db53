//! 进程内存储实现
//!
//! 供开发环境和测试使用，进程重启后数据丢失。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Message, MessageId, NewMessage, NewUser, RepositoryError, Session, User, UserEmail, UserId,
    Username,
};
use tokio::sync::RwLock;

use crate::repository::{MessageRepository, SessionRepository, UserRepository};

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    users: HashMap<UserId, User>,
}

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    inner: RwLock<UserTable>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 停用账号；返回账号是否存在
    pub async fn deactivate(&self, id: UserId) -> bool {
        let mut table = self.inner.write().await;
        match table.users.get_mut(&id) {
            Some(user) => {
                user.deactivated = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.inner.write().await;
        if table.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::conflict("email"));
        }
        if table.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::conflict("username"));
        }

        table.next_id += 1;
        let stored = User {
            id: UserId::new(table.next_id),
            username: user.username,
            email: user.email,
            password: user.password,
            avatar: None,
            deactivated: false,
            created_at: user.created_at,
        };
        table.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let table = self.inner.read().await;
        Ok(table.users.values().find(|u| &u.email == email).cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let table = self.inner.read().await;
        Ok(table.users.values().find(|u| &u.username == username).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token) {
            return Err(RepositoryError::conflict("token"));
        }
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

/// 只追加的消息日志，ID 即写入顺序
#[derive(Debug, Default)]
pub struct MemoryMessageRepository {
    log: RwLock<Vec<Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, message: NewMessage) -> Result<MessageId, RepositoryError> {
        let mut log = self.log.write().await;
        let id = MessageId(log.len() as i64 + 1);
        log.push(Message::from_new(id, message));
        Ok(id)
    }

    async fn history(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        // 日志本身就是写入顺序，不按客户端时间戳重排
        let log = self.log.read().await;
        Ok(log
            .iter()
            .filter(|m| m.sender_id == sender && m.receiver_id == receiver)
            .cloned()
            .collect())
    }
}
