use std::sync::Arc;

use application::{MessageRepository, SessionRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Message, MessageId, NewMessage, NewUser, RepositoryError, Session, User, UserEmail, UserId,
    Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

/// 唯一约束冲突映射为 `Conflict`，其余错误一律视为存储不可用
fn map_insert_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_email_key") => "email",
                Some("users_username_key") => "username",
                Some("sessions_pkey") => "token",
                other => other.unwrap_or("unknown"),
            };
            return RepositoryError::conflict(field);
        }
    }
    map_sqlx_err(err)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    avatar: Option<String>,
    deactivated: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username = Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password = domain::PasswordHash::new(value.password_hash)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::new(value.id),
            username,
            email,
            password,
            avatar: value.avatar,
            deactivated: value.deactivated,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SessionRecord {
    token: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
}

impl From<SessionRecord> for Session {
    fn from(value: SessionRecord) -> Self {
        Session {
            token: value.token,
            user_id: UserId::new(value.user_id),
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    content: String,
    sent_at: i64,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Message {
            id: MessageId(value.id),
            sender_id: UserId::new(value.sender_id),
            receiver_id: UserId::new(value.receiver_id),
            content: value.content,
            timestamp: value.sent_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar, deactivated, created_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        record.map(User::try_from).transpose()
    }

    /// 停用账号；停用后不能登录，也不会出现在用户查询中
    pub async fn deactivate(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET deactivated = TRUE WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(user.password.as_str())
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_err)?;
        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        self.find_one("email", email.as_str()).await
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_one("username", username.as_str()).await
    }
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(session.user_id.as_i64())
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_insert_err)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(record.map(Session::from))
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: NewMessage) -> Result<MessageId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO messages (sender_id, receiver_id, content, sent_at) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(message.sender_id.as_i64())
        .bind(message.receiver_id.as_i64())
        .bind(&message.content)
        .bind(message.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(MessageId(id))
    }

    async fn history(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, sender_id, receiver_id, content, sent_at FROM messages \
             WHERE sender_id = $1 AND receiver_id = $2 \
             ORDER BY id ASC",
        )
        .bind(sender.as_i64())
        .bind(receiver.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(records.into_iter().map(Message::from).collect())
    }
}

/// 共享同一个连接池的全部 PostgreSQL 存储
#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub session_repository: Arc<PgSessionRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            session_repository: Arc::new(PgSessionRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
