use std::sync::Arc;

use domain::{
    DomainError, NewUser, PresenceStatus, RepositoryError, Session, User, UserEmail, UserId,
    UserProfile, Username,
};

use crate::{
    clock::Clock, error::ApplicationError, password::PasswordHasher, presence::PresenceTable,
    repository::{SessionRepository, UserRepository},
    session::issue_session,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

/// 登录成功：用户信息和新签发的会话
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub session: Session,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub session_repository: Arc<dyn SessionRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub presence: Arc<PresenceTable>,
    pub session_ttl: chrono::Duration,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(
        &self,
        request: RegisterUserRequest,
    ) -> Result<UserProfile, ApplicationError> {
        let username = Username::parse(request.username)?;
        let email = UserEmail::parse(request.email)?;
        if request.password.is_empty() {
            return Err(DomainError::invalid_argument("password", "cannot be empty").into());
        }

        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(DomainError::EmailTaken.into());
        }
        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(DomainError::UsernameTaken.into());
        }

        let password = self.deps.password_hasher.hash(&request.password).await?;
        let stored = self
            .deps
            .user_repository
            .create(NewUser {
                username,
                email,
                password,
                created_at: self.deps.clock.now(),
            })
            .await
            .map_err(conflict_to_domain)?;

        tracing::info!(user_id = %stored.id, username = %stored.username, "user registered");
        Ok(self.profile_of(&stored))
    }

    /// 校验邮箱和密码并签发新会话；同一用户可以同时持有多个会话
    pub async fn login(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<LoginOutcome, ApplicationError> {
        let email = UserEmail::parse(request.email).map_err(|_| ApplicationError::InvalidCredentials)?;
        let Some(user) = self.deps.user_repository.find_by_email(&email).await? else {
            // 未知邮箱也做一次同等代价的哈希，耗时与密码错误一致
            let _ = self.deps.password_hasher.hash(&request.password).await;
            return Err(ApplicationError::InvalidCredentials);
        };

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok || !user.is_active() {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(ApplicationError::InvalidCredentials);
        }

        let session = issue_session(user.id, self.deps.clock.now(), self.deps.session_ttl);
        self.deps.session_repository.create(session.clone()).await?;

        tracing::info!(user_id = %user.id, expires_at = %session.expires_at, "session issued");
        Ok(LoginOutcome {
            user: self.profile_of(&user),
            session,
        })
    }

    /// 查询用户资料；不在在线状态表中即为离线
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, ApplicationError> {
        let user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .filter(User::is_active)
            .ok_or(DomainError::UserNotFound)?;
        Ok(self.profile_of(&user))
    }

    fn profile_of(&self, user: &User) -> UserProfile {
        user.profile(PresenceStatus::from_online(
            self.deps.presence.is_online(user.id),
        ))
    }
}

/// 并发注册在存储层撞上唯一约束时，映射回领域错误
fn conflict_to_domain(err: RepositoryError) -> ApplicationError {
    match &err {
        RepositoryError::Conflict { field } if field == "email" => DomainError::EmailTaken.into(),
        RepositoryError::Conflict { field } if field == "username" => {
            DomainError::UsernameTaken.into()
        }
        _ => err.into(),
    }
}
