//! 会话校验与签发
//!
//! 校验只读访问会话存储：令牌必须存在、未过期，并且绑定到声明的身份。

use std::{fmt, sync::Arc};

use data_encoding::BASE64URL_NOPAD;
use domain::{Session, Timestamp, UserId};
use rand::RngCore;

use crate::{clock::Clock, error::ApplicationError, repository::SessionRepository};

/// 令牌随机字节数
const TOKEN_BYTES: usize = 32;

/// 会话被拒绝的原因，每个原因有稳定的错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    MissingToken,
    UnknownToken,
    Expired,
    IdentityMismatch,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "TOKEN_MISSING",
            Self::UnknownToken => "TOKEN_UNKNOWN",
            Self::Expired => "TOKEN_EXPIRED",
            Self::IdentityMismatch => "TOKEN_IDENTITY_MISMATCH",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingToken => "no session token supplied",
            Self::UnknownToken => "session token not recognised",
            Self::Expired => "session token expired",
            Self::IdentityMismatch => "session token belongs to another user",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionValidation {
    Accepted(Session),
    Rejected(RejectionReason),
}

impl SessionValidation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// 拒绝转换为认证错误
    pub fn into_result(self) -> Result<Session, ApplicationError> {
        match self {
            Self::Accepted(session) => Ok(session),
            Self::Rejected(reason) => Err(ApplicationError::Authentication(reason)),
        }
    }
}

#[derive(Clone)]
pub struct SessionValidator {
    sessions: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionValidator {
    pub fn new(sessions: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, clock }
    }

    /// 校验令牌是否属于 `claimed`。
    ///
    /// 存储故障以 `Err` 返回，绝不会被当作接受。
    pub async fn validate(
        &self,
        token: Option<&str>,
        claimed: UserId,
    ) -> Result<SessionValidation, ApplicationError> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(SessionValidation::Rejected(RejectionReason::MissingToken)),
        };

        let Some(session) = self.sessions.find_by_token(token).await? else {
            return Ok(SessionValidation::Rejected(RejectionReason::UnknownToken));
        };

        if session.is_expired(self.clock.now()) {
            return Ok(SessionValidation::Rejected(RejectionReason::Expired));
        }

        if !session.belongs_to(claimed) {
            tracing::warn!(
                claimed = %claimed,
                owner = %session.user_id,
                "session token presented for another identity"
            );
            return Ok(SessionValidation::Rejected(RejectionReason::IdentityMismatch));
        }

        Ok(SessionValidation::Accepted(session))
    }
}

/// 生成新的不透明会话令牌
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    BASE64URL_NOPAD.encode(&bytes)
}

/// 为用户签发会话
pub fn issue_session(user_id: UserId, now: Timestamp, ttl: chrono::Duration) -> Session {
    Session {
        token: generate_token(),
        user_id,
        expires_at: now + ttl,
    }
}
