use crate::value_objects::{Timestamp, UserId};

/// 登录时签发的会话：不透明令牌绑定到一个用户，并带有过期时间。
///
/// 过期只在校验时惰性判断，没有主动清理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: Timestamp,
}

impl Session {
    /// `expires_at <= now` 即视为过期
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
