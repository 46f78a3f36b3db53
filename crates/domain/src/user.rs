use serde::Serialize;

use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId, Username};

/// 待写入用户存储的注册信息，ID 由存储分配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: Username,
    pub email: UserEmail,
    pub password: PasswordHash,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: UserEmail,
    pub password: PasswordHash,
    pub avatar: Option<String>,
    pub deactivated: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn is_active(&self) -> bool {
        !self.deactivated
    }

    pub fn profile(&self, status: PresenceStatus) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.as_str().to_owned(),
            email: self.email.as_str().to_owned(),
            avatar: self.avatar.clone(),
            status,
        }
    }
}

/// 对外可见的在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// 公开的用户信息（不含密码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub status: PresenceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serializes_lowercase_status_without_password() {
        let user = User {
            id: UserId::new(7),
            username: Username::parse("bob").unwrap(),
            email: UserEmail::parse("bob@example.com").unwrap(),
            password: PasswordHash::new("hash").unwrap(),
            avatar: None,
            deactivated: false,
            created_at: chrono::Utc::now(),
        };

        let json = serde_json::to_value(user.profile(PresenceStatus::Offline)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["status"], "offline");
        assert!(json.get("password").is_none());
    }
}
