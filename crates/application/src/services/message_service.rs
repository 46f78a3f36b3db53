use std::sync::Arc;

use domain::{Message, UserId};

use crate::{error::ApplicationError, repository::MessageRepository};

/// 历史消息查询
pub struct MessageService {
    message_repository: Arc<dyn MessageRepository>,
}

impl MessageService {
    pub fn new(message_repository: Arc<dyn MessageRepository>) -> Self {
        Self { message_repository }
    }

    /// 只返回 `sender -> receiver` 方向的消息，不合并反方向
    pub async fn history(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        let messages = self.message_repository.history(sender, receiver).await?;
        tracing::debug!(sender = %sender, receiver_id = %receiver, count = messages.len(), "history loaded");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockMessageRepository;
    use domain::RepositoryError;

    #[tokio::test]
    async fn storage_failure_surfaces_as_store_unavailable() {
        let mut repository = MockMessageRepository::new();
        repository
            .expect_history()
            .returning(|_, _| Err(RepositoryError::storage("timeout")));
        let service = MessageService::new(Arc::new(repository));

        let err = service
            .history(UserId::new(1), UserId::new(2))
            .await
            .unwrap_err();
        assert!(err.is_store_unavailable());
    }
}
