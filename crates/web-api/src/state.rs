use std::sync::Arc;

use application::{MessageService, RelayEngine, UserService};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub message_service: Arc<MessageService>,
    pub relay: Arc<RelayEngine>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        message_service: Arc<MessageService>,
        relay: Arc<RelayEngine>,
    ) -> Self {
        Self {
            user_service,
            message_service,
            relay,
        }
    }
}
