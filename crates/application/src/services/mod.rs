mod message_service;
mod user_service;

pub use message_service::MessageService;
pub use user_service::{
    AuthenticateUserRequest, LoginOutcome, RegisterUserRequest, UserService,
    UserServiceDependencies,
};
