use thiserror::Error;

/// Ошибки бизнес-правил и хранилища, которые ядро отдаёт вызывающему коду.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("user is not logged in: {0}")]
    UserNotLoggedIn(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("post not found: {0}")]
    PostNotFound(i64),

    #[error("comment not found: {0}")]
    CommentNotFound(i64),

    #[error("concurrent update conflict: {0}")]
    Conflict(String),

    #[error("unexpected domain error: {0}")]
    Unexpected(String),
}
