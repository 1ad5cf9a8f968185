pub mod comment_repository;
pub mod post_repository;
pub mod user_repository;
pub mod view_repository;

pub use comment_repository::PostgresCommentRepository;
pub use post_repository::PostgresPostRepository;
pub use user_repository::PostgresUserRepository;
pub use view_repository::PostgresViewRepository;

use crate::domain::error::DomainError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Общий маппинг ошибок sqlx: всё, что не распознано адаптером, уходит в `Unexpected`.
pub(crate) fn map_db_error(err: sqlx::Error) -> DomainError {
    DomainError::Unexpected(err.to_string())
}

pub(crate) fn db_error_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    db_error_code(err).as_deref() == Some(UNIQUE_VIOLATION)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    db_error_code(err).as_deref() == Some(FOREIGN_KEY_VIOLATION)
}
