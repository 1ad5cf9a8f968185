use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    /// Каноническая форма логина.
    pub username: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Падает с `UserAlreadyExists`, если канонический логин уже занят.
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError>;
    async fn find_by_username(&self, username: &str)
    -> Result<Option<UserCredentials>, DomainError>;
    /// Сохраняет пост-лист и состояние входа. Версия `user` должна совпадать
    /// с хранимой, иначе `Conflict`; возвращает запись с новой версией.
    async fn save_user(&self, user: &User) -> Result<User, DomainError>;
    async fn total_users(&self) -> Result<i64, DomainError>;
    async fn delete_all(&self) -> Result<(), DomainError>;
}
