use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
use crate::domain::error::DomainError;
use crate::domain::user::{LoginState, User};

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<UserTable>,
}

#[derive(Debug, Default)]
struct UserTable {
    last_id: i64,
    // ключ: канонический логин
    by_username: HashMap<String, UserCredentials>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
        let mut users = self.users.write();
        if users.by_username.contains_key(&input.username) {
            return Err(DomainError::UserAlreadyExists(input.display_name));
        }

        users.last_id += 1;
        let user = User {
            id: users.last_id,
            username: input.username,
            display_name: input.display_name,
            first_name: input.first_name,
            last_name: input.last_name,
            created_at: Utc::now(),
            post_ids: Vec::new(),
            login_state: LoginState::LoggedOut,
            version: 0,
        };
        users.by_username.insert(
            user.username.clone(),
            UserCredentials {
                user: user.clone(),
                password_hash: input.password_hash,
            },
        );
        Ok(user)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DomainError> {
        Ok(self.users.read().by_username.get(username).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<User, DomainError> {
        let mut users = self.users.write();
        let stored = users
            .by_username
            .get_mut(&user.username)
            .filter(|creds| creds.user.id == user.id)
            .ok_or_else(|| DomainError::UserNotFound(user.display_name.clone()))?;

        if stored.user.version != user.version {
            return Err(DomainError::Conflict(format!(
                "user: {} (expected version {}, stored {})",
                user.username, user.version, stored.user.version
            )));
        }

        stored.user.post_ids = user.post_ids.clone();
        stored.user.login_state = user.login_state;
        stored.user.version += 1;
        Ok(stored.user.clone())
    }

    async fn total_users(&self) -> Result<i64, DomainError> {
        Ok(self.users.read().by_username.len() as i64)
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.users.write().by_username.clear();
        Ok(())
    }
}
