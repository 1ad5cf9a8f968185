use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    /// Нормализует поля; `username` остаётся в исходном регистре,
    /// каноническая форма вычисляется отдельно через [`canonical_username`].
    pub fn validate(self) -> Result<Self, DomainError> {
        let username = normalize_register_username(&self.username)?;
        let password_len = self.password.chars().count();
        if !(8..=128).contains(&password_len) {
            return Err(DomainError::Validation {
                field: "password",
                message: "must be 8..128 chars",
            });
        }
        Ok(Self {
            username,
            password: self.password,
            first_name: normalize_name("first_name", &self.first_name)?,
            last_name: normalize_name("last_name", &self.last_name)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Self, DomainError> {
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > 64 {
            return Err(DomainError::Validation {
                field: "username",
                message: "must be 1..64 chars",
            });
        }

        if self.password.is_empty() {
            return Err(DomainError::Validation {
                field: "password",
                message: "must not be empty",
            });
        }
        Ok(Self {
            username: username.to_string(),
            password: self.password,
        })
    }
}

/// Состояние сессии пользователя. Меняется только через login/logout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    #[default]
    LoggedOut,
    LoggedIn,
}

impl LoginState {
    pub fn is_logged_in(self) -> bool {
        matches!(self, LoginState::LoggedIn)
    }
}

impl From<bool> for LoginState {
    fn from(logged_in: bool) -> Self {
        if logged_in {
            LoginState::LoggedIn
        } else {
            LoginState::LoggedOut
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Каноническая (lowercase) форма, по ней идёт поиск и проверка уникальности.
    pub username: String,
    /// Логин в том виде, в каком его ввели при регистрации.
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub post_ids: Vec<i64>,
    pub login_state: LoginState,
    pub version: i64,
}

impl User {
    pub fn is_logged_in(&self) -> bool {
        self.login_state.is_logged_in()
    }

    pub fn post_count(&self) -> usize {
        self.post_ids.len()
    }
}

/// Приводит логин к форме, в которой он хранится и ищется.
pub fn canonical_username(username: &str) -> String {
    username.trim().to_lowercase()
}

fn normalize_register_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(DomainError::Validation {
            field: "username",
            message: "must be 3..64 chars",
        });
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DomainError::Validation {
            field: "username",
            message: "must not contain whitespace",
        });
    }
    Ok(username.to_string())
}

fn normalize_name(field: &'static str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > 128 {
        return Err(DomainError::Validation {
            field,
            message: "must be 1..128 chars",
        });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::{LoginRequest, LoginState, RegisterRequest, canonical_username};
    use crate::domain::error::DomainError;

    fn register_request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            first_name: "  Firstname ".to_string(),
            last_name: "Lastname".to_string(),
        }
    }

    #[test]
    fn canonical_username_trims_and_lowercases() {
        assert_eq!(canonical_username("  UserNAME "), "username");
    }

    #[test]
    fn register_keeps_display_casing_and_trims_names() {
        let validated = register_request("  UserName  ", "password")
            .validate()
            .expect("must be valid");
        assert_eq!(validated.username, "UserName");
        assert_eq!(validated.first_name, "Firstname");
    }

    #[test]
    fn register_username_rules_are_applied() {
        assert!(register_request("ab", "password").validate().is_err());
        assert!(register_request("user name", "password").validate().is_err());
        assert!(register_request("valid_user", "password").validate().is_ok());
    }

    #[test]
    fn register_password_length_is_checked() {
        let err = register_request("valid_user", "short")
            .validate()
            .expect_err("short password must be rejected");
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "password",
                ..
            }
        ));
    }

    #[test]
    fn login_rejects_empty_password() {
        let req = LoginRequest {
            username: "username".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_username_length_counts_chars_not_bytes() {
        let username = "п".repeat(40);
        register_request(&username, "password")
            .validate()
            .expect("40 cyrillic chars must be accepted on register");

        let validated = LoginRequest {
            username: username.clone(),
            password: "password".to_string(),
        }
        .validate()
        .expect("40 cyrillic chars must be accepted on login");
        assert_eq!(validated.username, username);

        let too_long = LoginRequest {
            username: "п".repeat(65),
            password: "password".to_string(),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn login_state_defaults_to_logged_out() {
        assert_eq!(LoginState::default(), LoginState::LoggedOut);
        assert!(LoginState::from(true).is_logged_in());
        assert!(!LoginState::from(false).is_logged_in());
    }
}
