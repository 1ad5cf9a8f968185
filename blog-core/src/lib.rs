//! Ядро блога: регистрация и вход пользователей, посты, комментарии и просмотры.
//!
//! Сервисы собраны снизу вверх:
//! - `ViewService`, `CommentService` сохраняют свои записи;
//! - `PostService` прикрепляет их к посту;
//! - `UserService` проверяет сессию и авторство и ведёт список постов пользователя.
//!
//! Хранилище подключается через трейты из [`data`]; есть реализация в памяти
//! и на PostgreSQL. Всё собирается в [`state::AppState`] при старте процесса.

pub mod application;
pub mod data;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use application::post_service::{CommentPostResult, DeleteCommentResult, ViewPostResult};
pub use domain::comment::{AddCommentRequest, Comment};
pub use domain::error::DomainError;
pub use domain::post::{CreatePostRequest, Post};
pub use domain::user::{LoginRequest, LoginState, RegisterRequest, User};
pub use domain::view::View;
pub use state::{AppState, Repositories};
