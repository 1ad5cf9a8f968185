use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::application::comment_service::CommentService;
use crate::application::post_service::PostService;
use crate::application::user_service::UserService;
use crate::application::view_service::ViewService;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::repositories::memory::{
    InMemoryCommentRepository, InMemoryPostRepository, InMemoryUserRepository,
    InMemoryViewRepository,
};
use crate::data::repositories::postgres::{
    PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository,
    PostgresViewRepository,
};
use crate::data::user_repository::UserRepository;
use crate::data::view_repository::ViewRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::database::{create_pool, run_migrations};
use crate::infrastructure::password::{Argon2PasswordHasher, PasswordHasher};
use crate::infrastructure::settings::{Settings, StorageBackend};

/// Набор хранилищ, из которого собираются сервисы.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub views: Arc<dyn ViewRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            comments: Arc::new(InMemoryCommentRepository::new()),
            views: Arc::new(InMemoryViewRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            comments: Arc::new(PostgresCommentRepository::new(pool.clone())),
            views: Arc::new(PostgresViewRepository::new(pool)),
        }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.storage_backend {
            StorageBackend::Memory => {
                warn!("using in-memory storage, data is lost on exit");
                Ok(Self::in_memory())
            }
            StorageBackend::Postgres => {
                let pool = create_pool(
                    settings.require_database_url()?,
                    settings.database_max_connections,
                )
                .await?;
                run_migrations(&pool).await?;
                Ok(Self::postgres(pool))
            }
        }
    }

    /// Очищает все хранилища. Порядок важен для Postgres: посты ссылаются
    /// на пользователей, комментарии и просмотры тоже.
    pub async fn reset(&self) -> Result<(), DomainError> {
        self.views.delete_all().await?;
        self.comments.delete_all().await?;
        self.posts.delete_all().await?;
        self.users.delete_all().await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub view_service: Arc<ViewService>,
}

impl AppState {
    pub fn new(repos: Repositories, hasher: Arc<dyn PasswordHasher>) -> Self {
        let view_service = Arc::new(ViewService::new(repos.views));
        let comment_service = Arc::new(CommentService::new(repos.comments));
        let post_service = Arc::new(PostService::new(
            repos.posts,
            comment_service.clone(),
            view_service.clone(),
        ));
        let user_service = Arc::new(UserService::new(
            repos.users,
            post_service.clone(),
            hasher,
        ));

        Self {
            user_service,
            post_service,
            comment_service,
            view_service,
        }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let repos = Repositories::from_settings(settings).await?;
        let hasher = Argon2PasswordHasher::new(
            settings.password_hash_memory_kib,
            settings.password_hash_iterations,
        )
        .context("invalid password hashing parameters")?;

        info!(backend = %settings.storage_backend, "blog core initialised");
        Ok(Self::new(repos, Arc::new(hasher)))
    }
}
