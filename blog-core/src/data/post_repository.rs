use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::post::Post;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: i64,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError>;
    /// Compare-and-swap по `version`: `Conflict` при расхождении,
    /// `PostNotFound` если поста уже нет.
    async fn save_post(&self, post: &Post) -> Result<Post, DomainError>;
    async fn delete_post(&self, id: i64) -> Result<bool, DomainError>;
    async fn total_posts(&self) -> Result<i64, DomainError>;
    async fn delete_all(&self) -> Result<(), DomainError>;
}
