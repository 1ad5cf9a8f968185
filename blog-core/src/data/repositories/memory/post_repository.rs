use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::IdTable;
use crate::data::post_repository::{NewPost, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::Post;

#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<IdTable<Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let mut posts = self.posts.write();
        let now = Utc::now();
        let post = Post {
            id: posts.next_id(),
            title: input.title,
            content: input.content,
            author_id: input.author_id,
            comment_ids: Vec::new(),
            view_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
        Ok(self.posts.read().get(id).cloned())
    }

    async fn save_post(&self, post: &Post) -> Result<Post, DomainError> {
        let mut posts = self.posts.write();
        let stored = posts
            .get_mut(post.id)
            .ok_or(DomainError::PostNotFound(post.id))?;

        if stored.version != post.version {
            return Err(DomainError::Conflict(format!(
                "post id: {} (expected version {}, stored {})",
                post.id, post.version, stored.version
            )));
        }

        *stored = Post {
            version: post.version + 1,
            updated_at: Utc::now(),
            created_at: stored.created_at,
            ..post.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DomainError> {
        Ok(self.posts.write().remove(id).is_some())
    }

    async fn total_posts(&self) -> Result<i64, DomainError> {
        Ok(self.posts.read().len())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.posts.write().clear();
        Ok(())
    }
}
