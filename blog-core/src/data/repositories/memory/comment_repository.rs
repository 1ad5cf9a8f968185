use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::IdTable;
use crate::data::comment_repository::{CommentRepository, NewComment};
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;

#[derive(Debug, Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<IdTable<Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create_comment(&self, input: NewComment) -> Result<Comment, DomainError> {
        let mut comments = self.comments.write();
        let comment = Comment {
            id: comments.next_id(),
            post_id: input.post_id,
            commenter_id: input.commenter_id,
            text: input.text,
            created_at: Utc::now(),
        };
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, DomainError> {
        Ok(self.comments.read().get(id).cloned())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, DomainError> {
        Ok(self.comments.write().remove(id).is_some())
    }

    async fn total_comments(&self) -> Result<i64, DomainError> {
        Ok(self.comments.read().len())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.comments.write().clear();
        Ok(())
    }
}
