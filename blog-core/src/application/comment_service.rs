use std::sync::Arc;

use tracing::{debug, info};

use crate::data::comment_repository::{CommentRepository, NewComment};
use crate::domain::comment::{Comment, normalize_comment_text};
use crate::domain::error::DomainError;

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    pub async fn save_comment(
        &self,
        post_id: i64,
        commenter_id: i64,
        text: &str,
    ) -> Result<Comment, DomainError> {
        let text = normalize_comment_text(text)?;
        let comment = self
            .repo
            .create_comment(NewComment {
                post_id,
                commenter_id,
                text,
            })
            .await?;
        debug!(comment_id = comment.id, post_id, commenter_id, "comment saved");
        Ok(comment)
    }

    pub async fn find_by_id(&self, comment_id: i64) -> Result<Comment, DomainError> {
        self.repo
            .get_comment(comment_id)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))
    }

    /// Удаляет комментарий и возвращает удалённую запись.
    pub async fn delete_comment(&self, comment_id: i64) -> Result<Comment, DomainError> {
        let comment = self.find_by_id(comment_id).await?;
        if !self.repo.delete_comment(comment_id).await? {
            return Err(DomainError::CommentNotFound(comment_id));
        }
        info!(comment_id, post_id = comment.post_id, "comment deleted");
        Ok(comment)
    }

    pub async fn count_comments(&self) -> Result<i64, DomainError> {
        self.repo.total_comments().await
    }
}
