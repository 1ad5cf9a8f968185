use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::MAX_SAVE_ATTEMPTS;
use super::comment_service::CommentService;
use super::view_service::ViewService;
use crate::data::post_repository::{NewPost, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::user::User;

#[derive(Debug, Clone, Serialize)]
pub struct ViewPostResult {
    pub view_id: i64,
    pub viewer_id: i64,
    pub viewer_name: String,
    pub post_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentPostResult {
    pub post_id: i64,
    pub post_title: String,
    pub comment_id: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteCommentResult {
    pub post_id: i64,
    pub comment_id: i64,
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    comments: Arc<CommentService>,
    views: Arc<ViewService>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        comments: Arc<CommentService>,
        views: Arc<ViewService>,
    ) -> Self {
        Self {
            repo,
            comments,
            views,
        }
    }

    pub async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let post = self.repo.create_post(input).await?;
        debug!(post_id = post.id, author_id = post.author_id, "post stored");
        Ok(post)
    }

    pub async fn find_by_id(&self, post_id: i64) -> Result<Post, DomainError> {
        self.repo
            .get_post(post_id)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))
    }

    pub async fn delete_post(&self, post: &Post) -> Result<(), DomainError> {
        if !self.repo.delete_post(post.id).await? {
            return Err(DomainError::PostNotFound(post.id));
        }
        Ok(())
    }

    pub async fn count_posts(&self) -> Result<i64, DomainError> {
        self.repo.total_posts().await
    }

    pub async fn add_view(
        &self,
        post_id: i64,
        viewer: &User,
    ) -> Result<ViewPostResult, DomainError> {
        let post = self.find_by_id(post_id).await?;
        let view = self.views.save_view(post.id, viewer.id).await?;

        let post = self
            .update_post(post, |post| {
                post.attach_view(view.id);
                Ok(())
            })
            .await?;

        Ok(ViewPostResult {
            view_id: view.id,
            viewer_id: viewer.id,
            viewer_name: viewer.display_name.clone(),
            post_title: post.title,
        })
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        commenter: &User,
        text: &str,
    ) -> Result<CommentPostResult, DomainError> {
        let post = self.find_by_id(post_id).await?;
        let comment = self
            .comments
            .save_comment(post.id, commenter.id, text)
            .await?;

        let attached = self
            .update_post(post, |post| {
                post.attach_comment(comment.id);
                Ok(())
            })
            .await;
        let post = match attached {
            Ok(post) => post,
            Err(err) => {
                warn!(comment_id = comment.id, error = %err, "failed to attach comment, removing it");
                if let Err(cleanup_err) = self.comments.delete_comment(comment.id).await {
                    error!(comment_id = comment.id, error = %cleanup_err, "orphan comment left behind");
                }
                return Err(err);
            }
        };

        info!(post_id = post.id, comment_id = comment.id, "comment added to post");
        Ok(CommentPostResult {
            post_id: post.id,
            post_title: post.title,
            comment_id: comment.id,
            comment: comment.text,
        })
    }

    pub async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<DeleteCommentResult, DomainError> {
        let post = self.find_by_id(post_id).await?;
        let comment = self.comments.find_by_id(comment_id).await?;
        if comment.post_id != post.id {
            return Err(DomainError::CommentNotFound(comment_id));
        }

        // id снимаем с поста до удаления самой записи комментария
        let was_attached = post.comment_ids.contains(&comment.id);
        self.update_post(post, |post| {
            post.detach_comment(comment.id);
            Ok(())
        })
        .await?;

        match self.comments.delete_comment(comment.id).await {
            Ok(_) => {}
            Err(DomainError::CommentNotFound(_)) => {
                debug!(comment_id = comment.id, "comment already removed by a concurrent delete");
            }
            Err(err) => {
                warn!(comment_id = comment.id, error = %err, "failed to delete comment, reattaching it");
                if was_attached
                    && let Err(restore_err) = self.reattach_comment(post_id, comment.id).await
                {
                    error!(comment_id = comment.id, error = %restore_err, "comment left detached from post");
                }
                return Err(err);
            }
        }

        info!(post_id, comment_id = comment.id, "comment removed from post");
        Ok(DeleteCommentResult {
            post_id,
            comment_id: comment.id,
        })
    }

    async fn reattach_comment(&self, post_id: i64, comment_id: i64) -> Result<Post, DomainError> {
        let post = self.find_by_id(post_id).await?;
        self.update_post(post, |post| {
            if !post.comment_ids.contains(&comment_id) {
                post.attach_comment(comment_id);
            }
            Ok(())
        })
        .await
    }

    /// Read-modify-write с оптимистичной блокировкой: при `Conflict` пост
    /// перечитывается и `mutate` применяется заново к свежей копии.
    async fn update_post<F>(&self, mut post: Post, mutate: F) -> Result<Post, DomainError>
    where
        F: Fn(&mut Post) -> Result<(), DomainError> + Send,
    {
        let mut attempt = 1;
        loop {
            mutate(&mut post)?;
            match self.repo.save_post(&post).await {
                Err(DomainError::Conflict(reason)) if attempt < MAX_SAVE_ATTEMPTS => {
                    warn!(post_id = post.id, attempt, %reason, "post changed concurrently, retrying");
                    attempt += 1;
                    post = self.find_by_id(post.id).await?;
                }
                result => return result,
            }
        }
    }
}
