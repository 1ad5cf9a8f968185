use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub comment_ids: Vec<i64>,
    pub view_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Post {
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }

    pub fn attach_view(&mut self, view_id: i64) {
        self.view_ids.push(view_id);
    }

    pub fn attach_comment(&mut self, comment_id: i64) {
        self.comment_ids.push(comment_id);
    }

    /// Возвращает `false`, если комментария в списке поста не было.
    pub fn detach_comment(&mut self, comment_id: i64) -> bool {
        let before = self.comment_ids.len();
        self.comment_ids.retain(|id| *id != comment_id);
        self.comment_ids.len() != before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub author: String,
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            author: self.author.trim().to_string(),
            title: normalize_title(&self.title)?,
            content: normalize_content(&self.content)?,
        })
    }
}

fn normalize_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(DomainError::Validation {
            field: "title",
            message: "must be 1..255 chars",
        });
    }
    Ok(title.to_string())
}

fn normalize_content(content: &str) -> Result<String, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::Validation {
            field: "content",
            message: "must not be empty",
        });
    }
    Ok(content.to_string())
}
