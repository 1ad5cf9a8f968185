use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub commenter_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub commenter: String,
    pub post_id: i64,
    pub text: String,
}

pub(crate) fn normalize_comment_text(text: &str) -> Result<String, DomainError> {
    let text = text.trim();
    let len = text.chars().count();
    if len == 0 || len > MAX_COMMENT_CHARS {
        return Err(DomainError::Validation {
            field: "text",
            message: "must be 1..2000 chars",
        });
    }
    Ok(text.to_string())
}
