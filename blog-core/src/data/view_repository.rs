use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::view::View;

#[derive(Debug, Clone, Copy)]
pub struct NewView {
    pub post_id: i64,
    pub viewer_id: i64,
}

#[async_trait]
pub trait ViewRepository: Send + Sync {
    async fn create_view(&self, input: NewView) -> Result<View, DomainError>;
    async fn total_views(&self) -> Result<i64, DomainError>;
    async fn delete_all(&self) -> Result<(), DomainError>;
}
