use std::sync::Arc;

use tracing::debug;

use crate::data::view_repository::{NewView, ViewRepository};
use crate::domain::error::DomainError;
use crate::domain::view::View;

pub struct ViewService {
    repo: Arc<dyn ViewRepository>,
}

impl ViewService {
    pub fn new(repo: Arc<dyn ViewRepository>) -> Self {
        Self { repo }
    }

    pub async fn save_view(&self, post_id: i64, viewer_id: i64) -> Result<View, DomainError> {
        let view = self
            .repo
            .create_view(NewView { post_id, viewer_id })
            .await?;
        debug!(view_id = view.id, post_id, viewer_id, "view recorded");
        Ok(view)
    }

    pub async fn count_views(&self) -> Result<i64, DomainError> {
        self.repo.total_views().await
    }
}
