use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::IdTable;
use crate::data::view_repository::{NewView, ViewRepository};
use crate::domain::error::DomainError;
use crate::domain::view::View;

#[derive(Debug, Default)]
pub struct InMemoryViewRepository {
    views: RwLock<IdTable<View>>,
}

impl InMemoryViewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewRepository for InMemoryViewRepository {
    async fn create_view(&self, input: NewView) -> Result<View, DomainError> {
        let mut views = self.views.write();
        let view = View {
            id: views.next_id(),
            post_id: input.post_id,
            viewer_id: input.viewer_id,
            created_at: Utc::now(),
        };
        views.insert(view.id, view.clone());
        Ok(view)
    }

    async fn total_views(&self) -> Result<i64, DomainError> {
        Ok(self.views.read().len())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.views.write().clear();
        Ok(())
    }
}
