//! Хранилище в памяти процесса: для тестов и эфемерных запусков.

use std::collections::HashMap;

pub mod comment_repository;
pub mod post_repository;
pub mod user_repository;
pub mod view_repository;

pub use comment_repository::InMemoryCommentRepository;
pub use post_repository::InMemoryPostRepository;
pub use user_repository::InMemoryUserRepository;
pub use view_repository::InMemoryViewRepository;

/// Таблица с автоинкрементным `i64` ключом, аналог `BIGSERIAL`.
#[derive(Debug)]
pub(crate) struct IdTable<T> {
    last_id: i64,
    rows: HashMap<i64, T>,
}

impl<T> Default for IdTable<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: HashMap::new(),
        }
    }
}

impl<T> IdTable<T> {
    pub(crate) fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    pub(crate) fn insert(&mut self, id: i64, row: T) {
        self.rows.insert(id, row);
    }

    pub(crate) fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    pub(crate) fn len(&self) -> i64 {
        self.rows.len() as i64
    }

    /// Очищает строки, но не сбрасывает счётчик: id не переиспользуются.
    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }
}
