pub mod comment_service;
pub mod post_service;
pub mod user_service;
pub mod view_service;

/// Сколько раз сервис перечитывает агрегат и повторяет сохранение,
/// если хранилище ответило `Conflict` (версия записи успела измениться).
pub const MAX_SAVE_ATTEMPTS: u32 = 3;
