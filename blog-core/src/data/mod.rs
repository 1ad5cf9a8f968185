pub mod comment_repository;
pub mod post_repository;
pub mod repositories;
pub mod user_repository;
pub mod view_repository;
