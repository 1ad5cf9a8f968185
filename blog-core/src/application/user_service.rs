use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::MAX_SAVE_ATTEMPTS;
use super::post_service::{CommentPostResult, DeleteCommentResult, PostService, ViewPostResult};
use crate::data::post_repository::NewPost;
use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
use crate::domain::comment::AddCommentRequest;
use crate::domain::error::DomainError;
use crate::domain::post::{CreatePostRequest, Post};
use crate::domain::user::{LoginRequest, LoginState, RegisterRequest, User, canonical_username};
use crate::infrastructure::password::PasswordHasher;

/// Регистрация и вход пользователей, а также все действия над постами,
/// которые требуют проверки сессии или авторства.
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    posts: Arc<PostService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        posts: Arc<PostService>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            repo,
            posts,
            hasher,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, DomainError> {
        let req = req.validate()?;
        let username = canonical_username(&req.username);

        if self.repo.find_by_username(&username).await?.is_some() {
            return Err(DomainError::UserAlreadyExists(req.username));
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .repo
            .create_user(NewUser {
                username,
                display_name: req.username,
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<User, DomainError> {
        let req = req.validate()?;
        let creds = self.find_credentials(&req.username).await?;
        self.hasher.verify(&req.password, &creds.password_hash)?;

        let user = self
            .update_user(creds.user, |user| {
                user.login_state = LoginState::LoggedIn;
                Ok(())
            })
            .await?;

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    pub async fn logout(&self, username: &str) -> Result<User, DomainError> {
        let user = self.find_user_by_name(username).await?;
        let user = self
            .update_user(user, |user| {
                user.login_state = LoginState::LoggedOut;
                Ok(())
            })
            .await?;

        info!(user_id = user.id, "user logged out");
        Ok(user)
    }

    /// Неизвестный пользователь считается не вошедшим, это не ошибка.
    pub async fn is_logged_in(&self, username: &str) -> Result<bool, DomainError> {
        let creds = self
            .repo
            .find_by_username(&canonical_username(username))
            .await?;
        Ok(creds.is_some_and(|creds| creds.user.is_logged_in()))
    }

    pub async fn create_post(&self, req: CreatePostRequest) -> Result<Post, DomainError> {
        let req = req.validate()?;
        let author = self.find_user_by_name(&req.author).await?;
        ensure_logged_in(&author)?;

        let post = self
            .posts
            .create_post(NewPost {
                title: req.title,
                content: req.content,
                author_id: author.id,
            })
            .await?;

        let attached = self
            .update_user(author, |user| {
                ensure_logged_in(user)?;
                user.post_ids.push(post.id);
                Ok(())
            })
            .await;

        // пост без ссылки у автора удаляем, чтобы счётчики не разошлись
        if let Err(err) = attached {
            warn!(post_id = post.id, error = %err, "failed to attach post to author, removing it");
            if let Err(cleanup_err) = self.posts.delete_post(&post).await {
                error!(post_id = post.id, error = %cleanup_err, "orphan post left behind");
            }
            return Err(err);
        }

        info!(post_id = post.id, author_id = post.author_id, "post created");
        Ok(post)
    }

    /// Удалить пост может только его автор; пост пропадает и из хранилища,
    /// и из списка постов пользователя.
    pub async fn delete_post(&self, author: &str, post_id: i64) -> Result<Post, DomainError> {
        let user = self.find_user_by_name(author).await?;
        let post = self.posts.find_by_id(post_id).await?;

        if !post.is_authored_by(user.id) {
            warn!(post_id, user_id = user.id, "refused to delete post of another author");
            return Err(DomainError::Unauthorized);
        }

        // ссылку у автора убираем до удаления самого поста
        let was_listed = user.post_ids.contains(&post_id);
        self.update_user(user, |user| {
            user.post_ids.retain(|id| *id != post_id);
            Ok(())
        })
        .await?;

        match self.posts.delete_post(&post).await {
            Ok(()) => {}
            Err(DomainError::PostNotFound(_)) => {
                debug!(post_id, "post already removed by a concurrent delete");
            }
            Err(err) => {
                warn!(post_id, error = %err, "failed to delete post, restoring author link");
                if was_listed {
                    self.restore_post_link(author, post_id).await;
                }
                return Err(err);
            }
        }

        info!(post_id, author_id = post.author_id, "post deleted");
        Ok(post)
    }

    pub async fn view_post(
        &self,
        viewer: &str,
        post_id: i64,
    ) -> Result<ViewPostResult, DomainError> {
        let viewer = self.find_user_by_name(viewer).await?;
        ensure_logged_in(&viewer)?;
        self.posts.add_view(post_id, &viewer).await
    }

    pub async fn add_comment(
        &self,
        req: AddCommentRequest,
    ) -> Result<CommentPostResult, DomainError> {
        let commenter = self.find_user_by_name(&req.commenter).await?;
        ensure_logged_in(&commenter)?;
        self.posts
            .add_comment(req.post_id, &commenter, &req.text)
            .await
    }

    pub async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<DeleteCommentResult, DomainError> {
        self.posts.delete_comment(post_id, comment_id).await
    }

    pub async fn count_users(&self) -> Result<i64, DomainError> {
        self.repo.total_users().await
    }

    pub async fn find_user_by_name(&self, username: &str) -> Result<User, DomainError> {
        Ok(self.find_credentials(username).await?.user)
    }

    pub async fn count_posts_of(&self, username: &str) -> Result<usize, DomainError> {
        Ok(self.find_user_by_name(username).await?.post_count())
    }

    async fn find_credentials(&self, username: &str) -> Result<UserCredentials, DomainError> {
        self.repo
            .find_by_username(&canonical_username(username))
            .await?
            .ok_or_else(|| DomainError::UserNotFound(username.trim().to_string()))
    }

    async fn restore_post_link(&self, author: &str, post_id: i64) {
        let restored = match self.find_user_by_name(author).await {
            Ok(user) => {
                self.update_user(user, |user| {
                    if !user.post_ids.contains(&post_id) {
                        user.post_ids.push(post_id);
                    }
                    Ok(())
                })
                .await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = restored {
            error!(post_id, error = %err, "post left without author link");
        }
    }

    /// То же, что `PostService::update_post`, но для пользователя.
    async fn update_user<F>(&self, mut user: User, mutate: F) -> Result<User, DomainError>
    where
        F: Fn(&mut User) -> Result<(), DomainError> + Send,
    {
        let mut attempt = 1;
        loop {
            mutate(&mut user)?;
            match self.repo.save_user(&user).await {
                Err(DomainError::Conflict(reason)) if attempt < MAX_SAVE_ATTEMPTS => {
                    warn!(user_id = user.id, attempt, %reason, "user changed concurrently, retrying");
                    attempt += 1;
                    user = self.find_user_by_name(&user.username).await?;
                }
                result => return result,
            }
        }
    }
}

fn ensure_logged_in(user: &User) -> Result<(), DomainError> {
    if user.is_logged_in() {
        Ok(())
    } else {
        Err(DomainError::UserNotLoggedIn(user.display_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::data::repositories::memory::InMemoryUserRepository;
    use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
    use crate::domain::comment::AddCommentRequest;
    use crate::domain::error::DomainError;
    use crate::domain::post::CreatePostRequest;
    use crate::domain::user::{LoginRequest, RegisterRequest, User};
    use crate::infrastructure::password::Argon2PasswordHasher;
    use crate::state::{AppState, Repositories};

    /// Пользовательский репозиторий, у которого можно «сломать» сохранение.
    #[derive(Clone)]
    struct FlakyUserRepo {
        inner: Arc<InMemoryUserRepository>,
        fail_saves: Arc<Mutex<bool>>,
    }

    impl FlakyUserRepo {
        fn new() -> Self {
            Self {
                inner: Arc::new(InMemoryUserRepository::new()),
                fail_saves: Arc::new(Mutex::new(false)),
            }
        }

        fn set_fail_saves(&self, fail: bool) {
            *self.fail_saves.lock().expect("fail_saves mutex poisoned") = fail;
        }
    }

    #[async_trait]
    impl UserRepository for FlakyUserRepo {
        async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
            self.inner.create_user(input).await
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserCredentials>, DomainError> {
            self.inner.find_by_username(username).await
        }

        async fn save_user(&self, user: &User) -> Result<User, DomainError> {
            let fail = *self.fail_saves.lock().expect("fail_saves mutex poisoned");
            if fail {
                return Err(DomainError::Unexpected("storage unavailable".to_string()));
            }
            self.inner.save_user(user).await
        }

        async fn total_users(&self) -> Result<i64, DomainError> {
            self.inner.total_users().await
        }

        async fn delete_all(&self) -> Result<(), DomainError> {
            self.inner.delete_all().await
        }
    }

    fn test_hasher() -> Arc<Argon2PasswordHasher> {
        Arc::new(Argon2PasswordHasher::new(8, 1).expect("params must be valid"))
    }

    fn app() -> AppState {
        AppState::new(Repositories::in_memory(), test_hasher())
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            username: "username".to_string(),
            password: "password".to_string(),
            first_name: "Firstname".to_string(),
            last_name: "Lastname".to_string(),
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn create_post_request() -> CreatePostRequest {
        CreatePostRequest {
            author: "username".to_string(),
            title: "Title".to_string(),
            content: "Content".to_string(),
        }
    }

    async fn logged_in_user(app: &AppState) -> User {
        app.user_service
            .register(register_request())
            .await
            .expect("register must succeed");
        app.user_service
            .login(login_request("username", "password"))
            .await
            .expect("login must succeed")
    }

    #[tokio::test]
    async fn register_one_user_user_count_is_one() {
        let app = app();
        let user = app
            .user_service
            .register(register_request())
            .await
            .expect("register must succeed");

        assert_eq!(app.user_service.count_users().await.expect("count"), 1);
        assert!(!user.is_logged_in());
        assert_eq!(user.post_count(), 0);
    }

    #[tokio::test]
    async fn register_same_username_in_any_case_fails() {
        let app = app();
        app.user_service
            .register(register_request())
            .await
            .expect("register must succeed");

        let mut shouted = register_request();
        shouted.username = "USERNAME".to_string();
        let err = app
            .user_service
            .register(shouted)
            .await
            .expect_err("duplicate must be rejected");

        assert!(matches!(err, DomainError::UserAlreadyExists(_)));
        assert_eq!(app.user_service.count_users().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn login_is_case_insensitive() {
        let app = app();
        app.user_service
            .register(register_request())
            .await
            .expect("register must succeed");
        assert!(!app.user_service.is_logged_in("username").await.expect("lookup"));

        app.user_service
            .login(login_request("userNAME", "password"))
            .await
            .expect("login must succeed");

        assert!(app.user_service.is_logged_in("useRNAME").await.expect("lookup"));
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let app = app();
        app.user_service
            .register(register_request())
            .await
            .expect("register must succeed");

        let err = app
            .user_service
            .login(login_request("userNAME", "wrongPassword"))
            .await
            .expect_err("login must fail");

        assert!(matches!(err, DomainError::InvalidPassword));
        assert!(!app.user_service.is_logged_in("username").await.expect("lookup"));
    }

    #[tokio::test]
    async fn login_of_unknown_user_fails() {
        let err = app()
            .user_service
            .login(login_request("ghost", "password"))
            .await
            .expect_err("login must fail");
        assert!(matches!(err, DomainError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn logout_clears_login_state() {
        let app = app();
        logged_in_user(&app).await;

        app.user_service
            .logout("UserName")
            .await
            .expect("logout must succeed");
        assert!(!app.user_service.is_logged_in("username").await.expect("lookup"));

        let err = app
            .user_service
            .logout("ghost")
            .await
            .expect_err("logout of unknown user must fail");
        assert!(matches!(err, DomainError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn is_logged_in_is_false_for_unknown_user() {
        assert!(!app().user_service.is_logged_in("ghost").await.expect("lookup"));
    }

    #[tokio::test]
    async fn create_post_requires_login() {
        let app = app();
        app.user_service
            .register(register_request())
            .await
            .expect("register must succeed");

        let err = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect_err("create_post must fail");

        assert!(matches!(err, DomainError::UserNotLoggedIn(_)));
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 0);
        assert_eq!(app.post_service.count_posts().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn create_post_for_unknown_author_fails() {
        let mut req = create_post_request();
        req.author = "ghost".to_string();

        let err = app()
            .user_service
            .create_post(req)
            .await
            .expect_err("create_post must fail");
        assert!(matches!(err, DomainError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn create_post_updates_user_and_global_counts() {
        let app = app();
        logged_in_user(&app).await;

        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 1);
        assert_eq!(app.post_service.count_posts().await.expect("count"), 1);

        let user = app
            .user_service
            .find_user_by_name("USERNAME")
            .await
            .expect("user must exist");
        assert_eq!(user.post_ids, vec![post.id]);
        assert_eq!(post.author_id, user.id);
    }

    #[tokio::test]
    async fn three_posts_are_all_listed_on_user() {
        let app = app();
        logged_in_user(&app).await;

        for _ in 0..3 {
            app.user_service
                .create_post(create_post_request())
                .await
                .expect("create_post must succeed");
        }

        let user = app
            .user_service
            .find_user_by_name("username")
            .await
            .expect("user must exist");
        assert_eq!(user.post_ids.len(), 3);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 3);
    }

    #[tokio::test]
    async fn author_can_delete_post() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        let deleted = app
            .user_service
            .delete_post("username", post.id)
            .await
            .expect("delete_post must succeed");

        assert_eq!(deleted.id, post.id);
        assert_eq!(app.post_service.count_posts().await.expect("count"), 0);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 0);

        let err = app
            .user_service
            .delete_post("username", post.id)
            .await
            .expect_err("second delete must fail");
        assert!(matches!(err, DomainError::PostNotFound(_)));
    }

    #[tokio::test]
    async fn non_author_cannot_delete_post() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        let mut other = register_request();
        other.username = "other_user".to_string();
        app.user_service
            .register(other)
            .await
            .expect("register must succeed");

        let err = app
            .user_service
            .delete_post("other_user", post.id)
            .await
            .expect_err("must be unauthorized");

        assert!(matches!(err, DomainError::Unauthorized));
        assert_eq!(app.post_service.count_posts().await.expect("count"), 1);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 1);
    }

    #[tokio::test]
    async fn user_can_view_post() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");
        assert!(post.view_ids.is_empty());

        let result = app
            .user_service
            .view_post("username", post.id)
            .await
            .expect("view_post must succeed");

        assert_eq!(result.post_title, "Title");
        assert_eq!(result.viewer_name, "username");
        let post = app.post_service.find_by_id(post.id).await.expect("post exists");
        assert_eq!(post.view_ids.len(), 1);
        assert_eq!(app.view_service.count_views().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn viewing_requires_login() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");
        app.user_service
            .logout("username")
            .await
            .expect("logout must succeed");

        let err = app
            .user_service
            .view_post("username", post.id)
            .await
            .expect_err("view must be refused");

        assert!(matches!(err, DomainError::UserNotLoggedIn(_)));
        assert_eq!(app.view_service.count_views().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn user_can_comment_and_delete_comment() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        let added = app
            .user_service
            .add_comment(AddCommentRequest {
                commenter: "username".to_string(),
                post_id: post.id,
                text: "Comment on this post".to_string(),
            })
            .await
            .expect("add_comment must succeed");

        let stored = app.post_service.find_by_id(post.id).await.expect("post exists");
        assert_eq!(stored.comment_ids, vec![added.comment_id]);
        assert_eq!(app.comment_service.count_comments().await.expect("count"), 1);

        let comment = app
            .comment_service
            .find_by_id(stored.comment_ids[0])
            .await
            .expect("comment exists");
        app.user_service
            .delete_comment(post.id, comment.id)
            .await
            .expect("delete_comment must succeed");

        let stored = app.post_service.find_by_id(post.id).await.expect("post exists");
        assert!(stored.comment_ids.is_empty());
        assert_eq!(app.comment_service.count_comments().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn commenting_on_missing_post_fails() {
        let app = app();
        logged_in_user(&app).await;

        let err = app
            .user_service
            .add_comment(AddCommentRequest {
                commenter: "username".to_string(),
                post_id: 404,
                text: "hello".to_string(),
            })
            .await
            .expect_err("post must be missing");

        assert!(matches!(err, DomainError::PostNotFound(404)));
        assert_eq!(app.comment_service.count_comments().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn failed_attach_to_author_removes_new_post() {
        let users = FlakyUserRepo::new();
        let repos = Repositories {
            users: Arc::new(users.clone()),
            ..Repositories::in_memory()
        };
        let app = AppState::new(repos, test_hasher());
        logged_in_user(&app).await;

        users.set_fail_saves(true);
        let err = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect_err("create_post must fail");

        assert!(matches!(err, DomainError::Unexpected(_)));
        assert_eq!(app.post_service.count_posts().await.expect("count"), 0);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn login_accepts_multibyte_username_that_registered() {
        let app = app();
        let username = "п".repeat(40);
        let mut req = register_request();
        req.username = username.clone();
        app.user_service
            .register(req)
            .await
            .expect("register must succeed");

        let user = app
            .user_service
            .login(login_request(&username, "password"))
            .await
            .expect("login must succeed");

        assert!(user.is_logged_in());
        assert_eq!(user.display_name, username);
    }

    #[tokio::test]
    async fn commenting_requires_login() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");
        app.user_service
            .logout("username")
            .await
            .expect("logout must succeed");

        let err = app
            .user_service
            .add_comment(AddCommentRequest {
                commenter: "username".to_string(),
                post_id: post.id,
                text: "hello".to_string(),
            })
            .await
            .expect_err("comment must be refused");

        assert!(matches!(err, DomainError::UserNotLoggedIn(_)));
        assert_eq!(app.comment_service.count_comments().await.expect("count"), 0);
        let stored = app.post_service.find_by_id(post.id).await.expect("post exists");
        assert!(stored.comment_ids.is_empty());
    }

    #[tokio::test]
    async fn commenting_as_unknown_user_fails() {
        let app = app();
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        let err = app
            .user_service
            .add_comment(AddCommentRequest {
                commenter: "ghost".to_string(),
                post_id: post.id,
                text: "hello".to_string(),
            })
            .await
            .expect_err("unknown commenter must be rejected");

        assert!(matches!(err, DomainError::UserNotFound(_)));
        assert_eq!(app.comment_service.count_comments().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn failed_detach_from_author_keeps_post() {
        let users = FlakyUserRepo::new();
        let repos = Repositories {
            users: Arc::new(users.clone()),
            ..Repositories::in_memory()
        };
        let app = AppState::new(repos, test_hasher());
        logged_in_user(&app).await;
        let post = app
            .user_service
            .create_post(create_post_request())
            .await
            .expect("create_post must succeed");

        users.set_fail_saves(true);
        let err = app
            .user_service
            .delete_post("username", post.id)
            .await
            .expect_err("delete_post must fail");

        assert!(matches!(err, DomainError::Unexpected(_)));
        assert_eq!(app.post_service.count_posts().await.expect("count"), 1);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 1);
        app.post_service
            .find_by_id(post.id)
            .await
            .expect("post must still exist");

        users.set_fail_saves(false);
        app.user_service
            .delete_post("username", post.id)
            .await
            .expect("delete_post must succeed once storage recovers");
        assert_eq!(app.post_service.count_posts().await.expect("count"), 0);
        assert_eq!(app.user_service.count_posts_of("username").await.expect("count"), 0);
    }
}
