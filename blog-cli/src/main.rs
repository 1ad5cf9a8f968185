use std::fs;
use std::io;
use std::path::Path;
use std::process;

use anyhow::{Context, Result, anyhow};
use blog_core::infrastructure::logging::init_logging;
use blog_core::infrastructure::settings::Settings;
use blog_core::{
    AddCommentRequest, AppState, CreatePostRequest, DomainError, LoginRequest, Post,
    RegisterRequest, User,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

const SESSION_FILE: &str = ".blog_session";

#[derive(Debug, Parser)]
#[command(name = "blog-cli", version, about = "CLI для блога поверх blog-core")]
struct Cli {
    /// Печатать результат в JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Вход пользователя, имя запоминается в .blog_session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Выход текущего пользователя.
    Logout,
    /// Текущий пользователь.
    Whoami,
    /// Создание поста (требует вход).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Получение поста по id.
    Get {
        #[arg(long)]
        id: i64,
    },
    /// Удаление своего поста.
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Просмотр поста (требует вход).
    View {
        #[arg(long)]
        id: i64,
    },
    /// Комментарий к посту (требует вход).
    Comment {
        #[arg(long)]
        post_id: i64,
        #[arg(long)]
        text: String,
    },
    /// Удаление комментария с поста.
    Uncomment {
        #[arg(long)]
        post_id: i64,
        #[arg(long)]
        comment_id: i64,
    },
    /// Счётчики пользователей, постов, комментариев и просмотров.
    Stats,
}

#[derive(Debug, Serialize)]
struct Stats {
    users: i64,
    posts: i64,
    comments: i64,
    views: i64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;
    debug!(backend = %settings.storage_backend, "starting blog-cli");

    let app = AppState::from_settings(&settings).await?;
    let users = &app.user_service;

    match cli.command {
        Command::Register {
            username,
            password,
            first_name,
            last_name,
        } => {
            let user = users
                .register(RegisterRequest {
                    username,
                    password,
                    first_name,
                    last_name,
                })
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &user, || print_user("Регистрация успешна", &user))?;
        }
        Command::Login { username, password } => {
            let user = users
                .login(LoginRequest { username, password })
                .await
                .map_err(map_domain_error)?;
            persist_session(&user.username).context("не удалось сохранить .blog_session")?;
            emit(cli.json, &user, || print_user("Вход выполнен", &user))?;
        }
        Command::Logout => {
            let username = require_session()?;
            let user = users.logout(&username).await.map_err(map_domain_error)?;
            clear_session().context("не удалось удалить .blog_session")?;
            emit(cli.json, &user, || {
                println!("Выход выполнен: {}", user.display_name)
            })?;
        }
        Command::Whoami => {
            let username = require_session()?;
            let user = users
                .find_user_by_name(&username)
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &user, || print_user("Текущий пользователь", &user))?;
        }
        Command::Create { title, content } => {
            let author = require_session()?;
            let post = users
                .create_post(CreatePostRequest {
                    author,
                    title,
                    content,
                })
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &post, || print_post("Пост создан", &post))?;
        }
        Command::Get { id } => {
            let post = app
                .post_service
                .find_by_id(id)
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &post, || print_post("Пост", &post))?;
        }
        Command::Delete { id } => {
            let author = require_session()?;
            let post = users
                .delete_post(&author, id)
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &post, || println!("Пост удалён: id={}", post.id))?;
        }
        Command::View { id } => {
            let viewer = require_session()?;
            let view = users
                .view_post(&viewer, id)
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &view, || {
                println!(
                    "{} просмотрел пост \"{}\" (view_id={})",
                    view.viewer_name, view.post_title, view.view_id
                )
            })?;
        }
        Command::Comment { post_id, text } => {
            let commenter = require_session()?;
            let added = users
                .add_comment(AddCommentRequest {
                    commenter,
                    post_id,
                    text,
                })
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &added, || {
                println!(
                    "Комментарий добавлен к посту \"{}\": id={}",
                    added.post_title, added.comment_id
                )
            })?;
        }
        Command::Uncomment {
            post_id,
            comment_id,
        } => {
            let removed = users
                .delete_comment(post_id, comment_id)
                .await
                .map_err(map_domain_error)?;
            emit(cli.json, &removed, || {
                println!(
                    "Комментарий удалён: post_id={}, comment_id={}",
                    removed.post_id, removed.comment_id
                )
            })?;
        }
        Command::Stats => {
            let stats = Stats {
                users: users.count_users().await.map_err(map_domain_error)?,
                posts: app
                    .post_service
                    .count_posts()
                    .await
                    .map_err(map_domain_error)?,
                comments: app
                    .comment_service
                    .count_comments()
                    .await
                    .map_err(map_domain_error)?,
                views: app
                    .view_service
                    .count_views()
                    .await
                    .map_err(map_domain_error)?,
            };
            emit(cli.json, &stats, || {
                println!(
                    "users={} posts={} comments={} views={}",
                    stats.users, stats.posts, stats.comments, stats.views
                )
            })?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}

fn parse_session_content(raw: &str) -> Option<String> {
    let username = raw.trim().to_string();
    if username.is_empty() {
        return None;
    }
    Some(username)
}

fn load_session() -> io::Result<Option<String>> {
    if !Path::new(SESSION_FILE).exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(SESSION_FILE)?;
    Ok(parse_session_content(&raw))
}

fn require_session() -> Result<String> {
    load_session()
        .context("не удалось прочитать .blog_session")?
        .ok_or_else(|| anyhow!("требуется вход: выполните `blog-cli login ...`"))
}

fn persist_session(username: &str) -> io::Result<()> {
    fs::write(SESSION_FILE, username)
}

fn clear_session() -> io::Result<()> {
    match fs::remove_file(SESSION_FILE) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn map_domain_error(err: DomainError) -> anyhow::Error {
    let message = match err {
        DomainError::Validation { field, message } => {
            format!("некорректный запрос: {field} {message}")
        }
        DomainError::UserAlreadyExists(name) => format!("пользователь уже существует: {name}"),
        DomainError::UserNotFound(name) => format!("пользователь не найден: {name}"),
        DomainError::InvalidPassword => "неверный пароль".to_string(),
        DomainError::UserNotLoggedIn(name) => {
            format!("пользователь {name} не вошёл: выполните `blog-cli login ...`")
        }
        DomainError::Unauthorized => "нет прав на это действие".to_string(),
        DomainError::PostNotFound(id) => format!("пост не найден: id={id}"),
        DomainError::CommentNotFound(id) => format!("комментарий не найден: id={id}"),
        DomainError::Conflict(what) => {
            format!("конкурентное изменение ({what}), повторите команду")
        }
        DomainError::Unexpected(message) => format!("внутренняя ошибка: {message}"),
    };
    anyhow!(message)
}

fn print_user(title: &str, user: &User) {
    println!("{title}");
    println!("id: {}", user.id);
    println!("username: {}", user.display_name);
    println!("name: {} {}", user.first_name, user.last_name);
    println!("logged_in: {}", user.is_logged_in());
    println!("posts: {}", user.post_count());
    println!("created_at: {}", user.created_at);
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("content: {}", post.content);
    println!("author_id: {}", post.author_id);
    println!("comments: {:?}", post.comment_ids);
    println!("views: {}", post.view_ids.len());
    println!("created_at: {}", post.created_at);
    println!("updated_at: {}", post.updated_at);
}
