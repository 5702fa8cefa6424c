//! REST API（境界層）
//!
//! ルーティング、JSON変換、認証と編集者ロールの確認、エラーからステータスへの変換を行う。
//! 業務ロジックは [`ArticleService`] に任せる。
//!
//! | メソッド | パス | 認可 |
//! |---|---|---|
//! | GET | /api/articles/:id | 誰でも |
//! | DELETE | /api/articles/:id | 編集者 |
//! | POST | /api/articles/:id | 編集者 |
//! | PUT | /api/articles | 編集者 |
//! | GET | /api/articles?author=&from=&to= | 誰でも |
//! | GET | /api/search?keyword= | 誰でも |

pub mod auth;
pub mod error;
pub mod handlers;

use crate::domain::article::ArticleService;
use auth::UserDirectory;
use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use auth::{Editor, Principal};
pub use error::ApiError;

/// ハンドラー間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub service: ArticleService,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    pub fn new(service: ArticleService, users: UserDirectory) -> Self {
        Self {
            service,
            users: Arc::new(users),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/articles",
            get(handlers::list_articles).put(handlers::create_article),
        )
        .route(
            "/api/articles/:id",
            get(handlers::get_article)
                .post(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/api/search", get(handlers::search_articles))
        .with_state(state)
}

/// 受け付け済みのリスナーでAPIを提供する。`shutdown` が完了すると新規接続を止めて終了する。
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("articles API を {} で待ち受けます", addr);
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
