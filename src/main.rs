use anyhow::{Context, Result};
use articles::{
    api::{self, auth::UserDirectory, AppState},
    domain::article::{ArticleService, ArticleStore, InMemoryArticleStore, PgArticleStore},
    infra::{db, logging},
    types::{AppConfig, StoreKind},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("設定の読み込みに失敗しました")?;
    logging::init_tracing(config.log_json);

    let store: Arc<dyn ArticleStore> = match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL が設定されていません")?;
            let pool = db::setup_database(database_url).await?;
            Arc::new(
                PgArticleStore::new(pool)
                    .with_case_insensitive_search(config.search_case_insensitive),
            )
        }
        StoreKind::Memory => {
            warn!("インメモリストアで起動します。記事はプロセス終了時に失われます");
            Arc::new(
                InMemoryArticleStore::new()
                    .with_case_insensitive_search(config.search_case_insensitive),
            )
        }
    };

    let users = UserDirectory::from_config(&config)?;
    info!(
        store = ?config.store,
        users = users.len(),
        case_insensitive = config.search_case_insensitive,
        "起動設定を読み込みました"
    );

    let state = AppState::new(ArticleService::new(store), users);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("{} での待ち受けに失敗しました", config.bind))?;

    api::serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "終了シグナルの待機に失敗しました");
        std::future::pending::<()>().await;
    }
    info!("終了シグナルを受信しました");
}
