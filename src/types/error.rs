use thiserror::Error;

use crate::domain::article::ArticleId;

/// 永続化層のエラー型
/// ストア実装（PostgreSQL・インメモリ）が返す基盤的なエラーを定義
#[derive(Error, Debug)]
pub enum StoreError {
    /// データベースクエリエラー
    #[error("データベースエラー: {operation} - {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// 上書き対象の行が存在しない（存在確認の後に削除された場合など）
    #[error("更新対象の記事が存在しません: id={0}")]
    RowNotFound(ArticleId),
}

impl StoreError {
    /// データベースエラーを作成
    pub fn database<O: Into<String>>(operation: O, source: sqlx::Error) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }
}

/// ストアエラーのResult型エイリアス
pub type StoreResult<T> = std::result::Result<T, StoreError>;
