//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - エラー型: 永続化層のエラー
//! - 設定型: 環境変数・users.yaml から組み立てる設定

pub mod config;
pub mod error;

// 便利な再エクスポート
pub use config::{AppConfig, ConfigError, ConfigResult, StoreKind, UserConfig, UsersFile};
pub use error::{StoreError, StoreResult};
