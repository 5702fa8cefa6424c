use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// 設定関連のエラー型
/// 環境変数、設定ファイル、設定値の検証など設定に関するエラーを定義
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 環境変数が見つからない
    #[error("環境変数が見つかりません: {name}")]
    MissingEnvironmentVariable { name: String },

    /// 設定値が不正
    #[error("設定値が不正です: {reason}")]
    InvalidValue { reason: String },

    /// 設定ファイルが見つからない・読めない
    #[error("設定ファイルを読み込めません: {path}")]
    MissingConfigFile { path: String },
}

impl ConfigError {
    /// 環境変数不足エラーを作成
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    /// 不正な設定値エラーを作成
    pub fn invalid_value<R: Into<String>>(reason: R) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// 設定ファイル不足エラーを作成
    pub fn missing_config_file<P: Into<String>>(path: P) -> Self {
        Self::MissingConfigFile { path: path.into() }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// 記事の保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(ConfigError::invalid_value(format!(
                "ARTICLES_STORE は postgres か memory を指定してください: {}",
                other
            ))),
        }
    }
}

/// 認証ユーザー（users.yaml の1エントリ）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// users.yaml のトップレベル構造
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersFile {
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// アプリケーション全体の設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub search_case_insensitive: bool,
    pub users_file: Option<String>,
    pub editor: Option<UserConfig>,
    pub log_json: bool,
}

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const EDITOR_ROLE: &str = "EDITOR";

impl AppConfig {
    /// 環境変数から設定を組み立てる
    ///
    /// `.env` の読み込みは呼び出し側（main）で行う。
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の値取得関数から設定を組み立てる（テストで環境変数を汚さないため）
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("ARTICLES_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse::<SocketAddr>().map_err(|e| {
            ConfigError::invalid_value(format!("ARTICLES_BIND が不正です: {} ({})", bind_raw, e))
        })?;

        let store = match lookup("ARTICLES_STORE") {
            Some(value) => StoreKind::parse(&value)?,
            None => StoreKind::Postgres,
        };

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::missing_env_var("DATABASE_URL"));
        }

        let search_case_insensitive = parse_bool_var(
            "ARTICLES_SEARCH_CASE_INSENSITIVE",
            lookup("ARTICLES_SEARCH_CASE_INSENSITIVE"),
        )?
        .unwrap_or(false);
        let log_json =
            parse_bool_var("ARTICLES_LOG_JSON", lookup("ARTICLES_LOG_JSON"))?.unwrap_or(false);

        let editor = match (lookup("ARTICLES_EDITOR_USER"), lookup("ARTICLES_EDITOR_PASSWORD")) {
            (Some(name), Some(password)) => Some(UserConfig {
                name,
                password,
                roles: vec![EDITOR_ROLE.to_string()],
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::missing_env_var("ARTICLES_EDITOR_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::missing_env_var("ARTICLES_EDITOR_USER")),
        };

        Ok(Self {
            bind,
            store,
            database_url,
            search_case_insensitive,
            users_file: lookup("ARTICLES_USERS_FILE").filter(|v| !v.trim().is_empty()),
            editor,
            log_json,
        })
    }
}

/// 真偽値の環境変数を解釈する（未設定は None）
pub fn parse_bool_var(name: &str, value: Option<String>) -> ConfigResult<Option<bool>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::invalid_value(format!(
            "{} は真偽値で指定してください: {}",
            name, value
        ))),
    }
}
