use super::error::ApiError;
use super::AppState;
use crate::infra::loader::load_yaml_from_file;
use crate::types::config::{AppConfig, UserConfig, UsersFile, EDITOR_ROLE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// 認証済みの呼び出し元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_editor(&self) -> bool {
        self.has_role(EDITOR_ROLE)
    }
}

/// HTTP Basic 認証で照合するユーザー一覧
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserConfig>,
}

impl UserDirectory {
    pub fn new(users: Vec<UserConfig>) -> Self {
        Self { users }
    }

    /// 設定からユーザー一覧を組み立てる（users.yaml と環境変数の編集者アカウント）
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut users = Vec::new();
        if let Some(path) = &config.users_file {
            let file: UsersFile = load_yaml_from_file(path)
                .with_context(|| format!("ユーザー設定の読み込みに失敗: {}", path))?;
            users.extend(file.users);
        }
        if let Some(editor) = &config.editor {
            users.push(editor.clone());
        }
        if users.is_empty() {
            warn!("ユーザーが一人も設定されていません。更新系APIはすべて401になります");
        }
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// 全ユーザーを走査し、比較時間が一致箇所に依存しないように照合する
    pub fn authenticate(&self, name: &str, password: &str) -> Option<Principal> {
        let mut matched = None;
        for user in &self.users {
            let name_ok = digest_eq(&user.name, name);
            let password_ok = digest_eq(&user.password, password);
            if name_ok & password_ok && matched.is_none() {
                matched = Some(user);
            }
        }
        matched.map(|u| Principal {
            name: u.name.clone(),
            roles: u.roles.clone(),
        })
    }

    /// Authorization ヘッダーから呼び出し元を特定する
    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Option<Principal> {
        let (name, password) = basic_credentials(headers)?;
        self.authenticate(&name, &password)
    }
}

/// SHA-256 ダイジェスト同士を全バイト比較する（長さや一致位置で時間が変わらない）
fn digest_eq(expected: &str, given: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let given = Sha256::digest(given.as_bytes());
    expected
        .iter()
        .zip(given.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// `Authorization: Basic ...` からユーザー名とパスワードを取り出す
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, password) = decoded.split_once(':')?;
    Some((name.to_string(), password.to_string()))
}

/// 編集者ロールを持つ呼び出し元
///
/// 更新系ハンドラーの引数に置くと、ボディの解析やサービス呼び出しより前に
/// 認証（401）と認可（403）が行われる。
#[derive(Debug, Clone)]
pub struct Editor(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Editor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .users
            .authenticate_headers(&parts.headers)
            .ok_or_else(|| {
                debug!(method = %parts.method, uri = %parts.uri, "認証に失敗しました");
                ApiError::Unauthorized
            })?;

        if !principal.is_editor() {
            warn!(
                user = %principal.name,
                method = %parts.method,
                uri = %parts.uri,
                "編集者ロールのないユーザーによる更新操作"
            );
            return Err(ApiError::Forbidden);
        }
        Ok(Editor(principal))
    }
}
