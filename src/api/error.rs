use crate::domain::article::ArticleError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const AUTH_REALM: &str = r#"Basic realm="articles""#;

/// REST層のエラー型
///
/// サービス層のエラーに、認証・認可と入力解析の失敗を加えたもの。
#[derive(Error, Debug)]
pub enum ApiError {
    /// 認証情報がない・誤っている
    #[error("認証が必要です")]
    Unauthorized,

    /// 認証済みだが編集者ロールを持たない
    #[error("この操作には編集者ロールが必要です")]
    Forbidden,

    /// リクエストの形式が不正
    #[error("{0}")]
    BadRequest(String),

    /// 本文の受け取り自体を拒否した（Content-Type 不一致やサイズ超過など）
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Article(#[from] ArticleError),
}

impl ApiError {
    pub fn bad_request<M: Into<String>>(message: M) -> Self {
        Self::BadRequest(message.into())
    }

    /// 抽出器が返したステータスを保ったまま拒否する。4xx 以外は 400 に丸める。
    pub fn rejected<M: Into<String>>(status: StatusCode, message: M) -> Self {
        let message = message.into();
        if status.is_client_error() {
            Self::Rejected { status, message }
        } else {
            Self::BadRequest(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Article(ArticleError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Article(ArticleError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Article(ArticleError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::Rejected { status, .. } => match *status {
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
                StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
                _ => "bad_request",
            },
            Self::Article(ArticleError::NotFound(_)) => "not_found",
            Self::Article(ArticleError::InvalidInput(_)) => "invalid_input",
            Self::Article(ArticleError::Store(_)) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // ストア障害の詳細はログにのみ残す
        let message = match &self {
            Self::Article(ArticleError::Store(source)) => {
                error!(error = %source, "ストア操作に失敗しました");
                "内部エラーが発生しました".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": self.kind(), "message": message }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_REALM),
            );
        }
        response
    }
}
