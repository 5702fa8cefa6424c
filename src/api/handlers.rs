use super::auth::Editor;
use super::error::ApiError;
use super::AppState;
use crate::domain::article::{Article, ArticleId};
use crate::infra::parser::parse_date;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

/// GET /api/articles のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub author: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/search のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_date(v)
            .map(Some)
            .map_err(|e| ApiError::bad_request(format!("{} の日付が不正です: {}", name, e))),
    }
}

// Content-Type 不一致（415）やサイズ超過（413）は抽出器のステータスのまま返す
fn json_body(body: Result<Json<Article>, JsonRejection>) -> Result<Article, ApiError> {
    body.map(|Json(article)| article).map_err(|e| {
        ApiError::rejected(e.status(), format!("記事のJSONが不正です: {}", e.body_text()))
    })
}

fn path_id(path: Result<Path<ArticleId>, PathRejection>) -> Result<ArticleId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::bad_request(format!("記事IDが不正です: {}", e.body_text())))
}

pub async fn get_article(
    State(state): State<AppState>,
    path: Result<Path<ArticleId>, PathRejection>,
) -> Result<Json<Article>, ApiError> {
    let id = path_id(path)?;
    let article = state.service.get(id).await?;
    Ok(Json(article))
}

pub async fn delete_article(
    Editor(editor): Editor,
    State(state): State<AppState>,
    path: Result<Path<ArticleId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(path)?;
    state.service.delete(id).await?;
    info!(id, user = %editor.name, "DELETE /api/articles/{}", id);
    Ok(StatusCode::OK)
}

/// パスのIDが正。ボディのIDが異なれば 400、なければパスのIDを使う。
pub async fn update_article(
    Editor(editor): Editor,
    State(state): State<AppState>,
    path: Result<Path<ArticleId>, PathRejection>,
    body: Result<Json<Article>, JsonRejection>,
) -> Result<Json<Article>, ApiError> {
    let id = path_id(path)?;
    let mut article = json_body(body)?;
    match article.id {
        Some(body_id) if body_id != id => {
            return Err(ApiError::bad_request(format!(
                "パスのID({})とボディのID({})が一致しません",
                id, body_id
            )));
        }
        _ => article.id = Some(id),
    }
    let updated = state.service.update(article).await?;
    info!(id, user = %editor.name, "POST /api/articles/{}", id);
    Ok(Json(updated))
}

pub async fn create_article(
    Editor(editor): Editor,
    State(state): State<AppState>,
    body: Result<Json<Article>, JsonRejection>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = json_body(body)?;
    let created = state.service.create(article).await?;
    info!(id = ?created.id, user = %editor.name, "PUT /api/articles");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let from = parse_bound("from", params.from.as_deref())?;
    let to = parse_bound("to", params.to.as_deref())?;
    let articles = state
        .service
        .find(params.author.as_deref(), from, to)
        .await?;
    Ok(Json(articles))
}

pub async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let keyword = params.keyword.unwrap_or_default();
    let articles = state.service.search(&keyword).await?;
    Ok(Json(articles))
}
