use super::model::{Article, ArticleId};
use crate::types::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// 記事の永続化を抽象化するトレイト
///
/// PostgreSQL 実装とインメモリ実装を同じインターフェースで扱うためのもの。
/// ビジネスルールは持たず、サービス層から呼ばれるだけ。
/// 一覧系の結果はすべてID昇順。
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// id が未設定なら採番して新規作成、設定済みならその行を丸ごと置き換える
    async fn save(&self, article: Article) -> StoreResult<Article>;

    async fn exists(&self, id: ArticleId) -> StoreResult<bool>;

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>>;

    /// 存在しないIDの削除は何もしない
    async fn delete_by_id(&self, id: ArticleId) -> StoreResult<()>;

    /// authors のいずれかの要素に完全一致する記事
    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Article>>;

    /// 公開日が範囲内（両端を含む）の記事。None の境界は無制限。
    async fn find_by_date_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Article>>;

    /// 本文系フィールドの部分一致、またはキーワードの完全一致（重複なし）
    async fn search(&self, term: &str) -> StoreResult<Vec<Article>>;

    async fn find_all(&self) -> StoreResult<Vec<Article>>;

    async fn count(&self) -> StoreResult<u64>;

    async fn delete_all(&self) -> StoreResult<()>;
}

const ARTICLE_COLUMNS: &str = "id, header, description, content, date_published, authors, keywords";

/// PostgreSQL を使用した本番用のストア実装
pub struct PgArticleStore {
    pool: PgPool,
    case_insensitive: bool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            case_insensitive: false,
        }
    }

    /// 検索の部分一致を大文字小文字を区別せずに行う（ILIKE）
    pub fn with_case_insensitive_search(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    fn like_operator(&self) -> &'static str {
        if self.case_insensitive {
            "ILIKE"
        } else {
            "LIKE"
        }
    }
}

/// LIKE 用のパターンを作る（ワイルドカード文字はエスケープして部分一致にする）
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn save(&self, article: Article) -> StoreResult<Article> {
        match article.id {
            None => {
                let sql = format!(
                    r#"
                    INSERT INTO articles (header, description, content, date_published, authors, keywords)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {}
                    "#,
                    ARTICLE_COLUMNS
                );
                sqlx::query_as::<_, Article>(&sql)
                    .bind(&article.header)
                    .bind(&article.description)
                    .bind(&article.content)
                    .bind(article.date_published)
                    .bind(&article.authors)
                    .bind(&article.keywords)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| StoreError::database("記事の作成", e))
            }
            Some(id) => {
                let sql = format!(
                    r#"
                    UPDATE articles SET
                        header = $1,
                        description = $2,
                        content = $3,
                        date_published = $4,
                        authors = $5,
                        keywords = $6
                    WHERE id = $7
                    RETURNING {}
                    "#,
                    ARTICLE_COLUMNS
                );
                sqlx::query_as::<_, Article>(&sql)
                    .bind(&article.header)
                    .bind(&article.description)
                    .bind(&article.content)
                    .bind(article.date_published)
                    .bind(&article.authors)
                    .bind(&article.keywords)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::database("記事の更新", e))?
                    .ok_or(StoreError::RowNotFound(id))
            }
        }
    }

    async fn exists(&self, id: ArticleId) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM articles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の存在確認", e))
    }

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の取得", e))
    }

    async fn delete_by_id(&self, id: ArticleId) -> StoreResult<()> {
        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の削除", e))?;
        Ok(())
    }

    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE $1 = ANY(authors) ORDER BY id",
            ARTICLE_COLUMNS
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(author)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("著者による記事検索", e))
    }

    async fn find_by_date_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Article>> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {} FROM articles",
            ARTICLE_COLUMNS
        ));

        if from.is_some() || to.is_some() {
            qb.push(" WHERE ");
            let mut separated = qb.separated(" AND ");
            if let Some(from) = from {
                separated.push("date_published >= ").push_bind_unseparated(from);
            }
            if let Some(to) = to {
                separated.push("date_published <= ").push_bind_unseparated(to);
            }
        }

        qb.push(" ORDER BY id");

        qb.build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("公開日による記事検索", e))
    }

    async fn search(&self, term: &str) -> StoreResult<Vec<Article>> {
        // 1行につき1回だけ評価されるので、複数の条件に一致しても重複しない
        let op = self.like_operator();
        let sql = format!(
            r#"
            SELECT {columns} FROM articles
            WHERE header {op} $1
               OR description {op} $1
               OR content {op} $1
               OR $2 = ANY(keywords)
            ORDER BY id
            "#,
            columns = ARTICLE_COLUMNS,
            op = op
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(like_pattern(term))
            .bind(term)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("キーワード検索", e))
    }

    async fn find_all(&self) -> StoreResult<Vec<Article>> {
        let sql = format!("SELECT {} FROM articles ORDER BY id", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の全件取得", e))
    }

    async fn count(&self) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の件数取得", e))?;
        Ok(count.max(0) as u64)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database("記事の全件削除", e))?;
        Ok(())
    }
}
