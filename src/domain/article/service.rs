use super::model::{Article, ArticleId};
use super::repository::ArticleStore;
use crate::types::StoreError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// サービス層のエラー型
#[derive(Error, Debug)]
pub enum ArticleError {
    /// 存在しない記事への操作（id未設定の更新も含む）
    #[error("記事が見つかりません: {}", display_id(.0))]
    NotFound(Option<ArticleId>),

    /// 入力の意味的な誤り
    #[error("入力が不正です: {0}")]
    InvalidInput(String),

    /// 永続化層のエラー
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn display_id(id: &Option<ArticleId>) -> String {
    match id {
        Some(id) => format!("id={}", id),
        None => "id未設定".to_string(),
    }
}

/// NUL文字はPostgreSQLのテキストに格納も照合もできないため入力として受け付けない
fn reject_nul(field: &str, value: &str) -> ArticleResult<()> {
    if value.contains('\0') {
        return Err(ArticleError::InvalidInput(format!(
            "{} にNUL文字は使えません",
            field
        )));
    }
    Ok(())
}

fn validate_text(article: &Article) -> ArticleResult<()> {
    reject_nul("header", &article.header)?;
    reject_nul("description", &article.description)?;
    reject_nul("content", &article.content)?;
    for author in &article.authors {
        reject_nul("authors", author)?;
    }
    for keyword in &article.keywords {
        reject_nul("keywords", keyword)?;
    }
    Ok(())
}

/// サービス層のResult型エイリアス
pub type ArticleResult<T> = std::result::Result<T, ArticleError>;

/// 記事の業務ロジック
///
/// 入力の検証、存在確認、NotFound の型付けを行い、問い合わせはストアに委譲する。
/// 編集者ロールの確認は呼び出し側（REST層）の責務で、ここでは行わない。
///
/// 存在確認と書き込みは別々のストア操作なので、同じIDへの並行した更新・削除は
/// 後勝ちになる。
#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn ArticleStore>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// 新しい記事を作成する。id が入っていれば InvalidInput。
    pub async fn create(&self, article: Article) -> ArticleResult<Article> {
        if let Some(id) = article.id {
            return Err(ArticleError::InvalidInput(format!(
                "作成する記事に id を含めることはできません: id={}",
                id
            )));
        }
        validate_text(&article)?;
        let created = self.store.save(article).await?;
        info!(id = ?created.id, "記事を作成しました");
        Ok(created)
    }

    /// 既存の記事を丸ごと置き換える
    pub async fn update(&self, article: Article) -> ArticleResult<Article> {
        let Some(id) = article.id else {
            return Err(ArticleError::NotFound(None));
        };
        validate_text(&article)?;
        if !self.store.exists(id).await? {
            return Err(ArticleError::NotFound(Some(id)));
        }
        let updated = self.store.save(article).await.map_err(|e| match e {
            // 存在確認の後に削除された
            StoreError::RowNotFound(id) => ArticleError::NotFound(Some(id)),
            other => ArticleError::Store(other),
        })?;
        info!(id, "記事を更新しました");
        Ok(updated)
    }

    pub async fn delete(&self, id: ArticleId) -> ArticleResult<()> {
        if !self.store.exists(id).await? {
            return Err(ArticleError::NotFound(Some(id)));
        }
        self.store.delete_by_id(id).await?;
        info!(id, "記事を削除しました");
        Ok(())
    }

    pub async fn get(&self, id: ArticleId) -> ArticleResult<Article> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ArticleError::NotFound(Some(id)))
    }

    /// 条件で記事を探す
    ///
    /// 著者が空でなければ著者で検索し、日付は無視する。
    /// そうでなければ公開日の範囲で検索する。片側だけの境界はその側を無制限とし、
    /// 境界がどちらもなければ全件を返す。
    pub async fn find(
        &self,
        author: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ArticleResult<Vec<Article>> {
        let articles = match author.filter(|a| !a.is_empty()) {
            Some(author) => {
                reject_nul("author", author)?;
                let articles = self.store.find_by_author(author).await?;
                debug!(author, count = articles.len(), "著者で記事を検索しました");
                articles
            }
            None => {
                let articles = self.store.find_by_date_range(from, to).await?;
                debug!(?from, ?to, count = articles.len(), "公開日で記事を検索しました");
                articles
            }
        };
        Ok(articles)
    }

    /// キーワード検索。空文字は全件。
    pub async fn search(&self, term: &str) -> ArticleResult<Vec<Article>> {
        reject_nul("keyword", term)?;
        let articles = self.store.search(term).await?;
        debug!(term, count = articles.len(), "キーワードで記事を検索しました");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::memory::InMemoryArticleStore;
    use async_trait::async_trait;
    use chrono::Duration;

    fn service() -> ArticleService {
        ArticleService::new(Arc::new(InMemoryArticleStore::new()))
    }

    async fn create_articles(service: &ArticleService, author: &str, keyword: &str, count: usize) {
        for i in 0..count {
            let article = Article::new()
                .with_header(format!("article{}", i))
                .with_content(format!("some content{}", keyword))
                .with_date_published(Utc::now())
                .with_authors([author.to_string(), format!("some other one {}", count)])
                .with_keywords([keyword.to_string(), format!("other{}", count)]);
            service.create(article).await.expect("記事の作成に失敗");
        }
    }

    // 作成・更新・削除・取得
    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn test_create_assigns_id() {
            let service = service();
            let created = service
                .create(Article::new().with_header("見出し"))
                .await
                .unwrap();
            assert!(created.id.is_some());
            assert_eq!(created.header, "見出し");
        }

        #[tokio::test]
        async fn test_create_with_id_is_invalid() {
            let service = service();
            let article = Article {
                id: Some(123),
                ..Default::default()
            };
            let result = service.create(article).await;
            assert!(matches!(result, Err(ArticleError::InvalidInput(_))));
            assert!(service.search("").await.unwrap().is_empty(), "記録は作られない");
        }

        #[tokio::test]
        async fn test_missing_ids_are_not_found() {
            let service = service();

            assert!(matches!(
                service.get(123).await,
                Err(ArticleError::NotFound(Some(123)))
            ));
            assert!(matches!(
                service.delete(123).await,
                Err(ArticleError::NotFound(Some(123)))
            ));
            let article = Article {
                id: Some(123),
                ..Default::default()
            };
            assert!(matches!(
                service.update(article).await,
                Err(ArticleError::NotFound(Some(123)))
            ));
            // id未設定の更新も NotFound
            assert!(matches!(
                service.update(Article::new()).await,
                Err(ArticleError::NotFound(None))
            ));
        }

        #[tokio::test]
        async fn test_create_then_delete() {
            let service = service();
            let created = service.create(Article::new()).await.unwrap();
            let id = created.id.unwrap();

            service.delete(id).await.unwrap();

            assert!(matches!(
                service.get(id).await,
                Err(ArticleError::NotFound(_))
            ));
            assert!(matches!(
                service.delete(id).await,
                Err(ArticleError::NotFound(_))
            ));
        }

        #[tokio::test]
        async fn test_update_round_trip() {
            let service = service();
            let created = service
                .create(
                    Article::new()
                        .with_authors(["author1", "author2"])
                        .with_keywords(["cats", "dogs"]),
                )
                .await
                .unwrap();
            let id = created.id.unwrap();

            let mut article = service.get(id).await.unwrap();
            article.authors.retain(|a| a != "author1");
            article.add_authors(["new author"]);
            article.keywords = vec!["news".to_string()];
            article.header = "title".to_string();
            service.update(article).await.unwrap();

            let updated = service.get(id).await.unwrap();
            assert_eq!(updated.header, "title");
            assert_eq!(updated.authors, vec!["author2", "new author"]);
            assert_eq!(updated.keywords, vec!["news"]);
            assert!(!updated.has_keyword("cats"));

            println!("✅ 更新の往復テスト成功");
        }
    }

    // 問い合わせ系
    mod queries {
        use super::*;

        #[tokio::test]
        async fn test_find_by_author_scenario() {
            let service = service();
            create_articles(&service, "author1", "a", 12).await;
            create_articles(&service, "author2", "b", 1).await;
            create_articles(&service, "some other one", "c", 7).await;

            let result = service.find(Some("some other one"), None, None).await.unwrap();
            assert_eq!(result.len(), 7);
            assert!(result.iter().all(|a| a.has_author("some other one")));

            let result = service.find(Some("some other"), None, None).await.unwrap();
            assert!(result.is_empty());
        }

        #[tokio::test]
        async fn test_author_takes_precedence_over_dates() {
            let service = service();
            create_articles(&service, "author1", "a", 3).await;

            // 過去の期間を指定しても著者検索が優先される
            let past = Utc::now() - Duration::days(30);
            let result = service
                .find(Some("author1"), Some(past), Some(past))
                .await
                .unwrap();
            assert_eq!(result.len(), 3);
        }

        #[tokio::test]
        async fn test_find_by_period() {
            let service = service();
            create_articles(&service, "author1", "a", 5).await;
            let now = Utc::now();

            let result = service
                .find(None, Some(now - Duration::minutes(1)), Some(now + Duration::minutes(1)))
                .await
                .unwrap();
            assert_eq!(result.len(), 5);

            let result = service
                .find(
                    Some(""),
                    Some(now - Duration::minutes(2)),
                    Some(now - Duration::minutes(1)),
                )
                .await
                .unwrap();
            assert!(result.is_empty(), "空の著者は指定なし扱い");

            // 片側だけの境界
            let result = service
                .find(None, Some(now - Duration::minutes(1)), None)
                .await
                .unwrap();
            assert_eq!(result.len(), 5);
            let result = service
                .find(None, None, Some(now - Duration::minutes(1)))
                .await
                .unwrap();
            assert!(result.is_empty());
        }

        #[tokio::test]
        async fn test_search_scenario() {
            let service = service();
            create_articles(&service, "author1", "aaa", 12).await;
            create_articles(&service, "author2", "bbb", 1).await;
            create_articles(&service, "some other one", "ccc", 7).await;

            assert_eq!(service.search("article").await.unwrap().len(), 20);
            assert_eq!(service.search("zzz").await.unwrap().len(), 0);
            assert_eq!(service.search("").await.unwrap().len(), 20);
        }

        #[tokio::test]
        async fn test_nul_is_invalid_input() {
            let service = service();
            create_articles(&service, "author1", "a", 2).await;

            assert!(matches!(
                service.search("article\0").await,
                Err(ArticleError::InvalidInput(_))
            ));
            assert!(matches!(
                service.find(Some("author1\0"), None, None).await,
                Err(ArticleError::InvalidInput(_))
            ));
            assert!(matches!(
                service.create(Article::new().with_header("a\0b")).await,
                Err(ArticleError::InvalidInput(_))
            ));

            let mut article = service.search("").await.unwrap().remove(0);
            article.keywords.push("x\0".to_string());
            assert!(matches!(
                service.update(article).await,
                Err(ArticleError::InvalidInput(_))
            ));
            assert_eq!(service.search("").await.unwrap().len(), 2, "記録は変わらない");
        }
    }

    // ストア障害の伝播
    mod failures {
        use super::*;

        /// 常に失敗するストア
        struct BrokenStore;

        fn broken() -> StoreError {
            StoreError::database("テスト", sqlx::Error::PoolTimedOut)
        }

        #[async_trait]
        impl ArticleStore for BrokenStore {
            async fn save(&self, _article: Article) -> crate::types::StoreResult<Article> {
                Err(broken())
            }
            async fn exists(&self, _id: ArticleId) -> crate::types::StoreResult<bool> {
                Err(broken())
            }
            async fn find_by_id(&self, _id: ArticleId) -> crate::types::StoreResult<Option<Article>> {
                Err(broken())
            }
            async fn delete_by_id(&self, _id: ArticleId) -> crate::types::StoreResult<()> {
                Err(broken())
            }
            async fn find_by_author(&self, _author: &str) -> crate::types::StoreResult<Vec<Article>> {
                Err(broken())
            }
            async fn find_by_date_range(
                &self,
                _from: Option<DateTime<Utc>>,
                _to: Option<DateTime<Utc>>,
            ) -> crate::types::StoreResult<Vec<Article>> {
                Err(broken())
            }
            async fn search(&self, _term: &str) -> crate::types::StoreResult<Vec<Article>> {
                Err(broken())
            }
            async fn find_all(&self) -> crate::types::StoreResult<Vec<Article>> {
                Err(broken())
            }
            async fn count(&self) -> crate::types::StoreResult<u64> {
                Err(broken())
            }
            async fn delete_all(&self) -> crate::types::StoreResult<()> {
                Err(broken())
            }
        }

        #[tokio::test]
        async fn test_store_errors_propagate() {
            let service = ArticleService::new(Arc::new(BrokenStore));

            assert!(matches!(
                service.create(Article::new()).await,
                Err(ArticleError::Store(_))
            ));
            assert!(matches!(service.get(1).await, Err(ArticleError::Store(_))));
            assert!(matches!(service.delete(1).await, Err(ArticleError::Store(_))));
            assert!(matches!(service.search("x").await, Err(ArticleError::Store(_))));
        }

        /// 存在確認は通るが、書き込み時には行が消えているストア
        struct VanishingStore;

        #[async_trait]
        impl ArticleStore for VanishingStore {
            async fn save(&self, article: Article) -> crate::types::StoreResult<Article> {
                Err(StoreError::RowNotFound(article.id.unwrap_or_default()))
            }
            async fn exists(&self, _id: ArticleId) -> crate::types::StoreResult<bool> {
                Ok(true)
            }
            async fn find_by_id(&self, _id: ArticleId) -> crate::types::StoreResult<Option<Article>> {
                Ok(None)
            }
            async fn delete_by_id(&self, _id: ArticleId) -> crate::types::StoreResult<()> {
                Ok(())
            }
            async fn find_by_author(&self, _author: &str) -> crate::types::StoreResult<Vec<Article>> {
                Ok(Vec::new())
            }
            async fn find_by_date_range(
                &self,
                _from: Option<DateTime<Utc>>,
                _to: Option<DateTime<Utc>>,
            ) -> crate::types::StoreResult<Vec<Article>> {
                Ok(Vec::new())
            }
            async fn search(&self, _term: &str) -> crate::types::StoreResult<Vec<Article>> {
                Ok(Vec::new())
            }
            async fn find_all(&self) -> crate::types::StoreResult<Vec<Article>> {
                Ok(Vec::new())
            }
            async fn count(&self) -> crate::types::StoreResult<u64> {
                Ok(0)
            }
            async fn delete_all(&self) -> crate::types::StoreResult<()> {
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_row_vanished_before_update_is_not_found() {
            let service = ArticleService::new(Arc::new(VanishingStore));
            let article = Article {
                id: Some(42),
                header: "見出し".to_string(),
                ..Default::default()
            };

            let result = service.update(article).await;
            assert!(
                matches!(result, Err(ArticleError::NotFound(Some(42)))),
                "RowNotFound は NotFound として報告される: {:?}",
                result
            );
        }
    }
}
