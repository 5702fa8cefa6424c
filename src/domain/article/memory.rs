use super::model::{Article, ArticleId};
use super::repository::ArticleStore;
use crate::types::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// メモリ上に記事を保持するストア実装
///
/// PostgreSQL 版と同じ意味論を持つ。ローカル起動（ARTICLES_STORE=memory）と
/// テストで、データベースなしにサービス層・REST層を動かすために使う。
pub struct InMemoryArticleStore {
    articles: RwLock<BTreeMap<ArticleId, Article>>,
    next_id: AtomicI64,
    case_insensitive: bool,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self {
            articles: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            case_insensitive: false,
        }
    }

    pub fn with_case_insensitive_search(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    async fn filter<P>(&self, predicate: P) -> Vec<Article>
    where
        P: Fn(&Article) -> bool,
    {
        self.articles
            .read()
            .await
            .values()
            .filter(|article| predicate(*article))
            .cloned()
            .collect()
    }
}

impl Default for InMemoryArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn save(&self, mut article: Article) -> StoreResult<Article> {
        let mut articles = self.articles.write().await;
        match article.id {
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                article.id = Some(id);
                articles.insert(id, article.clone());
            }
            Some(id) => {
                let slot = articles.get_mut(&id).ok_or(StoreError::RowNotFound(id))?;
                *slot = article.clone();
            }
        }
        Ok(article)
    }

    async fn exists(&self, id: ArticleId) -> StoreResult<bool> {
        Ok(self.articles.read().await.contains_key(&id))
    }

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        Ok(self.articles.read().await.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: ArticleId) -> StoreResult<()> {
        self.articles.write().await.remove(&id);
        Ok(())
    }

    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Article>> {
        Ok(self.filter(|article| article.has_author(author)).await)
    }

    async fn find_by_date_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Article>> {
        Ok(self.filter(|article| article.published_within(from, to)).await)
    }

    async fn search(&self, term: &str) -> StoreResult<Vec<Article>> {
        let case_insensitive = self.case_insensitive;
        Ok(self
            .filter(|article| article.matches_term(term, case_insensitive))
            .await)
    }

    async fn find_all(&self) -> StoreResult<Vec<Article>> {
        Ok(self.articles.read().await.values().cloned().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.articles.read().await.len() as u64)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.articles.write().await.clear();
        Ok(())
    }
}
