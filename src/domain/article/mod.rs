pub mod memory;
pub mod model;
pub mod repository;
pub mod service;

// 公開APIの再エクスポート

// model.rsから
pub use model::{Article, ArticleId};

// repository.rs / memory.rsから
pub use memory::InMemoryArticleStore;
pub use repository::{ArticleStore, PgArticleStore};

// service.rsから
pub use service::{ArticleError, ArticleResult, ArticleService};
