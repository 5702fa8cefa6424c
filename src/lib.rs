//! 記事管理サービス
//!
//! 記事（見出し・説明・本文・著者・キーワード・公開日）の作成・更新・削除と検索。
//! 更新系の操作は編集者ロールを持つ呼び出し元に限られる。

pub mod api;
pub mod domain;
pub mod infra;
pub mod types;
