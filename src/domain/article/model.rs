use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::hash::{Hash, Hasher};

/// 記事ID（ストアが採番する）
pub type ArticleId = i64;

// 記事エンティティ
//
// authors / keywords は独立したエンティティではなく、記事が所有する順序付きの文字列列。
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub id: Option<ArticleId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, with = "date_published")]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
}

/// 同一性はIDのみで判定する。IDを持たない記事はどの記事とも等しくない。
impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// 等値判定と揃えてIDのみをハッシュする
impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Article {
    /// 空の記事（id未採番）を作成
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<S: Into<String>>(mut self, header: S) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_date_published(mut self, date: DateTime<Utc>) -> Self {
        self.date_published = Some(date);
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_authors(authors);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_keywords(keywords);
        self
    }

    /// 著者を末尾に追加する（重複も許容）
    pub fn add_authors<I, S>(&mut self, authors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors.extend(authors.into_iter().map(Into::into));
    }

    /// キーワードを末尾に追加する（重複も許容）
    pub fn add_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
    }

    /// 著者に完全一致する要素を持つか
    pub fn has_author(&self, author: &str) -> bool {
        self.authors.iter().any(|a| a == author)
    }

    /// キーワードに完全一致する要素を持つか
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// 検索語に一致するか
    ///
    /// header / description / content の部分一致、またはキーワードの完全一致。
    /// 空文字は常に一致する。`case_insensitive` は部分一致側にのみ効く。
    pub fn matches_term(&self, term: &str, case_insensitive: bool) -> bool {
        let text_match = if case_insensitive {
            let needle = term.to_lowercase();
            [&self.header, &self.description, &self.content]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        } else {
            [&self.header, &self.description, &self.content]
                .iter()
                .any(|field| field.contains(term))
        };
        text_match || self.has_keyword(term)
    }

    /// 公開日が範囲内か（両端を含む）
    ///
    /// 片側の境界が None の場合はその側を無制限とみなす。
    /// 境界が一つでも指定されていれば、公開日のない記事は範囲外。
    pub fn published_within(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> bool {
        if from.is_none() && to.is_none() {
            return true;
        }
        let Some(date) = self.date_published else {
            return false;
        };
        from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
    }
}

/// JSONの null を型のデフォルト値として扱う
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 公開日のシリアライズ
///
/// 出力は RFC 3339 文字列。入力は RFC 3339 文字列に加えて、
/// エポックミリ秒の数値も受け付ける。
mod date_published {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawDate>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawDate::Millis(ms)) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("不正なエポックミリ秒: {}", ms))),
            Some(RawDate::Text(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| de::Error::custom(format!("不正な日付形式: {} ({})", text, e))),
        }
    }
}
