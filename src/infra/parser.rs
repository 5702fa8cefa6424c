use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};

/// 文字列を日付型に変換するヘルパー関数
///
/// 数字だけの文字列はエポックミリ秒として扱う（クエリパラメータ from/to で使われる形式）。
/// それ以外は `dateparser` に任せ、結果をUTCに揃える。
///
/// # サポート形式の例
/// - "1754829000000"（エポックミリ秒）
/// - "2025-01-15"
/// - "2025-01-15T10:00:00Z"
/// - "Sun, 10 Aug 2025 12:00:00 +0000"
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = trimmed
            .parse()
            .map_err(|_| anyhow!("不正なエポックミリ秒: {}", date_str))?;
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| anyhow!("不正なエポックミリ秒: {}", date_str));
    }

    // `dateparser`はタイムゾーンを持つ`DateTime`を返すため、UTCに変換する
    match dateparser::parse(trimmed) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => Err(anyhow!("不正な日付形式: {}", date_str)),
    }
}
