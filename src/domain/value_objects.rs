use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// 利用者IDの最大文字数
pub const MAX_USER_ID_LEN: usize = 30;

/// 資料ID - 貸出対象の1冊を識別する
///
/// ストレージ側で単調増加に採番される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 予約ID
///
/// 単調増加で採番されるため、同時刻に作成された予約の順序付けにも使われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(i64);

impl ReservationId {
    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 利用者ID - 外部（チャットボット等）から渡される不透明な識別子
///
/// 不変条件：
/// - 前後の空白を除いて空でない
/// - 最大30文字
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// 文字列から利用者IDを生成する
    ///
    /// # エラー
    /// - 空文字列（空白のみを含む）の場合は`ValidationError::EmptyUserId`
    /// - 31文字以上の場合は`ValidationError::UserIdTooLong`
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if trimmed.chars().count() > MAX_USER_ID_LEN {
            return Err(ValidationError::UserIdTooLong {
                max: MAX_USER_ID_LEN,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UserId> for String {
    fn from(user_id: UserId) -> Self {
        user_id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
