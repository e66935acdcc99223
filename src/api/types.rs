use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::lending::{BorrowOutcome, ReturnOutcome};
use crate::domain::{Item, Reservation, commands::CreateItem};

/// 資料登録リクエスト（POST /items）
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub author: String,
}

impl CreateItemRequest {
    pub fn to_command(&self) -> CreateItem {
        CreateItem {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// 利用者を指定するクエリパラメータ（?user_id=...）
///
/// 検証はハンドラーで`UserId::parse`により行う。
/// 未指定は空の利用者IDとして扱い、INVALID_INPUTになる。
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// 資料レスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub is_borrowed: bool,
    pub holder_user_id: Option<String>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id.value(),
            is_borrowed: item.is_borrowed(),
            holder_user_id: item.holder().map(ToString::to_string),
            title: item.title,
            author: item.author,
        }
    }
}

/// 資料一覧レスポンス（GET /items）
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
}

/// 予約レスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: i64,
    pub item_id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id.value(),
            item_id: reservation.item_id.value(),
            user_id: reservation.user_id.to_string(),
            created_at: reservation.created_at,
            status: reservation.status.as_str().to_string(),
        }
    }
}

/// 貸出要求レスポンス（POST /items/:id/borrow）
///
/// `outcome`フィールドで即時貸出か予約待ちかを区別する。
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BorrowResponse {
    Borrowed { item: ItemResponse },
    Queued { reservation: ReservationResponse },
}

impl From<BorrowOutcome> for BorrowResponse {
    fn from(outcome: BorrowOutcome) -> Self {
        match outcome {
            BorrowOutcome::Borrowed(item) => Self::Borrowed { item: item.into() },
            BorrowOutcome::Queued(reservation) => Self::Queued {
                reservation: reservation.into(),
            },
        }
    }
}

/// 返却レスポンス（POST /items/:id/return）
#[derive(Debug, Serialize, Deserialize)]
pub struct ReturnResponse {
    pub item: ItemResponse,
    pub promoted_user_id: Option<String>,
}

impl From<ReturnOutcome> for ReturnResponse {
    fn from(outcome: ReturnOutcome) -> Self {
        Self {
            item: outcome.item.into(),
            promoted_user_id: outcome.promoted_user_id.map(String::from),
        }
    }
}

/// 削除などの結果メッセージ
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
