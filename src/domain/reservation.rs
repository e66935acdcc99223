use chrono::{DateTime, Utc};

use super::{ItemId, ReservationId, ReservationTransitionError, UserId};

/// 予約ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    /// 待機中
    Pending,
    /// 繰り上げ済み（借り手になった）
    Fulfilled,
    /// 取り下げ済み（現在この状態にする操作はない）
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Canceled => "canceled",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "fulfilled" => Ok(ReservationStatus::Fulfilled),
            "canceled" => Ok(ReservationStatus::Canceled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// 予約 - 貸出中の資料に対する順番待ち
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub item_id: ItemId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// 待ち行列での並び順のキー（作成日時、同時刻ならID昇順）
    pub fn queue_key(&self) -> (DateTime<Utc>, ReservationId) {
        (self.created_at, self.id)
    }

    /// 純粋関数：予約を繰り上げ済みにする
    ///
    /// pending → fulfilled のみ許可する。
    pub fn fulfil(self) -> Result<Self, ReservationTransitionError> {
        if !self.status.is_pending() {
            return Err(ReservationTransitionError::NotPending(self.status));
        }
        Ok(Self {
            status: ReservationStatus::Fulfilled,
            ..self
        })
    }
}

/// 新規作成する予約（ID採番前）
///
/// 作成日時はストアが資料ロックの取得後に付与するため、ここには持たない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub item_id: ItemId,
    pub user_id: UserId,
}

impl NewReservation {
    /// ストアが採番したIDと作成日時を付与して予約にする
    pub fn into_reservation(self, id: ReservationId, created_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id,
            item_id: self.item_id,
            user_id: self.user_id,
            created_at,
            status: ReservationStatus::Pending,
        }
    }
}

/// 待機中の予約のうち、先頭（最も古いもの）を返す
pub fn queue_head<'a, I>(reservations: I) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    reservations
        .into_iter()
        .filter(|r| r.status.is_pending())
        .min_by_key(|r| r.queue_key())
}
