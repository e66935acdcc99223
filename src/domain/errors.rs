use thiserror::Error;

use super::{ReservationId, ReservationStatus};

/// 入力値のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("user_id must not be empty")]
    EmptyUserId,
    #[error("user_id must be at most {max} characters")]
    UserIdTooLong { max: usize },
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("author must not be empty")]
    EmptyAuthor,
}

/// 貸出・予約のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowError {
    /// 既に本人が借りている
    AlreadyHolder,
    /// 既に同じ資料の予約待ちに並んでいる
    AlreadyQueued,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnError {
    /// 貸出中でない
    NotBorrowed,
    /// 借りている本人ではない
    NotHolder,
    /// 繰り上げ対象として渡された予約が、この資料の待機中予約ではない
    InvalidQueueHead(ReservationId),
}

/// 予約の状態遷移エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationTransitionError {
    /// 待機中（pending）以外からは遷移できない
    NotPending(ReservationStatus),
}
