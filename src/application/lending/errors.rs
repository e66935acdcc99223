use crate::domain::{BorrowError, ReturnError, ValidationError};
use thiserror::Error;

/// 貸出・予約アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LendingApplicationError {
    /// 資料が存在しない
    #[error("Item not found")]
    ItemNotFound,

    /// 既に本人が借りている
    #[error("User already holds this item")]
    AlreadyHolder,

    /// 既に予約待ちに並んでいる
    #[error("User is already in the reservation queue for this item")]
    AlreadyQueued,

    /// 貸出中でない資料を返却しようとした
    #[error("Item is not borrowed")]
    NotBorrowed,

    /// 借りている本人以外が返却しようとした
    #[error("User is not the current holder of this item")]
    NotHolder,

    /// 入力値が不正
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// ドメイン層のエラー（ストアが返したデータとドメインの不整合）
    #[error("Domain error: {0}")]
    DomainError(String),

    /// ストレージのエラー
    #[error("Storage failure")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<BorrowError> for LendingApplicationError {
    fn from(err: BorrowError) -> Self {
        match err {
            BorrowError::AlreadyHolder => Self::AlreadyHolder,
            BorrowError::AlreadyQueued => Self::AlreadyQueued,
        }
    }
}

impl From<ReturnError> for LendingApplicationError {
    fn from(err: ReturnError) -> Self {
        match err {
            ReturnError::NotBorrowed => Self::NotBorrowed,
            ReturnError::NotHolder => Self::NotHolder,
            ReturnError::InvalidQueueHead(id) => {
                Self::DomainError(format!("reservation {} is not a valid queue head", id))
            }
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LendingApplicationError>;
