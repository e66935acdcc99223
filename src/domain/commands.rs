use super::{ItemId, UserId};

/// コマンド：資料を登録する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItem {
    pub title: String,
    pub author: String,
}

/// コマンド：資料を削除する（予約も削除される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteItem {
    pub item_id: ItemId,
}

/// コマンド：資料を借りる（貸出中なら予約待ちに並ぶ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowOrQueue {
    pub item_id: ItemId,
    pub user_id: UserId,
}

/// コマンド：資料を返却する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnItem {
    pub item_id: ItemId,
    pub user_id: UserId,
}
