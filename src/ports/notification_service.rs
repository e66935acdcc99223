use crate::domain::{Item, UserId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知サービスポート
///
/// 利用者への通知配信メカニズムを抽象化する。
/// 実装はチャットボット、メールなどが考えられる。配信の保証はしない。
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// 予約が繰り上がり、資料を受け取れるようになったことを通知する
    ///
    /// 返却の呼び出し元（API層）から呼ばれる。貸出コーディネーターは通知しない。
    async fn send_item_available(&self, user_id: &UserId, item: &Item) -> Result<()>;
}

/// 受け取り可能通知の本文
pub fn item_available_message(item: &Item) -> String {
    format!("'{}' is now available. You can pick it up!", item.title)
}
