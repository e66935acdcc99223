use crate::domain::{Item, ItemId, UserId};
use crate::ports::notification_service::{
    NotificationService as NotificationServiceTrait, Result, item_available_message,
};
use async_trait::async_trait;
use std::sync::Mutex;

/// 送信された通知の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub message: String,
}

/// NotificationServiceのテスト用モック実装
///
/// 実際には配信せず、ログに出力して送信内容を記録する。記録は破棄されない。
/// `fail_with()`で失敗を注入できる。
pub struct NotificationService {
    sent: Mutex<Vec<SentNotification>>,
    failure: Mutex<Option<String>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// 以降の送信を指定したメッセージで失敗させる
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.into());
        }
    }

    /// 送信済みの通知を古い順で返す
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn send_item_available(&self, user_id: &UserId, item: &Item) -> Result<()> {
        let failure = self
            .failure
            .lock()
            .map_err(|_| "mock notifier is poisoned")?
            .clone();
        if let Some(message) = failure {
            return Err(message.into());
        }

        let message = item_available_message(item);
        tracing::info!(user_id = %user_id, item_id = %item.id, "{}", message);

        self.sent
            .lock()
            .map_err(|_| "mock notifier is poisoned")?
            .push(SentNotification {
                user_id: user_id.clone(),
                item_id: item.id,
                message,
            });
        Ok(())
    }
}
