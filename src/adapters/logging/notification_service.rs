use crate::domain::{Item, UserId};
use crate::ports::notification_service::{
    NotificationService as NotificationServiceTrait, Result, item_available_message,
};
use async_trait::async_trait;

/// ログ出力だけを行うNotificationService
///
/// 配信先を持たない環境向け。状態を持たないため、送信回数に関係なくメモリを消費しない。
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn send_item_available(&self, user_id: &UserId, item: &Item) -> Result<()> {
        tracing::info!(
            user_id = %user_id,
            item_id = %item.id,
            "{}",
            item_available_message(item)
        );
        Ok(())
    }
}
