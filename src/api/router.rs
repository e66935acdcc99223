use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, borrow_item, create_item, delete_item, get_item, list_items, list_reservations,
    return_item,
};

/// 貸出・予約APIのルーターを作成する
///
/// - GET    /health
/// - POST   /items                      資料の登録
/// - GET    /items                      資料一覧
/// - GET    /items/:id                  資料の取得
/// - DELETE /items/:id                  資料の削除
/// - POST   /items/:id/borrow?user_id=  貸出（貸出中なら予約待ち）
/// - POST   /items/:id/return?user_id=  返却と繰り上げ
/// - GET    /items/:id/reservations     予約待ちの一覧
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/items", post(create_item).get(list_items))
        .route("/items/:id", get(get_item).delete(delete_item))
        .route("/items/:id/borrow", post(borrow_item))
        .route("/items/:id/return", post(return_item))
        .route("/items/:id/reservations", get(list_reservations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
