use crate::application::lending::{
    ServiceDependencies, borrow_or_queue as execute_borrow_or_queue,
    create_item as execute_create_item, delete_item as execute_delete_item, get_item as query_item,
    list_items as query_items, list_reservations as query_reservations,
    return_item as execute_return_item,
};
use crate::domain::commands::{BorrowOrQueue, DeleteItem, ReturnItem};
use crate::domain::{ItemId, UserId};
use crate::ports::NotificationService;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    error::ApiError,
    types::{
        BorrowResponse, CreateItemRequest, ItemListResponse, ItemResponse, MessageResponse,
        ReservationResponse, ReturnResponse, UserQuery,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
    pub notification_service: Arc<dyn NotificationService>,
}

// ============================================================================
// Command handlers (POST / DELETE)
// ============================================================================

/// POST /items - 資料を登録
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let item = execute_create_item(&state.service_deps, req.to_command()).await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// DELETE /items/:id - 資料を削除（予約も削除される）
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let cmd = DeleteItem {
        item_id: ItemId::from_i64(item_id),
    };

    execute_delete_item(&state.service_deps, cmd).await?;

    Ok(Json(MessageResponse {
        message: "Item deleted".to_string(),
    }))
}

/// POST /items/:id/borrow?user_id=U - 資料を借りる
///
/// 貸出可能なら即時に貸し出して200、貸出中なら予約待ちに並べて202を返す。
///
/// 強制されるビジネスルール:
/// - 借りている本人は再度借りられない（403）
/// - 同じ資料の予約待ちには1回しか並べない（400）
pub async fn borrow_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Result<(StatusCode, Json<BorrowResponse>), ApiError> {
    let cmd = BorrowOrQueue {
        item_id: ItemId::from_i64(item_id),
        user_id: UserId::parse(query.user_id.unwrap_or_default())?,
    };

    let response = BorrowResponse::from(execute_borrow_or_queue(&state.service_deps, cmd).await?);
    let status = match response {
        BorrowResponse::Borrowed { .. } => StatusCode::OK,
        BorrowResponse::Queued { .. } => StatusCode::ACCEPTED,
    };

    Ok((status, Json(response)))
}

/// POST /items/:id/return?user_id=U - 資料を返却
///
/// 予約待ちがあれば先頭の利用者に繰り上げ、その利用者に通知する。
/// 通知の失敗はログに記録するのみで、返却自体は成功として扱う。
pub async fn return_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let cmd = ReturnItem {
        item_id: ItemId::from_i64(item_id),
        user_id: UserId::parse(query.user_id.unwrap_or_default())?,
    };

    let outcome = execute_return_item(&state.service_deps, cmd).await?;

    if let Some(next) = &outcome.promoted_user_id {
        if let Err(e) = state
            .notification_service
            .send_item_available(next, &outcome.item)
            .await
        {
            tracing::warn!(
                item_id = %outcome.item.id,
                user_id = %next,
                "Failed to notify promoted user: {}",
                e
            );
        }
    }

    Ok(Json(ReturnResponse::from(outcome)))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /items - 資料一覧をID順で取得
pub async fn list_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ItemListResponse>, ApiError> {
    let items = query_items(&state.service_deps).await?;

    Ok(Json(ItemListResponse {
        items: items.into_iter().map(ItemResponse::from).collect(),
    }))
}

/// GET /items/:id - 資料をIDで取得
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = query_item(&state.service_deps, ItemId::from_i64(item_id)).await?;

    Ok(Json(ItemResponse::from(item)))
}

/// GET /items/:id/reservations - 資料の予約を待ち行列の順で取得
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let reservations = query_reservations(&state.service_deps, ItemId::from_i64(item_id)).await?;

    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}
