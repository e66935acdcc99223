use crate::domain::{Item, ItemId, NewItem, Reservation, commands::*};

use super::errors::{LendingApplicationError, Result};
use super::lending_service::ServiceDependencies;

/// 資料を登録する
///
/// タイトルと著者は前後の空白を除いて空でないこと。
/// 登録直後の資料は貸出可能状態。
#[tracing::instrument(skip(deps))]
pub async fn create_item(deps: &ServiceDependencies, cmd: CreateItem) -> Result<Item> {
    let new_item = NewItem::new(cmd.title, cmd.author)?;

    let item = deps
        .lending_store
        .create_item(new_item)
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    tracing::info!(item_id = %item.id, "item created");
    Ok(item)
}

/// 資料を削除する（予約もすべて削除される）
#[tracing::instrument(skip(deps))]
pub async fn delete_item(deps: &ServiceDependencies, cmd: DeleteItem) -> Result<()> {
    let deleted = deps
        .lending_store
        .delete_item(cmd.item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    if !deleted {
        return Err(LendingApplicationError::ItemNotFound);
    }

    tracing::info!("item deleted");
    Ok(())
}

/// IDで資料を取得する
pub async fn get_item(deps: &ServiceDependencies, item_id: ItemId) -> Result<Item> {
    deps.lending_store
        .get_item(item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?
        .ok_or(LendingApplicationError::ItemNotFound)
}

/// すべての資料をID順で取得する
pub async fn list_items(deps: &ServiceDependencies) -> Result<Vec<Item>> {
    deps.lending_store
        .list_items()
        .await
        .map_err(LendingApplicationError::StorageFailure)
}

/// 資料の予約を待ち行列の順（作成日時、ID）で取得する
///
/// 繰り上げ済みの予約も含む。
pub async fn list_reservations(
    deps: &ServiceDependencies,
    item_id: ItemId,
) -> Result<Vec<Reservation>> {
    get_item(deps, item_id).await?;

    deps.lending_store
        .list_reservations(item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)
}
