use crate::domain::{self, Item, Reservation, UserId, commands::*, lending::BorrowDecision};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{LendingApplicationError, Result};

/// サービスの依存関係
///
/// 振る舞いは持たず、各操作の関数に依存関係として渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub lending_store: Arc<dyn LendingStore>,
}

/// 貸出要求の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// 即時に貸し出した（更新後の資料）
    Borrowed(Item),
    /// 予約待ちに並んだ（作成された予約）
    Queued(Reservation),
}

/// 返却の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    /// 更新後の資料
    pub item: Item,
    /// 繰り上げで新しい借り手になった利用者（いない場合は`None`）
    pub promoted_user_id: Option<UserId>,
}

/// 資料を借りる。貸出中なら予約待ちに並ぶ
///
/// ビジネスルール：
/// - 資料が存在すること
/// - 借りている本人でないこと
/// - 同じ資料に待機中の予約を持っていないこと
///
/// 資料の行をロックした作業単位の中で判断と保存を行う。
/// 変更されるのは資料1件、または作成される予約1件のみ。通知は行わない。
#[tracing::instrument(skip(deps), fields(item_id = %cmd.item_id, user_id = %cmd.user_id))]
pub async fn borrow_or_queue(
    deps: &ServiceDependencies,
    cmd: BorrowOrQueue,
) -> Result<BorrowOutcome> {
    let mut uow = deps
        .lending_store
        .begin()
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    // 1. 資料をロックして取得
    let item = uow
        .lock_item(cmd.item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?
        .ok_or(LendingApplicationError::ItemNotFound)?;

    // 2. 既存の予約を確認
    let already_queued = uow
        .find_pending_reservation(cmd.item_id, &cmd.user_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?
        .is_some();

    // 3. 純粋関数で判断
    let decision = domain::lending::borrow_or_queue(item, cmd.user_id, already_queued)?;

    // 4. 保存してコミット
    let outcome = match decision {
        BorrowDecision::Lend(item) => {
            uow.save_item(&item)
                .await
                .map_err(LendingApplicationError::StorageFailure)?;
            BorrowOutcome::Borrowed(item)
        }
        BorrowDecision::Enqueue(new_reservation) => {
            let reservation = uow
                .create_reservation(new_reservation)
                .await
                .map_err(LendingApplicationError::StorageFailure)?;
            BorrowOutcome::Queued(reservation)
        }
    };

    uow.commit()
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    match &outcome {
        BorrowOutcome::Borrowed(_) => tracing::info!("item borrowed"),
        BorrowOutcome::Queued(reservation) => {
            tracing::info!(reservation_id = %reservation.id, "user queued for item")
        }
    }

    Ok(outcome)
}

/// 資料を返却し、予約待ちの先頭に繰り上げる
///
/// ビジネスルール：
/// - 資料が存在すること
/// - 貸出中であること
/// - 借りている本人であること
///
/// 返却・予約のfulfilled化・新しい借り手への貸出は1つの作業単位で行い、
/// 途中の「貸出可能」状態は他の操作から観測されない。
/// 繰り上げられた利用者への通知は呼び出し元の責務。
#[tracing::instrument(skip(deps), fields(item_id = %cmd.item_id, user_id = %cmd.user_id))]
pub async fn return_item(deps: &ServiceDependencies, cmd: ReturnItem) -> Result<ReturnOutcome> {
    let mut uow = deps
        .lending_store
        .begin()
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    // 1. 資料をロックして取得
    let item = uow
        .lock_item(cmd.item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?
        .ok_or(LendingApplicationError::ItemNotFound)?;

    // 2. 予約待ちの先頭を取得
    let queue_head = uow
        .next_pending_reservation(cmd.item_id)
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    // 3. 純粋関数で状態遷移（返却可否の判定を含む）
    let transition = domain::lending::return_item(item, &cmd.user_id, queue_head)?;

    // 4. 保存してコミット
    if let Some(fulfilled) = &transition.fulfilled {
        uow.save_reservation_status(fulfilled)
            .await
            .map_err(LendingApplicationError::StorageFailure)?;
    }
    uow.save_item(&transition.item)
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    uow.commit()
        .await
        .map_err(LendingApplicationError::StorageFailure)?;

    let promoted_user_id = transition.promoted_user_id().cloned();
    match &promoted_user_id {
        Some(next) => {
            tracing::info!(promoted_user_id = %next, "item returned and handed to next in queue")
        }
        None => tracing::info!("item returned and available"),
    }

    Ok(ReturnOutcome {
        item: transition.item,
        promoted_user_id,
    })
}
