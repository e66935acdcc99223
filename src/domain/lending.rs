use super::{
    BorrowError, Item, ItemState, NewReservation, Reservation, ReturnError, UserId,
};

// ============================================================================
// 資料の状態遷移
//
//   Available   --borrow(u)-->  Borrowed(u)
//   Borrowed(u) --borrow(v)-->  Borrowed(u)  （vは予約待ちに並ぶ）
//   Borrowed(u) --return(u)-->  Available            （予約待ちなし）
//   Borrowed(u) --return(u)-->  Borrowed(u')         （u' = 予約待ちの先頭）
// ============================================================================

/// 貸出要求に対する判断結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowDecision {
    /// 貸し出す（更新後の資料）
    Lend(Item),
    /// 予約待ちに並べる（資料の状態は変えない）
    Enqueue(NewReservation),
}

/// 純粋関数：貸出または予約を判断する
///
/// ビジネスルール：
/// - 借りている本人は再度借りられない
/// - 同じ資料に待機中の予約がある利用者は重複して並べない
/// - 貸出可能なら即時貸出、貸出中なら予約待ちに並ぶ
///
/// # 引数
/// * `item` - 現在の資料
/// * `user_id` - 要求した利用者
/// * `already_queued` - この利用者がこの資料に待機中の予約を持っているか
pub fn borrow_or_queue(
    item: Item,
    user_id: UserId,
    already_queued: bool,
) -> Result<BorrowDecision, BorrowError> {
    if item.is_held_by(&user_id) {
        return Err(BorrowError::AlreadyHolder);
    }

    if already_queued {
        return Err(BorrowError::AlreadyQueued);
    }

    match item.state {
        ItemState::Available => Ok(BorrowDecision::Lend(Item {
            state: ItemState::Borrowed { holder: user_id },
            ..item
        })),
        ItemState::Borrowed { .. } => Ok(BorrowDecision::Enqueue(NewReservation {
            item_id: item.id,
            user_id,
        })),
    }
}

/// 返却による状態遷移の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTransition {
    /// 更新後の資料
    pub item: Item,
    /// 繰り上げられた予約（fulfilled済み）
    pub fulfilled: Option<Reservation>,
}

impl ReturnTransition {
    /// 繰り上げで新しい借り手になった利用者
    pub fn promoted_user_id(&self) -> Option<&UserId> {
        self.fulfilled.as_ref().map(|r| &r.user_id)
    }
}

/// 純粋関数：資料を返却し、予約待ちの先頭を繰り上げる
///
/// ビジネスルール：
/// - 貸出中であること
/// - 借りている本人であること
/// - 予約待ちがあれば、先頭の予約をfulfilledにしてその利用者に貸し出す
///
/// 返却と繰り上げは1つの遷移として扱い、中間の「貸出可能」状態は外部に現れない。
///
/// # 引数
/// * `item` - 現在の資料
/// * `user_id` - 返却する利用者
/// * `queue_head` - この資料の待機中予約のうち最も古いもの
pub fn return_item(
    item: Item,
    user_id: &UserId,
    queue_head: Option<Reservation>,
) -> Result<ReturnTransition, ReturnError> {
    match &item.state {
        ItemState::Available => return Err(ReturnError::NotBorrowed),
        ItemState::Borrowed { holder } if holder != user_id => {
            return Err(ReturnError::NotHolder);
        }
        ItemState::Borrowed { .. } => {}
    }

    let Some(next) = queue_head else {
        return Ok(ReturnTransition {
            item: Item {
                state: ItemState::Available,
                ..item
            },
            fulfilled: None,
        });
    };

    if next.item_id != item.id {
        return Err(ReturnError::InvalidQueueHead(next.id));
    }
    let next_id = next.id;
    let fulfilled = next
        .fulfil()
        .map_err(|_| ReturnError::InvalidQueueHead(next_id))?;

    Ok(ReturnTransition {
        item: Item {
            state: ItemState::Borrowed {
                holder: fulfilled.user_id.clone(),
            },
            ..item
        },
        fulfilled: Some(fulfilled),
    })
}
