use super::{ItemId, UserId, ValidationError};

/// 資料の貸出状態
///
/// 「貸出中 ⟺ 借り手が存在する」という不変条件を型で表現する。
/// 借り手のいない貸出中状態や、借り手のいる貸出可能状態は作れない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// 貸出可能
    Available,
    /// 貸出中
    Borrowed { holder: UserId },
}

/// 資料集約 - 貸出対象となる物理的な1冊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub state: ItemState,
}

impl Item {
    pub fn is_borrowed(&self) -> bool {
        matches!(self.state, ItemState::Borrowed { .. })
    }

    /// 現在の借り手
    pub fn holder(&self) -> Option<&UserId> {
        match &self.state {
            ItemState::Available => None,
            ItemState::Borrowed { holder } => Some(holder),
        }
    }

    pub fn is_held_by(&self, user_id: &UserId) -> bool {
        self.holder() == Some(user_id)
    }

    /// 永続化された列（is_borrowed, holder_user_id）から状態を復元する
    ///
    /// 2つの列が矛盾している場合は`None`を返す。
    pub fn state_from_columns(is_borrowed: bool, holder: Option<UserId>) -> Option<ItemState> {
        match (is_borrowed, holder) {
            (false, None) => Some(ItemState::Available),
            (true, Some(holder)) => Some(ItemState::Borrowed { holder }),
            _ => None,
        }
    }
}

/// 新規登録する資料
///
/// 登録直後は常に貸出可能状態。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub author: String,
}

impl NewItem {
    /// # エラー
    /// タイトル・著者が空の場合は`ValidationError`
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into().trim().to_string();
        let author = author.into().trim().to_string();

        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if author.is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }

        Ok(Self { title, author })
    }

    /// 採番されたIDを付与して資料にする
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            title: self.title,
            author: self.author,
            state: ItemState::Available,
        }
    }
}
