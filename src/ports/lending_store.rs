use crate::domain::{Item, ItemId, NewItem, NewReservation, Reservation, UserId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出ストアポート
///
/// 資料（Item）と予約（Reservation）の永続化を抽象化する。
/// 貸出状態を変更する操作は必ず`begin()`で得た作業単位の中で行う。
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// 作業単位（トランザクション）を開始する
    ///
    /// 返された作業単位は`commit()`されずに破棄された場合、すべての変更を破棄する。
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWork>>;

    /// 資料を登録する（IDを採番し、貸出可能状態で保存）
    async fn create_item(&self, item: NewItem) -> Result<Item>;

    /// 資料を削除する
    ///
    /// その資料の予約もすべて削除される。
    /// 資料が存在した場合は`true`を返す。
    async fn delete_item(&self, item_id: ItemId) -> Result<bool>;

    /// IDで資料を取得する
    async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>>;

    /// すべての資料をID順で取得する
    async fn list_items(&self) -> Result<Vec<Item>>;

    /// 資料の予約を待ち行列の順（作成日時、ID）で取得する
    ///
    /// すべてのステータスを含む。
    async fn list_reservations(&self, item_id: ItemId) -> Result<Vec<Reservation>>;
}

/// 作業単位ポート
///
/// 1つの資料に対する読み取り・変更・書き込みを原子的に行う。
/// `lock_item`で取得した資料に対する他の作業単位の操作は、
/// この作業単位が終了するまで待たされる。
#[async_trait]
pub trait LendingUnitOfWork: Send {
    /// 資料を排他的に取得する
    ///
    /// 1つの作業単位でロックできる資料は1つだけ。
    async fn lock_item(&mut self, item_id: ItemId) -> Result<Option<Item>>;

    /// 利用者の待機中予約を取得する
    async fn find_pending_reservation(
        &mut self,
        item_id: ItemId,
        user_id: &UserId,
    ) -> Result<Option<Reservation>>;

    /// 待ち行列の先頭（最も古い待機中予約）を取得する
    async fn next_pending_reservation(&mut self, item_id: ItemId) -> Result<Option<Reservation>>;

    /// 資料の貸出状態を保存する
    async fn save_item(&mut self, item: &Item) -> Result<()>;

    /// 待機中の予約を作成する（IDを採番）
    async fn create_reservation(&mut self, reservation: NewReservation) -> Result<Reservation>;

    /// 予約のステータスを保存する
    async fn save_reservation_status(&mut self, reservation: &Reservation) -> Result<()>;

    /// 変更を確定する
    async fn commit(&mut self) -> Result<()>;
}
