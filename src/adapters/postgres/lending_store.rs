use crate::domain::{Item, ItemId, NewItem, NewReservation, Reservation, UserId};
use crate::ports::lending_store::{
    LendingStore as LendingStoreTrait, LendingUnitOfWork as LendingUnitOfWorkTrait, Result,
};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::item_repository::ItemRepository;
use super::reservation_repository::ReservationRepository;

/// LendingStoreのPostgreSQL実装
///
/// 作業単位はPostgreSQLのトランザクションに対応し、
/// 資料の行ロック（SELECT ... FOR UPDATE）で同一資料への操作を直列化する。
pub struct LendingStore {
    pool: PgPool,
}

impl LendingStore {
    /// PostgreSQLコネクションプールから新しいLendingStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LendingStoreTrait for LendingStore {
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWorkTrait>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(UnitOfWork {
            tx: Some(tx),
            locked_item: None,
        }))
    }

    async fn create_item(&self, item: NewItem) -> Result<Item> {
        let mut conn = self.pool.acquire().await?;
        ItemRepository::new(&mut conn).create(&item).await
    }

    /// 資料を削除する
    ///
    /// 予約は外部キーのON DELETE CASCADEで削除される。
    async fn delete_item(&self, item_id: ItemId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        ItemRepository::new(&mut conn).delete(item_id.value()).await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        ItemRepository::new(&mut conn).get(item_id.value()).await
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        ItemRepository::new(&mut conn).list().await
    }

    async fn list_reservations(&self, item_id: ItemId) -> Result<Vec<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        ReservationRepository::new(&mut conn)
            .list_for_item(item_id)
            .await
    }
}

/// PostgreSQLトランザクションによる作業単位
///
/// `commit()`されずに破棄された場合、sqlxのTransactionがロールバックする。
struct UnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
    locked_item: Option<ItemId>,
}

impl UnitOfWork {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err("unit of work already committed".into()),
        }
    }

    /// ロック済みの資料に対する操作であることを確認する
    fn ensure_locked(&self, item_id: ItemId) -> Result<()> {
        if self.locked_item == Some(item_id) {
            Ok(())
        } else {
            Err(format!("item {} is not locked by this unit of work", item_id).into())
        }
    }
}

#[async_trait]
impl LendingUnitOfWorkTrait for UnitOfWork {
    async fn lock_item(&mut self, item_id: ItemId) -> Result<Option<Item>> {
        if let Some(locked) = self.locked_item {
            if locked != item_id {
                return Err(format!(
                    "unit of work already holds item {}, cannot lock item {}",
                    locked, item_id
                )
                .into());
            }
        }

        let item = ItemRepository::new(self.conn()?).lock(item_id).await?;
        self.locked_item = Some(item_id);
        Ok(item)
    }

    async fn find_pending_reservation(
        &mut self,
        item_id: ItemId,
        user_id: &UserId,
    ) -> Result<Option<Reservation>> {
        ReservationRepository::new(self.conn()?)
            .find_pending(item_id, user_id)
            .await
    }

    async fn next_pending_reservation(&mut self, item_id: ItemId) -> Result<Option<Reservation>> {
        ReservationRepository::new(self.conn()?)
            .next_pending(item_id)
            .await
    }

    async fn save_item(&mut self, item: &Item) -> Result<()> {
        self.ensure_locked(item.id)?;
        ItemRepository::new(self.conn()?).save_state(item).await
    }

    async fn create_reservation(&mut self, reservation: NewReservation) -> Result<Reservation> {
        self.ensure_locked(reservation.item_id)?;
        ReservationRepository::new(self.conn()?)
            .create(&reservation)
            .await
    }

    async fn save_reservation_status(&mut self, reservation: &Reservation) -> Result<()> {
        self.ensure_locked(reservation.item_id)?;
        ReservationRepository::new(self.conn()?)
            .save_status(reservation)
            .await
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or("unit of work already committed")?;
        tx.commit().await?;
        Ok(())
    }
}
