use crate::domain::{
    Item, ItemId, NewItem, NewReservation, Reservation, ReservationId, UserId, queue_head,
};
use crate::ports::lending_store::{
    LendingStore as LendingStoreTrait, LendingUnitOfWork as LendingUnitOfWorkTrait, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// コミット済みのデータ
#[derive(Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

struct Shared {
    tables: Mutex<Tables>,
    /// 資料ごとの排他ロック
    item_locks: Mutex<HashMap<ItemId, Arc<AsyncMutex<()>>>>,
    next_item_id: AtomicI64,
    next_reservation_id: AtomicI64,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| "in-memory lending store is poisoned".into())
    }

    /// 資料のロックを取得する（資料が存在しない場合は`None`）
    ///
    /// ロック表は存在する資料の分だけ持つ。ロックの順序は item_locks → tables。
    fn item_lock(&self, item_id: ItemId) -> Result<Option<Arc<AsyncMutex<()>>>> {
        let mut locks = self
            .item_locks
            .lock()
            .map_err(|_| "in-memory lock table is poisoned")?;
        if let Some(lock) = locks.get(&item_id) {
            return Ok(Some(Arc::clone(lock)));
        }
        if !self.tables()?.items.contains_key(&item_id) {
            return Ok(None);
        }
        Ok(Some(Arc::clone(locks.entry(item_id).or_default())))
    }

    fn forget_item_lock(&self, item_id: ItemId) -> Result<()> {
        let mut locks = self
            .item_locks
            .lock()
            .map_err(|_| "in-memory lock table is poisoned")?;
        locks.remove(&item_id);
        Ok(())
    }
}

/// LendingStoreのインメモリ実装
///
/// プロセス内で完結するストア。再起動でデータは失われる。
/// 同一資料への作業単位は資料ごとの非同期Mutexで直列化し、
/// 異なる資料への作業単位は並行に実行できる。
/// IDは1から単調増加で採番する（ロールバックされた採番は再利用しない）。
pub struct LendingStore {
    shared: Arc<Shared>,
}

impl LendingStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                item_locks: Mutex::new(HashMap::new()),
                next_item_id: AtomicI64::new(1),
                next_reservation_id: AtomicI64::new(1),
            }),
        }
    }
}

impl Default for LendingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LendingStoreTrait for LendingStore {
    async fn begin(&self) -> Result<Box<dyn LendingUnitOfWorkTrait>> {
        Ok(Box::new(UnitOfWork {
            shared: Arc::clone(&self.shared),
            guard: None,
            locked_item: None,
            staged_item: None,
            staged_reservations: BTreeMap::new(),
            committed: false,
        }))
    }

    async fn create_item(&self, item: NewItem) -> Result<Item> {
        let id = ItemId::from_i64(self.shared.next_item_id.fetch_add(1, Ordering::SeqCst));
        let item = item.into_item(id);
        self.shared.tables()?.items.insert(id, item.clone());
        Ok(item)
    }

    /// 資料と予約を削除する
    ///
    /// 進行中の作業単位と競合しないよう、資料ロックを取得してから削除する。
    async fn delete_item(&self, item_id: ItemId) -> Result<bool> {
        let Some(lock) = self.shared.item_lock(item_id)? else {
            return Ok(false);
        };
        let _guard = lock.lock().await;

        let existed = {
            let mut tables = self.shared.tables()?;
            let existed = tables.items.remove(&item_id).is_some();
            tables.reservations.retain(|_, r| r.item_id != item_id);
            existed
        };
        self.shared.forget_item_lock(item_id)?;
        Ok(existed)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        Ok(self.shared.tables()?.items.get(&item_id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.shared.tables()?.items.values().cloned().collect())
    }

    async fn list_reservations(&self, item_id: ItemId) -> Result<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .shared
            .tables()?
            .reservations
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect();
        reservations.sort_by_key(Reservation::queue_key);
        Ok(reservations)
    }
}

/// インメモリの作業単位
///
/// 変更はコミットまで手元に保持し、コミット時にまとめて反映する。
/// コミットせずに破棄した場合は変更を捨て、資料ロックを解放する。
struct UnitOfWork {
    shared: Arc<Shared>,
    guard: Option<OwnedMutexGuard<()>>,
    locked_item: Option<ItemId>,
    staged_item: Option<Item>,
    staged_reservations: BTreeMap<ReservationId, Reservation>,
    committed: bool,
}

impl UnitOfWork {
    fn ensure_open(&self) -> Result<()> {
        if self.committed {
            return Err("unit of work already committed".into());
        }
        Ok(())
    }

    fn ensure_locked(&self, item_id: ItemId) -> Result<()> {
        self.ensure_open()?;
        if self.locked_item == Some(item_id) && self.guard.is_some() {
            Ok(())
        } else {
            Err(format!("item {} is not locked by this unit of work", item_id).into())
        }
    }

    /// コミット済みの予約に未コミットの変更を重ねた、資料の予約一覧
    fn reservations_for(&self, item_id: ItemId) -> Result<Vec<Reservation>> {
        let mut merged: BTreeMap<ReservationId, Reservation> = self
            .shared
            .tables()?
            .reservations
            .values()
            .filter(|r| r.item_id == item_id)
            .map(|r| (r.id, r.clone()))
            .collect();

        for (id, reservation) in &self.staged_reservations {
            if reservation.item_id == item_id {
                merged.insert(*id, reservation.clone());
            }
        }

        Ok(merged.into_values().collect())
    }
}

#[async_trait]
impl LendingUnitOfWorkTrait for UnitOfWork {
    async fn lock_item(&mut self, item_id: ItemId) -> Result<Option<Item>> {
        self.ensure_open()?;

        match self.locked_item {
            Some(locked) if locked != item_id => {
                return Err(format!(
                    "unit of work already holds item {}, cannot lock item {}",
                    locked, item_id
                )
                .into());
            }
            Some(_) => {}
            None => {
                let Some(lock) = self.shared.item_lock(item_id)? else {
                    return Ok(None);
                };
                self.guard = Some(lock.lock_owned().await);
                self.locked_item = Some(item_id);
            }
        }

        if let Some(staged) = &self.staged_item {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.tables()?.items.get(&item_id).cloned())
    }

    async fn find_pending_reservation(
        &mut self,
        item_id: ItemId,
        user_id: &UserId,
    ) -> Result<Option<Reservation>> {
        self.ensure_open()?;
        Ok(self
            .reservations_for(item_id)?
            .into_iter()
            .find(|r| r.status.is_pending() && &r.user_id == user_id))
    }

    async fn next_pending_reservation(&mut self, item_id: ItemId) -> Result<Option<Reservation>> {
        self.ensure_open()?;
        let reservations = self.reservations_for(item_id)?;
        Ok(queue_head(&reservations).cloned())
    }

    async fn save_item(&mut self, item: &Item) -> Result<()> {
        self.ensure_locked(item.id)?;
        self.staged_item = Some(item.clone());
        Ok(())
    }

    async fn create_reservation(&mut self, reservation: NewReservation) -> Result<Reservation> {
        self.ensure_locked(reservation.item_id)?;
        let id = ReservationId::from_i64(
            self.shared
                .next_reservation_id
                .fetch_add(1, Ordering::SeqCst),
        );
        let reservation = reservation.into_reservation(id, Utc::now());
        self.staged_reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn save_reservation_status(&mut self, reservation: &Reservation) -> Result<()> {
        self.ensure_locked(reservation.item_id)?;
        self.staged_reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;

        {
            let mut tables = self.shared.tables()?;
            let item_exists = self
                .locked_item
                .is_some_and(|id| tables.items.contains_key(&id));

            // 削除済みの資料は復活させない
            if item_exists {
                if let Some(item) = self.staged_item.take() {
                    tables.items.insert(item.id, item);
                }
                for (id, reservation) in std::mem::take(&mut self.staged_reservations) {
                    tables.reservations.insert(id, reservation);
                }
            }
        }

        self.committed = true;
        self.guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemState, ReservationStatus};

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    async fn store_with_item() -> (LendingStore, Item) {
        let store = LendingStore::new();
        let item = store
            .create_item(NewItem::new("Dune", "Herbert").unwrap())
            .await
            .unwrap();
        (store, item)
    }

    #[tokio::test]
    async fn test_create_item_assigns_increasing_ids() {
        let store = LendingStore::new();
        let first = store
            .create_item(NewItem::new("Dune", "Herbert").unwrap())
            .await
            .unwrap();
        let second = store
            .create_item(NewItem::new("Solaris", "Lem").unwrap())
            .await
            .unwrap();

        assert!(first.id < second.id);
        assert_eq!(first.state, ItemState::Available);

        let items = store.list_items().await.unwrap();
        assert_eq!(items, vec![first, second]);
    }

    #[tokio::test]
    async fn test_committed_changes_are_visible() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        let mut locked = uow.lock_item(item.id).await.unwrap().unwrap();
        locked.state = ItemState::Borrowed { holder: user("u1") };
        uow.save_item(&locked).await.unwrap();
        uow.commit().await.unwrap();

        let stored = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(stored.holder(), Some(&user("u1")));
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let (store, item) = store_with_item().await;

        {
            let mut uow = store.begin().await.unwrap();
            let mut locked = uow.lock_item(item.id).await.unwrap().unwrap();
            locked.state = ItemState::Borrowed { holder: user("u1") };
            uow.save_item(&locked).await.unwrap();
            uow.create_reservation(NewReservation {
                item_id: item.id,
                user_id: user("u2"),
            })
            .await
            .unwrap();
            // commitせずに破棄
        }

        let stored = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ItemState::Available);
        assert!(store.list_reservations(item.id).await.unwrap().is_empty());

        // ロックも解放されている
        let mut uow = store.begin().await.unwrap();
        assert!(uow.lock_item(item.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unit_of_work_reads_its_own_writes() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        let created = uow
            .create_reservation(NewReservation {
                item_id: item.id,
                user_id: user("u2"),
            })
            .await
            .unwrap();

        let found = uow
            .find_pending_reservation(item.id, &user("u2"))
            .await
            .unwrap();
        assert_eq!(found, Some(created.clone()));

        let head = uow.next_pending_reservation(item.id).await.unwrap();
        assert_eq!(head, Some(created));
    }

    #[tokio::test]
    async fn test_mutation_requires_lock() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        let result = uow.save_item(&item).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unit_of_work_locks_single_item() {
        let (store, item) = store_with_item().await;
        let other = store
            .create_item(NewItem::new("Solaris", "Lem").unwrap())
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        assert!(uow.lock_item(other.id).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_twice_fails() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        uow.commit().await.unwrap();
        assert!(uow.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_same_item_is_serialized() {
        let (store, item) = store_with_item().await;

        let mut first = store.begin().await.unwrap();
        first.lock_item(item.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), second.lock_item(item.id))
                .await;
        assert!(blocked.is_err(), "second unit of work must wait for the lock");

        first.commit().await.unwrap();
        let unblocked =
            tokio::time::timeout(std::time::Duration::from_secs(1), second.lock_item(item.id))
                .await;
        assert!(unblocked.is_ok());
    }

    #[tokio::test]
    async fn test_different_items_do_not_block() {
        let (store, item) = store_with_item().await;
        let other = store
            .create_item(NewItem::new("Solaris", "Lem").unwrap())
            .await
            .unwrap();

        let mut first = store.begin().await.unwrap();
        first.lock_item(item.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let result =
            tokio::time::timeout(std::time::Duration::from_secs(1), second.lock_item(other.id))
                .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_item_cascades_reservations() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        uow.create_reservation(NewReservation {
            item_id: item.id,
            user_id: user("u2"),
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
        assert_eq!(store.list_reservations(item.id).await.unwrap().len(), 1);

        assert!(store.delete_item(item.id).await.unwrap());
        assert!(store.get_item(item.id).await.unwrap().is_none());
        assert!(store.list_reservations(item.id).await.unwrap().is_empty());

        // 2回目は存在しない
        assert!(!store.delete_item(item.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_reservations_are_stamped_in_creation_order() {
        let (store, item) = store_with_item().await;

        for user_id in ["first", "second", "third"] {
            let mut uow = store.begin().await.unwrap();
            uow.lock_item(item.id).await.unwrap();
            uow.create_reservation(NewReservation {
                item_id: item.id,
                user_id: user(user_id),
            })
            .await
            .unwrap();
            uow.commit().await.unwrap();
        }

        let reservations = store.list_reservations(item.id).await.unwrap();
        let users: Vec<String> = reservations.iter().map(|r| r.user_id.to_string()).collect();
        assert_eq!(users, vec!["first", "second", "third"]);
        for pair in reservations.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_unknown_items_leave_no_lock_entries() {
        let store = LendingStore::new();

        for raw in 1000..1100 {
            let item_id = ItemId::from_i64(raw);
            let mut uow = store.begin().await.unwrap();
            assert!(uow.lock_item(item_id).await.unwrap().is_none());
            assert!(uow.save_item(&Item {
                id: item_id,
                title: "Dune".to_string(),
                author: "Herbert".to_string(),
                state: ItemState::Available,
            })
            .await
            .is_err());
            assert!(!store.delete_item(item_id).await.unwrap());
        }

        assert!(store.shared.item_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_item_releases_its_lock_entry() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(store.shared.item_locks.lock().unwrap().len(), 1);

        assert!(store.delete_item(item.id).await.unwrap());
        let mut uow = store.begin().await.unwrap();
        assert!(uow.lock_item(item.id).await.unwrap().is_none());
        assert!(store.shared.item_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_status_is_committed() {
        let (store, item) = store_with_item().await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        let reservation = uow
            .create_reservation(NewReservation {
                item_id: item.id,
                user_id: user("u2"),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        let fulfilled = reservation.fulfil().unwrap();
        uow.save_reservation_status(&fulfilled).await.unwrap();
        assert!(uow.next_pending_reservation(item.id).await.unwrap().is_none());
        uow.commit().await.unwrap();

        let stored = store.list_reservations(item.id).await.unwrap();
        assert_eq!(stored[0].status, ReservationStatus::Fulfilled);
    }
}
