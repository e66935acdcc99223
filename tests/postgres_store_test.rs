//! PostgreSQLストアの統合テスト
//!
//! DATABASE_URLのデータベースが必要なため既定では実行しない。
//! `cargo test -- --ignored` で実行する。

use rusty_library_reservations::adapters::postgres::{ItemRepository, PostgresLendingStore};
use rusty_library_reservations::application::lending::{
    BorrowOutcome, LendingApplicationError, ServiceDependencies, borrow_or_queue, return_item,
};
use rusty_library_reservations::domain::commands::*;
use rusty_library_reservations::domain::*;
use rusty_library_reservations::ports::{LendingStore, LendingUnitOfWork};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

mod common;

/// データベースのクリーンアップ
async fn cleanup_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE reservations, items RESTART IDENTITY CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");
}

async fn setup() -> (PgPool, PostgresLendingStore) {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let store = PostgresLendingStore::new(pool.clone());
    (pool, store)
}

fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_create_get_list_delete_item() {
    let (_pool, store) = setup().await;

    let dune = store
        .create_item(NewItem::new("Dune", "Herbert").unwrap())
        .await
        .unwrap();
    let solaris = store
        .create_item(NewItem::new("Solaris", "Lem").unwrap())
        .await
        .unwrap();
    assert!(dune.id < solaris.id);

    let fetched = store.get_item(dune.id).await.unwrap();
    assert_eq!(fetched, Some(dune.clone()));

    let items = store.list_items().await.unwrap();
    assert_eq!(items, vec![dune.clone(), solaris]);

    assert!(store.delete_item(dune.id).await.unwrap());
    assert!(!store.delete_item(dune.id).await.unwrap());
    assert_eq!(store.get_item(dune.id).await.unwrap(), None);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_uncommitted_unit_of_work_is_rolled_back() {
    let (_pool, store) = setup().await;
    let item = store
        .create_item(NewItem::new("Dune", "Herbert").unwrap())
        .await
        .unwrap();

    {
        let mut uow = store.begin().await.unwrap();
        let mut locked = uow.lock_item(item.id).await.unwrap().unwrap();
        locked.state = ItemState::Borrowed { holder: user("u1") };
        uow.save_item(&locked).await.unwrap();
    }

    let stored = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ItemState::Available);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_lending_flow_and_cascade() {
    let (_pool, store) = setup().await;
    let item = store
        .create_item(NewItem::new("Dune", "Herbert").unwrap())
        .await
        .unwrap();
    let store: Arc<dyn LendingStore> = Arc::new(store);
    let deps = ServiceDependencies {
        lending_store: store.clone(),
    };

    for u in ["u1", "u2", "u3"] {
        borrow_or_queue(
            &deps,
            BorrowOrQueue {
                item_id: item.id,
                user_id: user(u),
            },
        )
        .await
        .unwrap();
    }

    let duplicate = borrow_or_queue(
        &deps,
        BorrowOrQueue {
            item_id: item.id,
            user_id: user("u2"),
        },
    )
    .await;
    assert!(matches!(
        duplicate,
        Err(LendingApplicationError::AlreadyQueued)
    ));

    let outcome = return_item(
        &deps,
        ReturnItem {
            item_id: item.id,
            user_id: user("u1"),
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome.promoted_user_id, Some(user("u2")));
    assert_eq!(outcome.item.holder(), Some(&user("u2")));

    let statuses: Vec<(String, ReservationStatus)> = store
        .list_reservations(item.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.user_id.to_string(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("u2".to_string(), ReservationStatus::Fulfilled),
            ("u3".to_string(), ReservationStatus::Pending),
        ]
    );

    assert!(store.delete_item(item.id).await.unwrap());
    assert!(store.list_reservations(item.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_returned_reservation_matches_stored_row() {
    let (_pool, store) = setup().await;
    let item = store
        .create_item(NewItem::new("Dune", "Herbert").unwrap())
        .await
        .unwrap();

    let mut created = Vec::new();
    for u in ["first", "second"] {
        let mut uow = store.begin().await.unwrap();
        uow.lock_item(item.id).await.unwrap();
        created.push(
            uow.create_reservation(NewReservation {
                item_id: item.id,
                user_id: user(u),
            })
            .await
            .unwrap(),
        );
        uow.commit().await.unwrap();
    }

    // 作成時の値はマイクロ秒精度まで保存済みの行と一致する
    let stored = store.list_reservations(item.id).await.unwrap();
    assert_eq!(stored, created);
    assert!(stored[0].created_at <= stored[1].created_at);

    let mut uow = store.begin().await.unwrap();
    uow.lock_item(item.id).await.unwrap();
    let head = uow.next_pending_reservation(item.id).await.unwrap();
    assert_eq!(head.as_ref(), created.first());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[ignore]
async fn test_concurrent_borrows_lend_exactly_once() {
    let (_pool, store) = setup().await;
    let item = store
        .create_item(NewItem::new("Dune", "Herbert").unwrap())
        .await
        .unwrap();
    let deps = ServiceDependencies {
        lending_store: Arc::new(store),
    };

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let deps = deps.clone();
            tokio::spawn(async move {
                borrow_or_queue(
                    &deps,
                    BorrowOrQueue {
                        item_id: item.id,
                        user_id: user(&format!("user{}", i)),
                    },
                )
                .await
            })
        })
        .collect();

    let borrowed = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(BorrowOutcome::Borrowed(_)))))
        .count();

    assert_eq!(borrowed, 1);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_inconsistent_row_is_rejected() {
    let (pool, _store) = setup().await;

    // CHECK制約を外した状態の行は読み出し時に検出する
    sqlx::query("ALTER TABLE items DROP CONSTRAINT items_borrowed_has_holder")
        .execute(&pool)
        .await
        .unwrap();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO items (title, author, is_borrowed, holder_user_id) VALUES ('Dune', 'Herbert', TRUE, NULL) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let result = ItemRepository::new(&mut conn).get(id).await;

    sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "ALTER TABLE items ADD CONSTRAINT items_borrowed_has_holder CHECK (is_borrowed = (holder_user_id IS NOT NULL))",
    )
    .execute(&pool)
    .await
    .unwrap();

    assert!(result.is_err());
}
