use crate::domain::{
    ItemId, NewReservation, Reservation, ReservationId, ReservationStatus, UserId,
};
use crate::ports::lending_store::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

use super::repository::{Entity, Repository, invalid_data};

/// 予約リポジトリ
pub type ReservationRepository<'c> = Repository<'c, Reservation>;

impl Entity for Reservation {
    const TABLE: &'static str = "reservations";
    const COLUMNS: &'static str = "id, item_id, user_id, created_at, status";
    const ORDER_BY: &'static str = "created_at ASC, id ASC";

    fn from_row(row: &PgRow) -> Result<Self> {
        let status: String = row.try_get("status")?;
        let status = ReservationStatus::from_str(&status).map_err(invalid_data)?;
        let user_id: String = row.try_get("user_id")?;

        Ok(Reservation {
            id: ReservationId::from_i64(row.try_get("id")?),
            item_id: ItemId::from_i64(row.try_get("item_id")?),
            user_id: UserId::parse(user_id)?,
            created_at: row.try_get("created_at")?,
            status,
        })
    }
}

impl Repository<'_, Reservation> {
    /// 待機中の予約を作成する
    ///
    /// 作成日時は挿入時点の`clock_timestamp()`。`NOW()`はトランザクション開始時刻で、
    /// 資料ロックの待ち時間より前になるため使わない。
    pub async fn create(&mut self, reservation: &NewReservation) -> Result<Reservation> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO reservations (item_id, user_id, created_at, status)
            VALUES ($1, $2, clock_timestamp(), $3)
            RETURNING id, created_at
            "#,
        )
        .bind(reservation.item_id.value())
        .bind(reservation.user_id.as_str())
        .bind(ReservationStatus::Pending.as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(reservation
            .clone()
            .into_reservation(ReservationId::from_i64(id), created_at))
    }

    /// 利用者の待機中予約を取得する
    pub async fn find_pending(
        &mut self,
        item_id: ItemId,
        user_id: &UserId,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT id, item_id, user_id, created_at, status
            FROM reservations
            WHERE item_id = $1 AND user_id = $2 AND status = 'pending'
            "#,
        )
        .bind(item_id.value())
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.conn)
        .await?;

        row.as_ref().map(Reservation::from_row).transpose()
    }

    /// 待ち行列の先頭を取得する
    ///
    /// (item_id, status, created_at, id)のインデックスを使用する。
    pub async fn next_pending(&mut self, item_id: ItemId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT id, item_id, user_id, created_at, status
            FROM reservations
            WHERE item_id = $1 AND status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&mut *self.conn)
        .await?;

        row.as_ref().map(Reservation::from_row).transpose()
    }

    /// 資料の予約を待ち行列の順で取得する
    pub async fn list_for_item(&mut self, item_id: ItemId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, item_id, user_id, created_at, status
            FROM reservations
            WHERE item_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(item_id.value())
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(Reservation::from_row).collect()
    }

    /// ステータスを保存する
    pub async fn save_status(&mut self, reservation: &Reservation) -> Result<()> {
        let result = sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(reservation.id.value())
            .bind(reservation.status.as_str())
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_data(format!(
                "reservation {} no longer exists",
                reservation.id
            )));
        }
        Ok(())
    }
}
