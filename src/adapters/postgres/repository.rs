use crate::ports::lending_store::Result;
use sqlx::{PgConnection, postgres::PgRow};
use std::marker::PhantomData;

/// テーブルに対応するエンティティ
///
/// 汎用リポジトリが取得・一覧・削除を行うための最小限の情報を持つ。
pub trait Entity: Sized + Send {
    /// テーブル名
    const TABLE: &'static str;
    /// SELECTする列
    const COLUMNS: &'static str;
    /// 一覧取得時の並び順
    const ORDER_BY: &'static str = "id ASC";

    fn from_row(row: &PgRow) -> Result<Self>;
}

/// 汎用リポジトリ
///
/// コネクション（またはトランザクション）を借用して操作する。
/// 資料・予約それぞれに固有の操作は、具体型に対するimplブロックで追加する。
pub struct Repository<'c, T> {
    pub(super) conn: &'c mut PgConnection,
    _entity: PhantomData<T>,
}

impl<'c, T: Entity> Repository<'c, T> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// IDで1件取得する
    pub async fn get(&mut self, id: i64) -> Result<Option<T>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", T::COLUMNS, T::TABLE);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        row.as_ref().map(T::from_row).transpose()
    }

    /// 全件取得する
    pub async fn list(&mut self) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            T::COLUMNS,
            T::TABLE,
            T::ORDER_BY
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *self.conn).await?;

        rows.iter().map(T::from_row).collect()
    }

    /// IDで1件削除する。削除した場合は`true`
    pub async fn delete(&mut self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// 永続化データの不整合を表すエラーを作る
pub(super) fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}
