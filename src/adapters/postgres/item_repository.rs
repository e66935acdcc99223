use crate::domain::{Item, ItemId, NewItem, UserId};
use crate::ports::lending_store::Result;
use sqlx::{Row, postgres::PgRow};

use super::repository::{Entity, Repository, invalid_data};

/// 資料リポジトリ
pub type ItemRepository<'c> = Repository<'c, Item>;

impl Entity for Item {
    const TABLE: &'static str = "items";
    const COLUMNS: &'static str = "id, title, author, is_borrowed, holder_user_id";

    /// 行データを資料に変換する
    ///
    /// is_borrowedとholder_user_idが矛盾する行はエラーにする。
    fn from_row(row: &PgRow) -> Result<Self> {
        let id: i64 = row.try_get("id")?;
        let is_borrowed: bool = row.try_get("is_borrowed")?;
        let holder: Option<String> = row.try_get("holder_user_id")?;
        let holder = holder.map(UserId::parse).transpose()?;

        let state = Item::state_from_columns(is_borrowed, holder).ok_or_else(|| {
            invalid_data(format!(
                "item {} has inconsistent is_borrowed/holder_user_id",
                id
            ))
        })?;

        Ok(Item {
            id: ItemId::from_i64(id),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            state,
        })
    }
}

impl Repository<'_, Item> {
    /// 資料を登録する
    pub async fn create(&mut self, item: &NewItem) -> Result<Item> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO items (title, author, is_borrowed, holder_user_id)
            VALUES ($1, $2, FALSE, NULL)
            RETURNING id
            "#,
        )
        .bind(&item.title)
        .bind(&item.author)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(item.clone().into_item(ItemId::from_i64(id)))
    }

    /// 資料の行をロックして取得する（SELECT ... FOR UPDATE）
    ///
    /// トランザクション内で呼び出すこと。ロックはコミットまたはロールバックで解放される。
    pub async fn lock(&mut self, item_id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author, is_borrowed, holder_user_id
            FROM items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id.value())
        .fetch_optional(&mut *self.conn)
        .await?;

        row.as_ref().map(Item::from_row).transpose()
    }

    /// 貸出状態を保存する
    pub async fn save_state(&mut self, item: &Item) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET is_borrowed = $2, holder_user_id = $3
            WHERE id = $1
            "#,
        )
        .bind(item.id.value())
        .bind(item.is_borrowed())
        .bind(item.holder().map(UserId::as_str))
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invalid_data(format!("item {} no longer exists", item.id)));
        }
        Ok(())
    }
}
