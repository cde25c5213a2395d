//! `PostgreSQL` implementation of [`SaleStore`].
//!
//! Sale items live in `seckill` (`number` is remaining stock) and the purchase
//! ledger in `success_killed`, keyed by `(seckill_id, user_phone)`.
//!
//! Both arbitration points are database features:
//!
//! - `UPDATE ... WHERE number > 0` takes the row lock and re-checks the predicate, so
//!   concurrent decrements of the same sale are serialized
//! - `INSERT ... ON CONFLICT DO NOTHING` on the composite primary key lets exactly one
//!   of two concurrent inserts for the same pair observe a new row

use chrono::{DateTime, Utc};
use flashsale_core::{
    CustomerId, OutcomeState, PurchaseRecord, SaleId, SaleItem, SaleStore, StoreError,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use crate::store_error;

/// `PostgreSQL`-backed durable store for sale items and the purchase ledger.
///
/// # Example
///
/// ```no_run
/// use flashsale_postgres::PostgresSaleStore;
/// use flashsale_core::{SaleId, SaleStore};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresSaleStore::new(pool);
/// store.migrate().await?;
///
/// let sale = store.find_sale(SaleId::new(1000)).await?;
/// println!("{sale:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresSaleStore {
    pool: PgPool,
}

impl PostgresSaleStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations (tables and the `execute_seckill` function).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Publish a new sale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the insert fails (including a window
    /// whose start is not before its end).
    pub async fn create_sale(
        &self,
        name: &str,
        stock: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<SaleItem, StoreError> {
        let number = i32::try_from(stock)
            .map_err(|_| StoreError::DatabaseError(format!("Stock {stock} out of range")))?;

        let row = sqlx::query(
            r"
            INSERT INTO seckill (name, number, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING seckill_id, name, number, start_time, end_time, create_time
            ",
        )
        .bind(name)
        .bind(number)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        let item = Self::row_to_sale_item(&row)?;
        tracing::info!(sale_id = %item.id, stock, "Sale published");
        Ok(item)
    }

    /// Convert a `seckill` row to a [`SaleItem`].
    fn row_to_sale_item(row: &PgRow) -> Result<SaleItem, StoreError> {
        let id: i64 = row.try_get("seckill_id").map_err(corrupt)?;
        let number: i32 = row.try_get("number").map_err(corrupt)?;
        let stock = u32::try_from(number).map_err(|_| {
            StoreError::CorruptRecord(format!("sale {id} has negative stock {number}"))
        })?;

        Ok(SaleItem {
            id: SaleId::new(id),
            name: row.try_get("name").map_err(corrupt)?,
            stock,
            start_time: row.try_get("start_time").map_err(corrupt)?,
            end_time: row.try_get("end_time").map_err(corrupt)?,
            created_at: row.try_get("create_time").map_err(corrupt)?,
        })
    }

    /// Convert a `success_killed` row to a [`PurchaseRecord`].
    fn row_to_purchase(row: &PgRow) -> Result<PurchaseRecord, StoreError> {
        let state: i16 = row.try_get("state").map_err(corrupt)?;

        Ok(PurchaseRecord {
            sale_id: SaleId::new(row.try_get("seckill_id").map_err(corrupt)?),
            customer_id: CustomerId::new(row.try_get("user_phone").map_err(corrupt)?),
            state: OutcomeState::from_code(i32::from(state)),
            created_at: row.try_get("create_time").map_err(corrupt)?,
        })
    }
}

fn corrupt(e: sqlx::Error) -> StoreError {
    StoreError::CorruptRecord(e.to_string())
}

impl SaleStore for PostgresSaleStore {
    type Transaction = sqlx::Transaction<'static, Postgres>;

    async fn find_sale(&self, sale_id: SaleId) -> Result<Option<SaleItem>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT seckill_id, name, number, start_time, end_time, create_time
            FROM seckill
            WHERE seckill_id = $1
            ",
        )
        .bind(sale_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(Self::row_to_sale_item).transpose()
    }

    async fn list_sales(&self, offset: u32, limit: u32) -> Result<Vec<SaleItem>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT seckill_id, name, number, start_time, end_time, create_time
            FROM seckill
            ORDER BY create_time DESC, seckill_id DESC
            OFFSET $1
            LIMIT $2
            ",
        )
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter().map(Self::row_to_sale_item).collect()
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        self.pool.begin().await.map_err(store_error)
    }

    async fn commit(&self, tx: Self::Transaction) -> Result<(), StoreError> {
        tx.commit().await.map_err(store_error)
    }

    async fn rollback(&self, tx: Self::Transaction) -> Result<(), StoreError> {
        tx.rollback().await.map_err(store_error)
    }

    async fn insert_purchase(
        &self,
        tx: &mut Self::Transaction,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        #[allow(clippy::cast_possible_truncation)] // Outcome codes fit in SMALLINT
        let state = OutcomeState::Success.code() as i16;

        let row = sqlx::query(
            r"
            INSERT INTO success_killed (seckill_id, user_phone, state, create_time)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (seckill_id, user_phone) DO NOTHING
            RETURNING seckill_id, user_phone, state, create_time
            ",
        )
        .bind(sale_id.get())
        .bind(customer_id.get())
        .bind(state)
        .bind(at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(store_error)?;

        row.as_ref().map(Self::row_to_purchase).transpose()
    }

    async fn reduce_stock(
        &self,
        tx: &mut Self::Transaction,
        sale_id: SaleId,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE seckill
            SET number = number - 1
            WHERE seckill_id = $1
              AND start_time <= $2
              AND end_time > $2
              AND number > 0
            ",
        )
        .bind(sale_id.get())
        .bind(at)
        .execute(&mut **tx)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn find_purchase(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
    ) -> Result<Option<PurchaseRecord>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT seckill_id, user_phone, state, create_time
            FROM success_killed
            WHERE seckill_id = $1 AND user_phone = $2
            ",
        )
        .bind(sale_id.get())
        .bind(customer_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(Self::row_to_purchase).transpose()
    }

    async fn execute_procedure(
        &self,
        sale_id: SaleId,
        customer_id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<i32, StoreError> {
        let (code,): (i32,) = sqlx::query_as("SELECT execute_seckill($1, $2, $3)")
            .bind(sale_id.get())
            .bind(customer_id.get())
            .bind(at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(code)
    }
}
