use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};

use crate::store::lock_order_ids;
use crate::{
    Book, BookId, CustomerId, LineItem, Money, NewBook, NewOrder, OrderId, OrderItemId,
    OrderItemRecord, OrderQuery, OrderRecord, OrderStatus, Result, Store, StoreError,
    Transaction,
};

const BOOK_COLUMNS: &str = "book_id, title, author, genre, price_cents, stock";
const ORDER_COLUMNS: &str = "order_id, customer_id, created_at, status";
const ITEM_COLUMNS: &str = "order_item_id, order_id, book_id, quantity";

/// PostgreSQL-backed store implementation.
///
/// Stock reservations lock book rows with `SELECT ... FOR UPDATE`, so
/// concurrent confirmations touching the same book are serialized by the
/// database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to the given database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        tracing::info!(count = migrator.iter().count(), "running database migrations");
        migrator.run(&self.pool).await.inspect_err(|e| {
            tracing::error!(error = %e, "database migrations failed");
        })?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_u32(table: &'static str, column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt {
        table,
        reason: format!("{column} = {value} is out of range"),
    })
}

fn row_to_book(row: PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::new(row.try_get("book_id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        genre: row.try_get("genre")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32("books", "stock", row.try_get("stock")?)?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::Corrupt {
            table: "orders",
            reason: e.to_string(),
        })?;

    Ok(OrderRecord {
        id: OrderId::new(row.try_get("order_id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        created_at: row.try_get("created_at")?,
        status,
    })
}

fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::new(row.try_get("order_item_id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        book_id: BookId::new(row.try_get("book_id")?),
        quantity: to_u32("order_items", "quantity", row.try_get("quantity")?)?,
    })
}

/// Appends the query's filters to `sql`, numbering parameters from `$1`.
///
/// Returns the number of parameters added. Bind them with [`bind_filters`].
fn push_filters(sql: &mut String, query: &OrderQuery, prefix: &str) -> usize {
    let mut param_count = 0;

    if query.customer_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND {prefix}customer_id = ${param_count}"));
    }
    if query.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND {prefix}status = ${param_count}"));
    }
    if query.from_timestamp.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND {prefix}created_at >= ${param_count}"));
    }
    if query.to_timestamp.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND {prefix}created_at <= ${param_count}"));
    }

    param_count
}

fn bind_filters<'q>(
    mut q: sqlx::query::Query<'q, Postgres, PgArguments>,
    query: &OrderQuery,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    if let Some(customer_id) = query.customer_id {
        q = q.bind(customer_id.get());
    }
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }
    if let Some(from) = query.from_timestamp {
        q = q.bind(from);
    }
    if let Some(to) = query.to_timestamp {
        q = q.bind(to);
    }
    q
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn get_book(&mut self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE book_id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_book).transpose()
    }

    async fn list_books(&mut self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY book_id"))
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(row_to_book).collect()
    }

    async fn insert_book(&mut self, book: NewBook) -> Result<Book> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO books (title, author, genre, price_cents, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.price.cents())
        .bind(i64::from(book.stock))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_book(row)
    }

    async fn update_book(&mut self, id: BookId, book: NewBook) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre = $4, price_cents = $5, stock = $6
            WHERE book_id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.price.cents())
        .bind(i64::from(book.stock))
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_book).transpose()
    }

    async fn delete_book(&mut self, id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn book_in_use(&mut self, id: BookId) -> Result<bool> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE book_id = $1)")
                .bind(id.get())
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(in_use)
    }

    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>> {
        let ids: Vec<i64> = lock_order_ids(ids).into_iter().map(BookId::get).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOK_COLUMNS}
            FROM books
            WHERE book_id = ANY($1)
            ORDER BY book_id
            FOR UPDATE
            "#
        ))
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_book).collect()
    }

    async fn adjust_stock(&mut self, id: BookId, delta: i64) -> Result<Option<u32>> {
        // CHECK (stock >= 0) turns an overdraw into a constraint error.
        let stock: Option<i64> = sqlx::query_scalar(
            "UPDATE books SET stock = stock + $2 WHERE book_id = $1 RETURNING stock",
        )
        .bind(id.get())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        stock.map(|s| to_u32("books", "stock", s)).transpose()
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (customer_id, created_at, status)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.customer_id.get())
        .bind(order.created_at)
        .bind(order.status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(row)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE order_id = $1")
            .bind(id.get())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_items(
        &mut self,
        order_id: OrderId,
        lines: &[LineItem],
    ) -> Result<Vec<OrderItemRecord>> {
        let mut records = Vec::with_capacity(lines.len());

        for line in lines {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO order_items (order_id, book_id, quantity)
                VALUES ($1, $2, $3)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(order_id.get())
            .bind(line.book_id.get())
            .bind(i64::from(line.quantity))
            .fetch_one(&mut *self.tx)
            .await?;

            records.push(row_to_item(row)?);
        }

        Ok(records)
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY order_item_id"
        ))
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn delete_items(&mut self, order_id: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = push_filters(&mut sql, query, "");

        sql.push_str(" ORDER BY created_at DESC, order_id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        // Paging past i64::MAX rows behaves the same as paging to it.
        let mut q = bind_filters(sqlx::query(&sql), query);
        if let Some(limit) = query.limit {
            q = q.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            q = q.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = q.fetch_all(&mut *self.tx).await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn confirmed_revenue(&mut self, query: &OrderQuery) -> Result<Money> {
        let query = OrderQuery {
            status: Some(OrderStatus::Confirmed),
            limit: None,
            offset: None,
            ..query.clone()
        };

        let mut sql = String::from(
            r#"
            SELECT COALESCE(SUM(b.price_cents * oi.quantity), 0)::BIGINT
            FROM order_items oi
            JOIN orders o ON o.order_id = oi.order_id
            JOIN books b ON b.book_id = oi.book_id
            WHERE 1=1
            "#,
        );
        push_filters(&mut sql, &query, "o.");

        let row = bind_filters(sqlx::query(&sql), &query)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(Money::from_cents(row.try_get(0)?))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
