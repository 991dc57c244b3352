use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, EventId, OrderId, OrderKey, PaymentKey, TicketId, TicketOrderId, TicketTypeId, UserId};
use domain::{Event, Order, OrderMeta, Ticket, TicketOrder, TicketType};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Result, StoreError, store::TicketStore};

/// PostgreSQL-backed ticket store implementation.
#[derive(Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Creates a new PostgreSQL ticket store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn nextval(&self, sequence: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar("SELECT nextval($1::regclass)")
            .bind(sequence)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let meta_json: serde_json::Value = row.try_get("meta")?;
        let meta: OrderMeta = serde_json::from_value(meta_json)?;
        let status: String = row.try_get("status")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            account_id: AccountId::new(row.try_get("account_id")?),
            user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
            order_key: OrderKey::from(row.try_get::<String, _>("order_key")?),
            payment_key: PaymentKey::from(row.try_get::<String, _>("payment_key")?),
            status: status.parse()?,
            session_start: row.try_get("session_start")?,
            purchased_at: row.try_get("purchased_at")?,
            locked: row.try_get("locked")?,
            meta,
            payment_provider: row.try_get("payment_provider")?,
        })
    }

    fn row_to_ticket_type(row: PgRow) -> Result<TicketType> {
        let availability: String = row.try_get("availability")?;
        let units: i32 = row.try_get("units")?;

        Ok(TicketType {
            id: TicketTypeId::new(row.try_get("id")?),
            event_id: row.try_get::<Option<i64>, _>("event_id")?.map(EventId::new),
            name: row.try_get("name")?,
            price: domain::Money::from_cents(row.try_get("price_cents")?),
            units: u32::try_from(units)
                .map_err(|_| StoreError::Corrupt(format!("negative units: {units}")))?,
            active: row.try_get("active")?,
            availability: availability.parse()?,
            sales_start: row.try_get("sales_start")?,
            sales_end: row.try_get("sales_end")?,
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<TicketOrder> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(TicketOrder {
            id: TicketOrderId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            ticket_type_id: TicketTypeId::new(row.try_get("ticket_type_id")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("negative quantity: {quantity}")))?,
        })
    }

    fn row_to_ticket(row: PgRow) -> Result<Ticket> {
        Ok(Ticket {
            id: TicketId::new(row.try_get("id")?),
            ticket_order_id: TicketOrderId::new(row.try_get("ticket_order_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

const SELECT_ORDER: &str = "SELECT id, account_id, user_id, order_key, payment_key, status, \
     session_start, purchased_at, locked, meta, payment_provider FROM orders";

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn next_order_id(&self) -> Result<OrderId> {
        Ok(OrderId::new(self.nextval("orders_id_seq").await?))
    }

    async fn next_line_item_id(&self) -> Result<TicketOrderId> {
        Ok(TicketOrderId::new(
            self.nextval("ticket_orders_id_seq").await?,
        ))
    }

    async fn next_ticket_id(&self) -> Result<TicketId> {
        Ok(TicketId::new(self.nextval("tickets_id_seq").await?))
    }

    async fn next_ticket_type_id(&self) -> Result<TicketTypeId> {
        Ok(TicketTypeId::new(
            self.nextval("ticket_types_id_seq").await?,
        ))
    }

    async fn next_event_id(&self) -> Result<EventId> {
        Ok(EventId::new(self.nextval("events_id_seq").await?))
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query("INSERT INTO events (id, account_id, name) VALUES ($1, $2, $3)")
            .bind(event.id.as_i64())
            .bind(event.account_id.as_i64())
            .bind(&event.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query("SELECT id, account_id, name FROM events WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            Ok::<_, StoreError>(Event {
                id: EventId::new(row.try_get("id")?),
                account_id: AccountId::new(row.try_get("account_id")?),
                name: row.try_get("name")?,
            })
        })
        .transpose()?)
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_types
                (id, event_id, name, price_cents, units, active, availability, sales_start, sales_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ticket_type.id.as_i64())
        .bind(ticket_type.event_id.map(|id| id.as_i64()))
        .bind(&ticket_type.name)
        .bind(ticket_type.price.cents())
        .bind(ticket_type.units as i32)
        .bind(ticket_type.active)
        .bind(ticket_type.availability.as_str())
        .bind(ticket_type.sales_start)
        .bind(ticket_type.sales_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ticket_types
            SET event_id = $2, name = $3, price_cents = $4, units = $5,
                active = $6, availability = $7, sales_start = $8, sales_end = $9
            WHERE id = $1
            "#,
        )
        .bind(ticket_type.id.as_i64())
        .bind(ticket_type.event_id.map(|id| id.as_i64()))
        .bind(&ticket_type.name)
        .bind(ticket_type.price.cents())
        .bind(ticket_type.units as i32)
        .bind(ticket_type.active)
        .bind(ticket_type.availability.as_str())
        .bind(ticket_type.sales_start)
        .bind(ticket_type.sales_end)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>> {
        let row = sqlx::query(
            "SELECT id, event_id, name, price_cents, units, active, availability, \
             sales_start, sales_end FROM ticket_types WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_ticket_type).transpose()
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let meta = serde_json::to_value(&order.meta)?;
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, account_id, user_id, order_key, payment_key, status,
                 session_start, purchased_at, locked, meta, payment_provider)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_i64())
        .bind(order.account_id.as_i64())
        .bind(order.user_id.map(|id| id.as_i64()))
        .bind(order.order_key.as_str())
        .bind(order.payment_key.as_str())
        .bind(order.status.as_str())
        .bind(order.session_start)
        .bind(order.purchased_at)
        .bind(order.locked)
        .bind(meta)
        .bind(&order.payment_provider)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let meta = serde_json::to_value(&order.meta)?;
        sqlx::query(
            r#"
            UPDATE orders
            SET user_id = $2, status = $3, session_start = $4, purchased_at = $5,
                locked = $6, meta = $7, payment_provider = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_i64())
        .bind(order.user_id.map(|id| id.as_i64()))
        .bind(order.status.as_str())
        .bind(order.session_start)
        .bind(order.purchased_at)
        .bind(order.locked)
        .bind(meta)
        .bind(&order.payment_provider)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_key(&self, key: &OrderKey) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE order_key = $1"))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_payment_key(&self, key: &PaymentKey) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE payment_key = $1"))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn find_started_order(
        &self,
        user: UserId,
        account: AccountId,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 AND account_id = $2 \
             AND status = 'started' AND locked = FALSE LIMIT 1"
        ))
        .bind(user.as_i64())
        .bind(account.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn stale_started_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE status = 'started' AND session_start < $1 ORDER BY id"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // line items and tickets cascade
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_line_item(
        &self,
        order: OrderId,
        ticket_type: TicketTypeId,
    ) -> Result<Option<TicketOrder>> {
        let row = sqlx::query(
            "SELECT id, order_id, ticket_type_id, quantity FROM ticket_orders \
             WHERE order_id = $1 AND ticket_type_id = $2",
        )
        .bind(order.as_i64())
        .bind(ticket_type.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_line_item).transpose()
    }

    async fn line_items_for_order(&self, order: OrderId) -> Result<Vec<TicketOrder>> {
        let rows = sqlx::query(
            "SELECT id, order_id, ticket_type_id, quantity FROM ticket_orders \
             WHERE order_id = $1 ORDER BY id",
        )
        .bind(order.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn upsert_line_item(&self, line_item: &TicketOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_orders (id, order_id, ticket_type_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id, ticket_type_id)
            DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(line_item.id.as_i64())
        .bind(line_item.order_id.as_i64())
        .bind(line_item.ticket_type_id.as_i64())
        .bind(line_item.quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_line_item(&self, id: TicketOrderId) -> Result<()> {
        sqlx::query("DELETE FROM ticket_orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reserved_or_sold(&self, ticket_type: TicketTypeId) -> Result<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ti.quantity), 0)::BIGINT
            FROM ticket_orders ti
            JOIN orders o ON o.id = ti.order_id
            WHERE ti.ticket_type_id = $1
              AND o.status NOT IN ('timeout', 'cancelled')
            "#,
        )
        .bind(ticket_type.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn purchased(&self, ticket_type: TicketTypeId) -> Result<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ti.quantity), 0)::BIGINT
            FROM ticket_orders ti
            JOIN orders o ON o.id = ti.order_id
            WHERE ti.ticket_type_id = $1
              AND o.status = 'purchased'
            "#,
        )
        .bind(ticket_type.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.ticket_order_id, t.user_id, t.created_at
            FROM tickets t
            JOIN ticket_orders ti ON ti.id = t.ticket_order_id
            WHERE ti.order_id = $1
            ORDER BY t.id
            "#,
        )
        .bind(order.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_ticket).collect()
    }

    async fn commit_purchase(&self, order: &Order, tickets: &[Ticket]) -> Result<()> {
        let meta = serde_json::to_value(&order.meta)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE orders
            SET user_id = $2, status = $3, session_start = $4, purchased_at = $5,
                locked = $6, meta = $7, payment_provider = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_i64())
        .bind(order.user_id.map(|id| id.as_i64()))
        .bind(order.status.as_str())
        .bind(order.session_start)
        .bind(order.purchased_at)
        .bind(order.locked)
        .bind(meta)
        .bind(&order.payment_provider)
        .execute(&mut *tx)
        .await?;

        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets (id, ticket_order_id, user_id, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(ticket.id.as_i64())
            .bind(ticket.ticket_order_id.as_i64())
            .bind(ticket.user_id.as_i64())
            .bind(ticket.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
