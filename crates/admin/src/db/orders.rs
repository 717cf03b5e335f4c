//! Order repository for the back office.
//!
//! The storefront creates orders; this side only reads them and applies
//! planned status transitions. Orders are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use luna_core::{Email, Order, OrderId, OrderLine, OrderStatus, TransitionPlan, UserId};

use super::RepositoryError;

/// Raw row shape shared by every order query.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: Option<i64>,
    user_name: String,
    user_email: String,
    lines: serde_json::Value,
    subtotal: Decimal,
    applied_code: Option<String>,
    discount_amount: Decimal,
    total: Decimal,
    reference: String,
    order_date: DateTime<Utc>,
    status: String,
    tracking_number: Option<String>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepositoryError> {
        let lines: Vec<OrderLine> = serde_json::from_value(self.lines)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid order lines: {e}")))?;

        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid order status: {e}")))?;

        let user_email = Email::parse(&self.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: self.user_id.map(UserId::new),
            user_name: self.user_name,
            user_email,
            lines,
            subtotal: self.subtotal,
            applied_code: self.applied_code,
            discount_amount: self.discount_amount,
            total: self.total,
            reference: self.reference,
            order_date: self.order_date,
            status,
            tracking_number: self.tracking_number,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, user_name, user_email, lines, subtotal, applied_code, \
     discount_amount, total, reference, order_date, status, tracking_number";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC");

        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Get one order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Persist a planned status transition and return the updated order.
    ///
    /// The plan was validated against the transition graph in core; this
    /// just writes its outcome. A set tracking number is kept if the plan
    /// carries none. The write is conditioned on the status the plan was
    /// made from, so two operators racing on the same order cannot both
    /// land their plan (and, for shipping, both send the notification).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist,
    /// `RepositoryError::Conflict` if its status changed since `current`
    /// was read, `RepositoryError::Database` for other database errors.
    pub async fn apply_transition(
        &self,
        id: OrderId,
        current: OrderStatus,
        plan: &TransitionPlan,
    ) -> Result<Order, RepositoryError> {
        let query = format!(
            "UPDATE orders \
             SET status = $1, tracking_number = COALESCE($2, tracking_number) \
             WHERE id = $3 AND status = $4 \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(plan.status.to_string())
            .bind(&plan.tracking_number)
            .bind(id.as_i64())
            .bind(current.to_string())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => row.into_order(),
            None => match self.get_by_id(id).await? {
                Some(order) => Err(RepositoryError::Conflict(format!(
                    "order status changed concurrently (now {})",
                    order.status
                ))),
                None => Err(RepositoryError::NotFound),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use luna_core::plan_transition;

    use super::*;

    async fn seed_order(pool: &PgPool) -> OrderId {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO orders (user_name, user_email, lines, subtotal, total, reference) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind("Amina Otieno")
        .bind("amina@example.com")
        .bind(serde_json::json!([]))
        .bind(Decimal::from(900))
        .bind(Decimal::from(900))
        .bind("ref-transition")
        .fetch_one(pool)
        .await
        .unwrap();
        OrderId::new(id)
    }

    #[sqlx::test(migrations = "../storefront/migrations")]
    async fn test_apply_transition_rejects_stale_read(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let id = seed_order(&pool).await;

        let plan = plan_transition(
            OrderStatus::Pending,
            OrderStatus::Shipped,
            Some("TRK-001".to_owned()),
        )
        .unwrap();

        let shipped = repo
            .apply_transition(id, OrderStatus::Pending, &plan)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.tracking_number.as_deref(), Some("TRK-001"));

        // A second writer whose plan was made from the stale pending read
        // must not land it again.
        let err = repo
            .apply_transition(id, OrderStatus::Pending, &plan)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
