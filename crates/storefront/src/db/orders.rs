//! Order repository.
//!
//! Orders are the audit trail of the shop: created exactly once per
//! successful payment reference, mutated only by status transitions, never
//! deleted. Queries use runtime-checked builders (`query_as`) because the
//! workspace does not commit sqlx offline data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use luna_core::{Email, NewOrder, Order, OrderId, OrderLine, OrderStatus, UserId};

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

    /// Create an order for a verified payment reference.
    ///
    /// Idempotent under retried or replayed callbacks: an existing order
    /// with the same reference is returned as-is, and the unique index on
    /// `reference` backstops the check against a concurrent insert.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails for any
    /// reason other than a duplicate reference.
    pub async fn create(&self, new_order: &NewOrder) -> Result<Order, RepositoryError> {
        if let Some(existing) = self.get_by_reference(&new_order.reference).await? {
            tracing::warn!(
                reference = %new_order.reference,
                order_id = %existing.id,
                "Duplicate order creation for reference, returning existing order"
            );
            return Ok(existing);
        }

        let lines = serde_json::to_value(&new_order.lines).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize order lines: {e}"))
        })?;

        let query = format!(
            "INSERT INTO orders \
             (user_id, user_name, user_email, lines, subtotal, applied_code, \
              discount_amount, total, reference, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending') \
             RETURNING {ORDER_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, OrderRow>(&query)
            .bind(new_order.user_id.map(|id| id.as_i64()))
            .bind(&new_order.user_name)
            .bind(new_order.user_email.as_str())
            .bind(&lines)
            .bind(new_order.subtotal)
            .bind(&new_order.applied_code)
            .bind(new_order.discount_amount)
            .bind(new_order.total)
            .bind(&new_order.reference)
            .fetch_one(self.pool)
            .await;

        match inserted {
            Ok(row) => row.into_order(),
            Err(e) => {
                // Lost a race against a concurrent callback for the same
                // reference; the order that won is the order.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                    && let Some(existing) = self.get_by_reference(&new_order.reference).await?
                {
                    return Ok(existing);
                }
                Err(RepositoryError::Database(e))
            }
        }
    }

    /// Get an order by its payment reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE reference = $1");

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(reference)
            .fetch_optional(self.pool)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Attach a user to an order placed before the shopper record existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist,
    /// `RepositoryError::Database` for other database errors.
    pub async fn link_user(&self, order_id: OrderId, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET user_id = $1 WHERE id = $2")
            .bind(user_id.as_i64())
            .bind(order_id.as_i64())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Get all orders for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(user_id.as_i64())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use luna_core::ProductId;

    use super::*;

    fn sample_order(reference: &str) -> NewOrder {
        NewOrder {
            user_id: None,
            user_name: "Amina Otieno".to_owned(),
            user_email: Email::parse("amina@example.com").unwrap(),
            lines: vec![OrderLine {
                product_id: ProductId::new(1),
                product_name: "Body Oil".to_owned(),
                size: "250ml".to_owned(),
                unit_price: Decimal::from(450),
                quantity: 2,
                image_url: None,
            }],
            subtotal: Decimal::from(900),
            applied_code: None,
            discount_amount: Decimal::ZERO,
            total: Decimal::from(900),
            reference: reference.to_owned(),
        }
    }

    #[sqlx::test]
    async fn test_create_twice_with_same_reference_yields_one_order(pool: PgPool) {
        let repo = OrderRepository::new(&pool);

        let first = repo.create(&sample_order("ref-replay")).await.unwrap();
        let second = repo.create(&sample_order("ref-replay")).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.reference, first.reference);

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE reference = $1")
                .bind("ref-replay")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn test_get_by_reference_round_trips_lines(pool: PgPool) {
        let repo = OrderRepository::new(&pool);
        let created = repo.create(&sample_order("ref-lines")).await.unwrap();

        let fetched = repo
            .get_by_reference("ref-lines")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.lines.len(), 1);
        assert_eq!(fetched.lines[0].product_name, "Body Oil");
        assert_eq!(fetched.status, OrderStatus::Pending);
    }
}
