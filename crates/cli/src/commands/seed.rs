//! Seed the database with sample promo codes for local development.

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Sample codes: (code, discount type, value, usage limit).
const SAMPLE_CODES: &[(&str, &str, i64, Option<i64>)] = &[
    ("WELCOME10", "percentage", 10, None),
    ("SUMMER10", "percentage", 10, Some(100)),
    ("KARIBU500", "fixed", 500, Some(50)),
];

/// Insert the sample promo codes, skipping any that already exist.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn run() -> Result<(), CommandError> {
    let url = database_url()?;
    let pool = PgPool::connect(url.expose_secret()).await?;

    for (code, discount_type, value, usage_limit) in SAMPLE_CODES {
        let result = sqlx::query(
            "INSERT INTO promo_codes (code, discount_type, discount_value, usage_limit) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(discount_type)
        .bind(Decimal::from(*value))
        .bind(usage_limit)
        .execute(&pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::info!(code, "Promo code already present, skipped");
        } else {
            tracing::info!(code, "Promo code seeded");
        }
    }

    Ok(())
}
