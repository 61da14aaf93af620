use rust_decimal::Decimal;
use shared::models::{RevenueSummary, TopItem};
use sqlx::PgPool;

const DAY_MS: i64 = 86_400_000;

/// Revenue over the trailing `days` (paid orders only count as revenue)
pub async fn revenue_summary(
    pool: &PgPool,
    venue_id: i64,
    days: i64,
    now: i64,
) -> Result<RevenueSummary, sqlx::Error> {
    let since = now - days * DAY_MS;

    let (order_count, paid_order_count, cancelled_order_count, revenue): (i64, i64, i64, Decimal) =
        sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE payment_status = 'PAID'),
                   COUNT(*) FILTER (WHERE status = 'CANCELLED'),
                   COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'PAID'), 0)
            FROM orders
            WHERE venue_id = $1 AND created_at >= $2
            "#,
        )
        .bind(venue_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

    let top_items = sqlx::query_as::<_, TopItem>(
        r#"
        SELECT item->>'name' AS name,
               SUM((item->>'quantity')::BIGINT)::BIGINT AS quantity,
               SUM((item->>'unit_price')::NUMERIC * (item->>'quantity')::NUMERIC)::NUMERIC(12, 2) AS revenue
        FROM orders o, jsonb_array_elements(o.items) AS item
        WHERE o.venue_id = $1 AND o.created_at >= $2 AND o.payment_status = 'PAID'
        GROUP BY 1
        ORDER BY 2 DESC, 1
        LIMIT 10
        "#,
    )
    .bind(venue_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(RevenueSummary {
        days,
        order_count,
        paid_order_count,
        cancelled_order_count,
        revenue,
        average_order_value: average(revenue, paid_order_count),
        top_items,
    })
}

fn average(revenue: Decimal, count: i64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (revenue / Decimal::from(count)).round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_handles_zero_orders() {
        assert_eq!(average(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average(Decimal::new(1000, 2), 3), Decimal::new(333, 2));
    }
}
