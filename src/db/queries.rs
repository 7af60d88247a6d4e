//! Database queries for events and their categories

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CategoryRow, EventRow};

/// Get a published event by id
pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Option<EventRow>> {
    let event = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT
            id,
            title,
            event_type,
            min_players,
            max_players,
            member_team_price,
            non_member_team_price
        FROM events
        WHERE id = $1
          AND is_published = TRUE
          AND deleted_at IS NULL
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

/// Get the categories of an event in display order
pub async fn get_event_categories(pool: &PgPool, event_id: Uuid) -> Result<Vec<CategoryRow>> {
    let categories = sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT
            id,
            event_id,
            name,
            start_age,
            end_age,
            allowed_genders,
            member_fee,
            non_member_fee,
            distance_meters,
            belts_count,
            description_html
        FROM event_categories
        WHERE event_id = $1
          AND deleted_at IS NULL
        ORDER BY sort_order, start_age, name
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}
