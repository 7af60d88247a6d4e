//! Event and category models.
//!
//! `EventRow` and `CategoryRow` use sqlx's FromRow derive for direct database
//! deserialization; `Event` is the validated shape the engine works with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::participant::Gender;

/// Event from events
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub event_type: String,
    pub min_players: Option<i32>,
    pub max_players: Option<i32>,
    pub member_team_price: Option<Decimal>,
    pub non_member_team_price: Option<Decimal>,
}

/// Category from event_categories
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub start_age: i32,
    pub end_age: i32,
    pub allowed_genders: Vec<String>,
    pub member_fee: Decimal,
    pub non_member_fee: Decimal,
    pub distance_meters: Option<i32>,
    pub belts_count: Option<i32>,
    pub description_html: String,
}

/// Team roster limits and flat team prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTerms {
    pub min_players: u32,
    pub max_players: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub member_team_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub non_member_team_price: Decimal,
}

/// How an event is booked and priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum EventFormat {
    Single,
    Double,
    Team(TeamTerms),
}

impl EventFormat {
    /// Most participants one booking may hold
    pub fn capacity(&self) -> usize {
        match self {
            EventFormat::Single => 1,
            EventFormat::Double => 2,
            EventFormat::Team(terms) => terms.max_players as usize,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventFormat::Single => "Single",
            EventFormat::Double => "Double",
            EventFormat::Team(_) => "Team",
        }
    }
}

/// One fee and eligibility bracket of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCategory {
    pub id: Uuid,
    pub name: String,
    pub start_age: i32,
    pub end_age: i32,
    /// Empty means no restriction
    #[serde(default)]
    pub allowed_genders: Vec<Gender>,
    #[serde(with = "rust_decimal::serde::str")]
    pub member_fee: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub non_member_fee: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belts_count: Option<i32>,
    #[serde(default)]
    pub description_html: String,
}

impl EventCategory {
    pub fn allows_gender(&self, gender: Gender) -> bool {
        self.allowed_genders.is_empty() || self.allowed_genders.contains(&gender)
    }

    pub fn covers_age(&self, age: i32) -> bool {
        age >= self.start_age && age <= self.end_age
    }
}

/// Booking context: the event with its categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub format: EventFormat,
    pub categories: Vec<EventCategory>,
}

impl Event {
    pub fn category(&self, id: Uuid) -> Option<&EventCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Validate stored rows and assemble the event.
    ///
    /// Errors describe the misconfiguration; callers surface them as
    /// configuration errors rather than serving a broken event.
    pub fn from_rows(row: EventRow, categories: Vec<CategoryRow>) -> Result<Self, String> {
        let format = match row.event_type.trim() {
            "Single" => EventFormat::Single,
            "Double" => EventFormat::Double,
            "Team" => EventFormat::Team(team_terms(&row)?),
            other => return Err(format!("event {} has unknown type '{}'", row.id, other)),
        };

        let categories = categories
            .into_iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Event {
            id: row.id,
            title: row.title,
            format,
            categories,
        })
    }
}

fn team_terms(row: &EventRow) -> Result<TeamTerms, String> {
    let missing = |field: &str| format!("team event {} is missing {}", row.id, field);

    let min_players = row.min_players.ok_or_else(|| missing("min_players"))?;
    let max_players = row.max_players.ok_or_else(|| missing("max_players"))?;
    let member_team_price = row
        .member_team_price
        .ok_or_else(|| missing("member_team_price"))?;
    let non_member_team_price = row
        .non_member_team_price
        .ok_or_else(|| missing("non_member_team_price"))?;

    if min_players < 1 || min_players > max_players {
        return Err(format!(
            "team event {} has invalid roster limits {}-{}",
            row.id, min_players, max_players
        ));
    }

    Ok(TeamTerms {
        min_players: min_players as u32,
        max_players: max_players as u32,
        member_team_price,
        non_member_team_price,
    })
}

fn category_from_row(row: CategoryRow) -> Result<EventCategory, String> {
    if row.start_age > row.end_age {
        return Err(format!(
            "category {} has start age {} above end age {}",
            row.id, row.start_age, row.end_age
        ));
    }

    let allowed_genders = row
        .allowed_genders
        .iter()
        .map(|g| {
            Gender::parse(g).ok_or_else(|| format!("category {} has unknown gender '{}'", row.id, g))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EventCategory {
        id: row.id,
        name: row.name,
        start_age: row.start_age,
        end_age: row.end_age,
        allowed_genders,
        member_fee: row.member_fee,
        non_member_fee: row.non_member_fee,
        distance_meters: row.distance_meters,
        belts_count: row.belts_count,
        description_html: row.description_html,
    })
}
