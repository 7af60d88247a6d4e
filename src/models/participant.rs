//! Participant models shared by eligibility, pricing and verification.

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Lenient parse used for stored category restrictions ("male", "Female", ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    Member,
    NonMember,
}

impl MembershipStatus {
    pub fn is_member(self) -> bool {
        matches!(self, MembershipStatus::Member)
    }
}

/// One registrant in a booking.
///
/// `id` is only set for members confirmed by the member directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    pub membership_status: MembershipStatus,
}

impl Participant {
    /// Parsed date of birth, `None` when absent or unparseable.
    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.date_of_birth.as_deref().and_then(parse_birth_date)
    }

    /// Calendar-year age: `as_of_year - year(date_of_birth)`.
    ///
    /// Not day-accurate; someone born in December counts a year older all year.
    pub fn age_in(&self, as_of_year: i32) -> Option<i32> {
        self.birth_date().map(|dob| as_of_year - dob.year())
    }

    pub fn is_member(&self) -> bool {
        self.membership_status.is_member()
    }

    /// Name and a usable date of birth, as required for team rosters.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.birth_date().is_some()
    }
}

/// Parse a date of birth as sent by the site or the member directory.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `DD/MM/YYYY`.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}
