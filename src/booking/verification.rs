//! Member directory boundary.
//!
//! Membership ids live in two namespaces: primary members (`P-<id>`) and
//! secondary/dependent members (`S<number>`). The caller says which namespace a
//! raw id belongs to; the engine resolves the directory id before any lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{parse_birth_date, Gender, MembershipStatus, Participant};

use super::services::BookingError;

/// Namespace tag supplied with a raw membership id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipNamespace {
    Primary,
    Secondary,
}

/// A membership id with its namespace prefix applied, upper-cased
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MembershipId(String);

impl MembershipId {
    /// Apply the namespace prefix to a raw id.
    ///
    /// An id that already carries its namespace prefix is not prefixed twice.
    /// Primary ids are letters, digits and dashes; secondary ids are digits.
    pub fn resolve(namespace: MembershipNamespace, raw: &str) -> Result<Self, BookingError> {
        let raw = raw.trim().to_ascii_uppercase();
        let invalid = || BookingError::InvalidMembershipId(raw.clone());

        match namespace {
            MembershipNamespace::Primary => {
                let body = raw.strip_prefix("P-").unwrap_or(raw.as_str()).trim();
                if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                    return Err(invalid());
                }
                Ok(Self(format!("P-{}", body)))
            }
            MembershipNamespace::Secondary => {
                let body = raw.strip_prefix('S').unwrap_or(raw.as_str()).trim();
                if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                Ok(Self(format!("S{}", body)))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Member record as returned by the directory
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: Option<String>,
}

/// Directory lookup envelope: `{ success, result, message }`
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<DirectoryMember>,
    #[serde(default)]
    pub message: String,
}

/// Transport-level directory failures
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Member directory unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Member directory returned status {0}")]
    Status(u16),

    #[error("Invalid member directory URL '{0}'")]
    InvalidUrl(String),
}

/// Service that confirms membership ids
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn verify_member(&self, id: &MembershipId) -> Result<DirectoryResponse, DirectoryError>;
}

/// Turn a directory answer into a verified participant.
///
/// A record without a usable date of birth is a hard failure.
pub fn accept_directory_response(
    id: &MembershipId,
    response: DirectoryResponse,
) -> Result<Participant, BookingError> {
    let member = match (response.success, response.result) {
        (true, Some(member)) => member,
        (_, _) => {
            let message = if response.message.trim().is_empty() {
                format!("Member {} could not be verified", id)
            } else {
                response.message
            };
            return Err(BookingError::VerificationRejected(message));
        }
    };

    let has_dob = member
        .date_of_birth
        .as_deref()
        .and_then(parse_birth_date)
        .is_some();
    if !has_dob {
        return Err(BookingError::MissingDateOfBirth(id.to_string()));
    }

    Ok(Participant {
        id: Some(member.id),
        name: member.name,
        email: member.email,
        mobile: member.mobile,
        gender: member.gender,
        date_of_birth: member.date_of_birth,
        membership_status: MembershipStatus::Member,
    })
}
