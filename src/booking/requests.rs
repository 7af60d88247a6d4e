//! Request DTOs for booking API endpoints.

use serde::Deserialize;
use uuid::Uuid;

use crate::models::Participant;

use super::calculators::BookingFor;
use super::session::{BookingAction, GuestRegistration};
use super::verification::MembershipNamespace;

/// Request to annotate an event's categories for a participant set
#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub as_of_year: Option<i32>,
}

/// Request to price a booking without opening a session
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub booking_for: BookingFor,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub as_of_year: Option<i32>,
}

/// Request to open a booking session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub event_id: Uuid,
    #[serde(default)]
    pub booking_for: BookingFor,
}

/// Request to verify a member and add them to a session
#[derive(Debug, Deserialize)]
pub struct VerifyMemberRequest {
    pub membership_id: String,
    #[serde(default = "default_namespace")]
    pub namespace: MembershipNamespace,
}

fn default_namespace() -> MembershipNamespace {
    MembershipNamespace::Primary
}

/// Session changes a client may request directly.
///
/// Verification actions are not exposed; they go through the members endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionActionRequest {
    SetBookingFor { booking_for: BookingFor },
    AddGuest { guest: GuestRegistration },
    RemoveMember { member_id: String },
    RemoveGuest { index: usize },
    SelectCategory { category_id: Option<Uuid> },
}

impl From<SessionActionRequest> for BookingAction {
    fn from(request: SessionActionRequest) -> Self {
        match request {
            SessionActionRequest::SetBookingFor { booking_for } => {
                BookingAction::SetBookingFor(booking_for)
            }
            SessionActionRequest::AddGuest { guest } => BookingAction::AddGuest(guest),
            SessionActionRequest::RemoveMember { member_id } => BookingAction::RemoveMember(member_id),
            SessionActionRequest::RemoveGuest { index } => BookingAction::RemoveGuest(index),
            SessionActionRequest::SelectCategory { category_id } => {
                BookingAction::SelectCategory(category_id)
            }
        }
    }
}
