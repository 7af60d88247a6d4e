//! Domain models

pub mod event;
pub mod participant;

pub use event::{CategoryRow, Event, EventCategory, EventFormat, EventRow, TeamTerms};
pub use participant::{parse_birth_date, Gender, MembershipStatus, Participant};
