//! Session-scoped booking controller.
//!
//! All booking state for one attempt lives in a [`BookingController`]. It only
//! changes through [`BookingAction`] commands; readers get an immutable
//! [`BookingSnapshot`] with eligibility, total and payment gate recomputed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    parse_birth_date, Event, EventCategory, EventFormat, Gender, MembershipStatus, Participant,
};

use super::calculators::{compute_total, payment_blockers, BookingFor, PaymentBlocker};
use super::eligibility::{eligible_categories, evaluate, CategoryEligibility};
use super::payment::BookingPayload;
use super::services::BookingError;
use super::verification::MembershipId;

/// Manual registration of a non-member participant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRegistration {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

impl GuestRegistration {
    fn into_participant(self) -> Result<Participant, BookingError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(BookingError::InvalidParticipant("Name is required".to_string()));
        }

        let date_of_birth = match self.date_of_birth.map(|d| d.trim().to_string()) {
            Some(d) if d.is_empty() => None,
            Some(d) => {
                if parse_birth_date(&d).is_none() {
                    return Err(BookingError::InvalidParticipant(format!(
                        "'{}' is not a valid date of birth",
                        d
                    )));
                }
                Some(d)
            }
            None => None,
        };

        Ok(Participant {
            id: None,
            name,
            email: self.email.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            gender: self.gender,
            date_of_birth,
            membership_status: MembershipStatus::NonMember,
        })
    }
}

/// Commands accepted by the controller
#[derive(Debug, Clone)]
pub enum BookingAction {
    SetBookingFor(BookingFor),
    /// Reserve a membership id while the directory lookup is outstanding
    BeginVerification(MembershipId),
    CompleteVerification {
        membership_id: MembershipId,
        participant: Participant,
    },
    AbandonVerification(MembershipId),
    AddGuest(GuestRegistration),
    /// Remove a verified member by directory or membership id
    RemoveMember(String),
    /// Remove a guest by position in the guest list
    RemoveGuest(usize),
    SelectCategory(Option<Uuid>),
}

#[derive(Debug, Clone)]
struct VerifiedMember {
    membership_id: MembershipId,
    participant: Participant,
}

#[derive(Debug, Clone)]
struct BookingState {
    booking_for: BookingFor,
    members: Vec<VerifiedMember>,
    guests: Vec<Participant>,
    selected_category: Option<Uuid>,
    pending: BTreeSet<MembershipId>,
}

/// Derived selection: what would be paid for right now
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSelection {
    pub selected_category: Option<EventCategory>,
    pub participants: Vec<Participant>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
}

/// Immutable view of a session handed to callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSnapshot {
    pub session_id: Uuid,
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub booking_for: BookingFor,
    pub categories: Vec<CategoryEligibility>,
    pub selection: BookingSelection,
    pub pending_verifications: Vec<MembershipId>,
    pub blockers: Vec<PaymentBlocker>,
    pub can_pay: bool,
}

/// Owner of one booking attempt
#[derive(Debug)]
pub struct BookingController {
    session_id: Uuid,
    event: Arc<Event>,
    as_of_year: i32,
    state: BookingState,
    payment_started: bool,
}

impl BookingController {
    pub fn new(session_id: Uuid, event: Arc<Event>, booking_for: BookingFor, as_of_year: i32) -> Self {
        Self {
            session_id,
            event,
            as_of_year,
            state: BookingState {
                booking_for,
                members: Vec::new(),
                guests: Vec::new(),
                selected_category: None,
                pending: BTreeSet::new(),
            },
            payment_started: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn payment_started(&self) -> bool {
        self.payment_started
    }

    /// Seal the session once the gateway accepted the booking
    pub fn mark_payment_started(&mut self) {
        self.payment_started = true;
    }

    /// Apply an action. On error the session is left exactly as it was.
    pub fn dispatch(&mut self, action: BookingAction) -> Result<(), BookingError> {
        if self.payment_started {
            return Err(BookingError::PaymentStarted);
        }

        let mut next = self.state.clone();
        next.apply(&self.event, self.as_of_year, action)?;

        // A category that no longer fits the participants is deselected
        if let Some(selected) = next.selected_category {
            let participants = next.participants();
            let still_eligible = self
                .event
                .category(selected)
                .map(|c| evaluate(c, &participants, self.as_of_year).eligible)
                .unwrap_or(false);
            if !still_eligible {
                tracing::debug!(
                    "Session {}: category {} no longer eligible, clearing selection",
                    self.session_id,
                    selected
                );
                next.selected_category = None;
            }
        }

        self.state = next;
        Ok(())
    }

    /// Members first, then guests, in registration order
    pub fn participants(&self) -> Vec<Participant> {
        self.state.participants()
    }

    pub fn snapshot(&self) -> BookingSnapshot {
        let participants = self.participants();
        let categories = eligible_categories(&self.event.categories, &participants, self.as_of_year);
        let selected = self
            .state
            .selected_category
            .and_then(|id| self.event.category(id));

        let flags: Vec<MembershipStatus> =
            participants.iter().map(|p| p.membership_status).collect();
        let total_amount = compute_total(&self.event.format, selected, self.state.booking_for, &flags);
        let blockers = payment_blockers(
            &self.event.format,
            selected,
            self.state.booking_for,
            &participants,
            total_amount,
        );

        BookingSnapshot {
            session_id: self.session_id,
            event_id: self.event.id,
            event_type: self.event.format.name(),
            booking_for: self.state.booking_for,
            categories,
            can_pay: blockers.is_empty(),
            blockers,
            pending_verifications: self.state.pending.iter().cloned().collect(),
            selection: BookingSelection {
                selected_category: selected.cloned(),
                participants,
                total_amount,
            },
        }
    }

    /// Build the gateway hand-off, refusing while any payment blocker remains.
    pub fn payment_payload(&self) -> Result<BookingPayload, BookingError> {
        if self.payment_started {
            return Err(BookingError::PaymentStarted);
        }

        let snapshot = self.snapshot();
        if !snapshot.blockers.is_empty() {
            let reasons: Vec<String> = snapshot.blockers.iter().map(|b| b.to_string()).collect();
            return Err(BookingError::NotPayable(reasons.join("; ")));
        }

        let category = snapshot
            .selection
            .selected_category
            .ok_or_else(|| BookingError::NotPayable("Select a category".to_string()))?;

        Ok(BookingPayload {
            event_id: self.event.id,
            category_id: category.id,
            participants: self
                .state
                .members
                .iter()
                .filter_map(|m| m.participant.id.clone())
                .collect(),
            non_member_participants: self.state.guests.clone(),
            amount_paid: snapshot.selection.total_amount,
        })
    }
}

impl BookingState {
    fn participants(&self) -> Vec<Participant> {
        self.members
            .iter()
            .map(|m| m.participant.clone())
            .chain(self.guests.iter().cloned())
            .collect()
    }

    fn occupied(&self) -> usize {
        self.members.len() + self.guests.len() + self.pending.len()
    }

    fn ensure_room(&self, event: &Event) -> Result<(), BookingError> {
        let capacity = event.format.capacity();
        if self.occupied() >= capacity {
            return Err(BookingError::BookingFull { capacity });
        }
        Ok(())
    }

    fn is_member_present(&self, key: &str) -> bool {
        self.members.iter().any(|m| {
            m.membership_id.as_str().eq_ignore_ascii_case(key)
                || m
                    .participant
                    .id
                    .as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(key))
        })
    }

    fn apply(&mut self, event: &Event, as_of_year: i32, action: BookingAction) -> Result<(), BookingError> {
        match action {
            BookingAction::SetBookingFor(booking_for) => {
                self.booking_for = booking_for;
            }
            BookingAction::BeginVerification(membership_id) => {
                if self.is_member_present(membership_id.as_str()) {
                    return Err(BookingError::DuplicateMember(membership_id.to_string()));
                }
                if self.pending.contains(&membership_id) {
                    return Err(BookingError::VerificationPending(membership_id.to_string()));
                }
                self.ensure_room(event)?;
                self.pending.insert(membership_id);
            }
            BookingAction::CompleteVerification {
                membership_id,
                participant,
            } => {
                let was_pending = self.pending.remove(&membership_id);

                let record_id = participant.id.as_deref().unwrap_or(membership_id.as_str());
                if self.is_member_present(membership_id.as_str()) || self.is_member_present(record_id) {
                    return Err(BookingError::DuplicateMember(record_id.to_string()));
                }
                if !was_pending {
                    self.ensure_room(event)?;
                }

                self.members.push(VerifiedMember {
                    membership_id,
                    participant: Participant {
                        membership_status: MembershipStatus::Member,
                        ..participant
                    },
                });
            }
            BookingAction::AbandonVerification(membership_id) => {
                self.pending.remove(&membership_id);
            }
            BookingAction::AddGuest(registration) => {
                if matches!(event.format, EventFormat::Single) && self.booking_for == BookingFor::Myself {
                    return Err(BookingError::InvalidParticipant(
                        "Booking for yourself requires verifying your membership".to_string(),
                    ));
                }
                let guest = registration.into_participant()?;
                self.ensure_room(event)?;
                self.guests.push(guest);
            }
            BookingAction::RemoveMember(key) => {
                let before = self.members.len();
                self.members.retain(|m| {
                    !(m.membership_id.as_str().eq_ignore_ascii_case(&key)
                        || m
                            .participant
                            .id
                            .as_deref()
                            .is_some_and(|id| id.eq_ignore_ascii_case(&key)))
                });
                if self.members.len() == before {
                    return Err(BookingError::ParticipantNotFound(key));
                }
            }
            BookingAction::RemoveGuest(index) => {
                if index >= self.guests.len() {
                    return Err(BookingError::ParticipantNotFound(format!("guest #{}", index)));
                }
                self.guests.remove(index);
            }
            BookingAction::SelectCategory(None) => {
                self.selected_category = None;
            }
            BookingAction::SelectCategory(Some(id)) => {
                let category = event.category(id).ok_or(BookingError::CategoryNotFound(id))?;
                let result = evaluate(category, &self.participants(), as_of_year);
                if !result.eligible {
                    return Err(BookingError::IneligibleCategory(
                        result.reason.unwrap_or_else(|| category.name.clone()),
                    ));
                }
                self.selected_category = Some(id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::verification::MembershipNamespace;
    use crate::models::TeamTerms;
    use rust_decimal_macros::dec;

    const YEAR: i32 = 2024;

    fn category(name: &str, start_age: i32, end_age: i32) -> EventCategory {
        EventCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
            start_age,
            end_age,
            allowed_genders: vec![],
            member_fee: dec!(300),
            non_member_fee: dec!(500),
            distance_meters: Some(100),
            belts_count: None,
            description_html: String::new(),
        }
    }

    fn event(format: EventFormat) -> Arc<Event> {
        Arc::new(Event {
            id: Uuid::new_v4(),
            title: "Aquathon".to_string(),
            format,
            categories: vec![category("Juniors", 10, 14), category("Seniors", 15, 99)],
        })
    }

    fn controller(format: EventFormat, booking_for: BookingFor) -> BookingController {
        BookingController::new(Uuid::new_v4(), event(format), booking_for, YEAR)
    }

    fn primary(raw: &str) -> MembershipId {
        MembershipId::resolve(MembershipNamespace::Primary, raw).unwrap()
    }

    fn member(id: &str, dob: &str) -> Participant {
        Participant {
            id: Some(id.to_string()),
            name: format!("Member {}", id),
            email: String::new(),
            mobile: String::new(),
            gender: Gender::Female,
            date_of_birth: Some(dob.to_string()),
            membership_status: MembershipStatus::Member,
        }
    }

    fn guest(name: &str, dob: Option<&str>) -> GuestRegistration {
        GuestRegistration {
            name: name.to_string(),
            email: "guest@example.com".to_string(),
            mobile: String::new(),
            gender: Gender::Male,
            date_of_birth: dob.map(str::to_string),
        }
    }

    fn verify(ctl: &mut BookingController, raw: &str, dob: &str) -> Result<(), BookingError> {
        let id = primary(raw);
        ctl.dispatch(BookingAction::BeginVerification(id.clone()))?;
        ctl.dispatch(BookingAction::CompleteVerification {
            participant: member(id.as_str(), dob),
            membership_id: id,
        })
    }

    fn category_id(ctl: &BookingController, name: &str) -> Uuid {
        ctl.event().categories.iter().find(|c| c.name == name).unwrap().id
    }

    #[test]
    fn test_single_self_booking_flow() {
        let mut ctl = controller(EventFormat::Single, BookingFor::Myself);
        verify(&mut ctl, "7", "2012-05-01").unwrap();

        let juniors = category_id(&ctl, "Juniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(juniors))).unwrap();

        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.selection.total_amount, dec!(300));
        assert!(snapshot.can_pay);
        assert!(snapshot.categories[0].eligible);
        assert!(!snapshot.categories[1].eligible);

        let payload = ctl.payment_payload().unwrap();
        assert_eq!(payload.participants, vec!["P-7".to_string()]);
        assert_eq!(payload.category_id, juniors);
        assert_eq!(payload.amount_paid, dec!(300));
    }

    #[test]
    fn test_single_guest_on_behalf_pays_non_member_fee() {
        let mut ctl = controller(EventFormat::Single, BookingFor::Someone);
        ctl.dispatch(BookingAction::AddGuest(guest("Arjun", Some("1990-01-01"))))
            .unwrap();
        let seniors = category_id(&ctl, "Seniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(seniors))).unwrap();

        let payload = ctl.payment_payload().unwrap();
        assert_eq!(payload.amount_paid, dec!(500));
        assert!(payload.participants.is_empty());
        assert_eq!(payload.non_member_participants[0].name, "Arjun");
    }

    #[test]
    fn test_self_booking_cannot_use_guest_rate() {
        let mut ctl = controller(EventFormat::Single, BookingFor::Myself);
        let err = ctl
            .dispatch(BookingAction::AddGuest(guest("Walk-in", Some("1990-01-01"))))
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidParticipant(_)));
        assert!(ctl.participants().is_empty());

        // Switching to self-booking after adding a guest blocks payment
        let mut ctl = controller(EventFormat::Single, BookingFor::Someone);
        ctl.dispatch(BookingAction::AddGuest(guest("Walk-in", Some("1990-01-01"))))
            .unwrap();
        let seniors = category_id(&ctl, "Seniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(seniors))).unwrap();
        ctl.dispatch(BookingAction::SetBookingFor(BookingFor::Myself)).unwrap();

        let snapshot = ctl.snapshot();
        assert!(!snapshot.can_pay);
        assert_eq!(snapshot.blockers, vec![PaymentBlocker::MemberRequired]);
        assert!(matches!(ctl.payment_payload(), Err(BookingError::NotPayable(_))));
    }

    #[test]
    fn test_duplicate_verification_rejected() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Myself);
        verify(&mut ctl, "7", "2012-05-01").unwrap();

        let err = ctl
            .dispatch(BookingAction::BeginVerification(primary("p-7")))
            .unwrap_err();
        assert!(matches!(err, BookingError::DuplicateMember(_)));
        assert_eq!(ctl.participants().len(), 1);
    }

    #[test]
    fn test_duplicate_record_id_from_other_namespace_rejected() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Myself);
        verify(&mut ctl, "7", "2012-05-01").unwrap();

        // Secondary id resolving to a record already present
        let secondary = MembershipId::resolve(MembershipNamespace::Secondary, "12").unwrap();
        ctl.dispatch(BookingAction::BeginVerification(secondary.clone()))
            .unwrap();
        let err = ctl
            .dispatch(BookingAction::CompleteVerification {
                membership_id: secondary.clone(),
                participant: member("P-7", "2012-05-01"),
            })
            .unwrap_err();
        assert!(matches!(err, BookingError::DuplicateMember(_)));

        // Failed completion leaves the reservation in place until abandoned
        assert_eq!(ctl.snapshot().pending_verifications, vec![secondary.clone()]);
        ctl.dispatch(BookingAction::AbandonVerification(secondary)).unwrap();
        assert!(ctl.snapshot().pending_verifications.is_empty());
    }

    #[test]
    fn test_pending_verification_blocks_resubmission() {
        let mut ctl = controller(EventFormat::Team(TeamTerms {
            min_players: 2,
            max_players: 5,
            member_team_price: dec!(1000),
            non_member_team_price: dec!(1500),
        }), BookingFor::Myself);

        ctl.dispatch(BookingAction::BeginVerification(primary("9"))).unwrap();
        let err = ctl
            .dispatch(BookingAction::BeginVerification(primary("9")))
            .unwrap_err();
        assert!(matches!(err, BookingError::VerificationPending(_)));
    }

    #[test]
    fn test_capacity_counts_pending() {
        let mut ctl = controller(EventFormat::Single, BookingFor::Someone);
        ctl.dispatch(BookingAction::BeginVerification(primary("1"))).unwrap();

        let err = ctl
            .dispatch(BookingAction::AddGuest(guest("Late", None)))
            .unwrap_err();
        assert!(matches!(err, BookingError::BookingFull { capacity: 1 }));
    }

    #[test]
    fn test_guest_validation() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Someone);
        assert!(matches!(
            ctl.dispatch(BookingAction::AddGuest(guest("  ", None))),
            Err(BookingError::InvalidParticipant(_))
        ));
        assert!(matches!(
            ctl.dispatch(BookingAction::AddGuest(guest("Bad Date", Some("32/13/2001")))),
            Err(BookingError::InvalidParticipant(_))
        ));

        ctl.dispatch(BookingAction::AddGuest(guest(" Trimmed ", Some(" "))))
            .unwrap();
        let participants = ctl.participants();
        assert_eq!(participants[0].name, "Trimmed");
        assert_eq!(participants[0].date_of_birth, None);
    }

    #[test]
    fn test_select_ineligible_category_rejected_without_mutation() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Someone);
        ctl.dispatch(BookingAction::AddGuest(guest("Old", Some("1980-01-01"))))
            .unwrap();

        let juniors = category_id(&ctl, "Juniors");
        let err = ctl
            .dispatch(BookingAction::SelectCategory(Some(juniors)))
            .unwrap_err();
        assert_eq!(err.to_string(), "Age 44 not in range 10-14");
        assert!(ctl.snapshot().selection.selected_category.is_none());

        let err = ctl
            .dispatch(BookingAction::SelectCategory(Some(Uuid::new_v4())))
            .unwrap_err();
        assert!(matches!(err, BookingError::CategoryNotFound(_)));
    }

    #[test]
    fn test_selection_cleared_when_participants_change() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Someone);
        ctl.dispatch(BookingAction::AddGuest(guest("Kid", Some("2012-01-01"))))
            .unwrap();
        let juniors = category_id(&ctl, "Juniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(juniors))).unwrap();

        ctl.dispatch(BookingAction::AddGuest(guest("Adult", Some("1985-01-01"))))
            .unwrap();
        let snapshot = ctl.snapshot();
        assert!(snapshot.selection.selected_category.is_none());
        assert_eq!(snapshot.selection.total_amount, Decimal::ZERO);
        assert!(!snapshot.can_pay);
    }

    #[test]
    fn test_double_mixed_total() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Myself);
        verify(&mut ctl, "7", "2011-05-01").unwrap();
        ctl.dispatch(BookingAction::AddGuest(guest("Friend", Some("2012-01-01"))))
            .unwrap();
        let juniors = category_id(&ctl, "Juniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(juniors))).unwrap();

        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.selection.total_amount, dec!(800));
        assert!(snapshot.can_pay);
    }

    #[test]
    fn test_team_requires_complete_roster() {
        let mut ctl = controller(
            EventFormat::Team(TeamTerms {
                min_players: 2,
                max_players: 4,
                member_team_price: dec!(1000),
                non_member_team_price: dec!(1500),
            }),
            BookingFor::Myself,
        );
        verify(&mut ctl, "1", "1990-01-01").unwrap();
        ctl.dispatch(BookingAction::AddGuest(guest("No Dob", None))).unwrap();
        let seniors = category_id(&ctl, "Seniors");
        ctl.dispatch(BookingAction::SelectCategory(Some(seniors))).unwrap();

        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.selection.total_amount, dec!(1500));
        assert_eq!(
            snapshot.blockers,
            vec![PaymentBlocker::IncompleteParticipant { position: 2 }]
        );
        assert!(matches!(ctl.payment_payload(), Err(BookingError::NotPayable(_))));

        ctl.dispatch(BookingAction::RemoveGuest(0)).unwrap();
        ctl.dispatch(BookingAction::AddGuest(guest("With Dob", Some("1991-01-01"))))
            .unwrap();
        assert!(ctl.snapshot().can_pay);
    }

    #[test]
    fn test_remove_member_and_missing() {
        let mut ctl = controller(EventFormat::Double, BookingFor::Myself);
        verify(&mut ctl, "7", "2011-05-01").unwrap();

        assert!(matches!(
            ctl.dispatch(BookingAction::RemoveMember("P-8".to_string())),
            Err(BookingError::ParticipantNotFound(_))
        ));
        ctl.dispatch(BookingAction::RemoveMember("p-7".to_string())).unwrap();
        assert!(ctl.participants().is_empty());
        assert!(matches!(
            ctl.dispatch(BookingAction::RemoveGuest(0)),
            Err(BookingError::ParticipantNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut ctl = controller(EventFormat::Single, BookingFor::Myself);
        verify(&mut ctl, "7", "2012-05-01").unwrap();
        let first = serde_json::to_value(ctl.snapshot()).unwrap();
        let second = serde_json::to_value(ctl.snapshot()).unwrap();
        assert_eq!(first, second);
    }
}
