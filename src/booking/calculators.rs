//! Core fee calculation functions.
//!
//! Pure functions for booking totals and the payment gate - no database access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EventCategory, EventFormat, MembershipStatus, Participant};

/// Who the signed-in booker is registering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingFor {
    /// The booker is the participant
    #[default]
    Myself,
    /// The booker registers someone else
    Someone,
}

/// Calculate the amount payable for a booking.
///
/// Returns zero until a category is selected and at least one participant is
/// registered.
///
/// # Arguments
/// * `format` - Event type with team terms
/// * `category` - Selected category, if any
/// * `booking_for` - Whether the booker registers themself
/// * `flags` - Membership of each participant, in registration order
pub fn compute_total(
    format: &EventFormat,
    category: Option<&EventCategory>,
    booking_for: BookingFor,
    flags: &[MembershipStatus],
) -> Decimal {
    let Some(category) = category else {
        return Decimal::ZERO;
    };
    if flags.is_empty() {
        return Decimal::ZERO;
    }

    match format {
        EventFormat::Single => match (booking_for, flags[0]) {
            (BookingFor::Myself, _) => category.member_fee,
            (BookingFor::Someone, MembershipStatus::NonMember) => category.non_member_fee,
            (BookingFor::Someone, MembershipStatus::Member) => category.member_fee,
        },
        EventFormat::Double => flags
            .iter()
            .take(2)
            .map(|flag| slot_fee(category, *flag))
            .sum(),
        // One non-member switches the whole team to the non-member rate
        EventFormat::Team(terms) => {
            if flags.contains(&MembershipStatus::NonMember) {
                terms.non_member_team_price
            } else {
                terms.member_team_price
            }
        }
    }
}

fn slot_fee(category: &EventCategory, flag: MembershipStatus) -> Decimal {
    match flag {
        MembershipStatus::Member => category.member_fee,
        MembershipStatus::NonMember => category.non_member_fee,
    }
}

/// Reason a booking cannot go to payment yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentBlocker {
    NoCategory,
    ZeroAmount,
    ParticipantCount { required: usize, actual: usize },
    TooFewPlayers { min: usize, actual: usize },
    TooManyPlayers { max: usize, actual: usize },
    IncompleteParticipant { position: usize },
    /// Booking for oneself at the member rate needs a verified member
    MemberRequired,
}

impl fmt::Display for PaymentBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentBlocker::NoCategory => write!(f, "Select a category"),
            PaymentBlocker::ZeroAmount => write!(f, "Amount payable must be greater than zero"),
            PaymentBlocker::ParticipantCount { required, actual } => {
                write!(f, "Booking needs {} participant(s), has {}", required, actual)
            }
            PaymentBlocker::TooFewPlayers { min, actual } => {
                write!(f, "Team needs at least {} players, has {}", min, actual)
            }
            PaymentBlocker::TooManyPlayers { max, actual } => {
                write!(f, "Team allows at most {} players, has {}", max, actual)
            }
            PaymentBlocker::IncompleteParticipant { position } => write!(
                f,
                "Player {} needs a name and date of birth",
                position
            ),
            PaymentBlocker::MemberRequired => {
                write!(f, "Verify your membership to book for yourself")
            }
        }
    }
}

/// List everything that prevents payment. Empty means the booking may be paid.
pub fn payment_blockers(
    format: &EventFormat,
    category: Option<&EventCategory>,
    booking_for: BookingFor,
    participants: &[Participant],
    total: Decimal,
) -> Vec<PaymentBlocker> {
    let mut blockers = Vec::new();

    if category.is_none() {
        blockers.push(PaymentBlocker::NoCategory);
    }
    if total <= Decimal::ZERO {
        blockers.push(PaymentBlocker::ZeroAmount);
    }

    let actual = participants.len();
    match format {
        EventFormat::Single | EventFormat::Double => {
            let required = format.capacity();
            if actual != required {
                blockers.push(PaymentBlocker::ParticipantCount { required, actual });
            }
            let self_booking = matches!(format, EventFormat::Single) && booking_for == BookingFor::Myself;
            if self_booking && participants.iter().any(|p| !p.is_member()) {
                blockers.push(PaymentBlocker::MemberRequired);
            }
        }
        EventFormat::Team(terms) => {
            let min = terms.min_players as usize;
            let max = terms.max_players as usize;
            if actual < min {
                blockers.push(PaymentBlocker::TooFewPlayers { min, actual });
            }
            if actual > max {
                blockers.push(PaymentBlocker::TooManyPlayers { max, actual });
            }
            for (idx, participant) in participants.iter().enumerate() {
                if !participant.is_complete() {
                    blockers.push(PaymentBlocker::IncompleteParticipant { position: idx + 1 });
                }
            }
        }
    }

    blockers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, TeamTerms};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::models::MembershipStatus::{Member, NonMember};

    fn category(member_fee: Decimal, non_member_fee: Decimal) -> EventCategory {
        EventCategory {
            id: Uuid::new_v4(),
            name: "Open".to_string(),
            start_age: 0,
            end_age: 99,
            allowed_genders: vec![],
            member_fee,
            non_member_fee,
            distance_meters: None,
            belts_count: None,
            description_html: String::new(),
        }
    }

    fn team(min_players: u32, max_players: u32) -> EventFormat {
        EventFormat::Team(TeamTerms {
            min_players,
            max_players,
            member_team_price: dec!(2000),
            non_member_team_price: dec!(3500),
        })
    }

    fn player(name: &str, dob: Option<&str>) -> Participant {
        Participant {
            id: None,
            name: name.to_string(),
            email: String::new(),
            mobile: String::new(),
            gender: Gender::Male,
            date_of_birth: dob.map(str::to_string),
            membership_status: NonMember,
        }
    }

    // ==================== compute_total tests ====================

    #[test]
    fn test_single_self_booking_pays_member_fee() {
        let cat = category(dec!(500), dec!(800));
        let total = compute_total(&EventFormat::Single, Some(&cat), BookingFor::Myself, &[Member]);
        assert_eq!(total, dec!(500));
    }

    #[test]
    fn test_single_on_behalf() {
        let cat = category(dec!(500), dec!(800));
        assert_eq!(
            compute_total(&EventFormat::Single, Some(&cat), BookingFor::Someone, &[NonMember]),
            dec!(800)
        );
        assert_eq!(
            compute_total(&EventFormat::Single, Some(&cat), BookingFor::Someone, &[Member]),
            dec!(500)
        );
    }

    #[test]
    fn test_double_sums_both_slots() {
        let cat = category(dec!(300), dec!(500));
        let total = compute_total(
            &EventFormat::Double,
            Some(&cat),
            BookingFor::Someone,
            &[Member, NonMember],
        );
        assert_eq!(total, dec!(800));

        let members = compute_total(&EventFormat::Double, Some(&cat), BookingFor::Myself, &[Member, Member]);
        assert_eq!(members, dec!(600));
    }

    #[test]
    fn test_double_with_one_slot_filled() {
        let cat = category(dec!(300), dec!(500));
        let total = compute_total(&EventFormat::Double, Some(&cat), BookingFor::Myself, &[NonMember]);
        assert_eq!(total, dec!(500));
    }

    #[test]
    fn test_team_one_non_member_forces_non_member_rate() {
        let cat = category(dec!(1), dec!(1));
        let total = compute_total(
            &team(3, 8),
            Some(&cat),
            BookingFor::Myself,
            &[Member, Member, Member, NonMember],
        );
        assert_eq!(total, dec!(3500));

        let all_members = compute_total(&team(3, 8), Some(&cat), BookingFor::Myself, &[Member, Member]);
        assert_eq!(all_members, dec!(2000));
    }

    #[test]
    fn test_zero_without_category_or_participants() {
        let cat = category(dec!(300), dec!(500));
        assert_eq!(
            compute_total(&EventFormat::Single, None, BookingFor::Myself, &[Member]),
            Decimal::ZERO
        );
        assert_eq!(
            compute_total(&EventFormat::Double, Some(&cat), BookingFor::Myself, &[]),
            Decimal::ZERO
        );
        assert_eq!(
            compute_total(&team(1, 4), None, BookingFor::Myself, &[NonMember]),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_compute_total_is_idempotent() {
        let cat = category(dec!(300), dec!(500));
        let flags = [Member, NonMember];
        let first = compute_total(&EventFormat::Double, Some(&cat), BookingFor::Someone, &flags);
        let second = compute_total(&EventFormat::Double, Some(&cat), BookingFor::Someone, &flags);
        assert_eq!(first, second);
    }

    // ==================== payment_blockers tests ====================

    #[test]
    fn test_blockers_empty_when_ready() {
        let cat = category(dec!(300), dec!(500));
        let people = vec![player("A", Some("2000-01-01")), player("B", None)];
        assert!(payment_blockers(&EventFormat::Double, Some(&cat), BookingFor::Someone, &people, dec!(1000)).is_empty());
    }

    #[test]
    fn test_blockers_nothing_selected() {
        let blockers = payment_blockers(&EventFormat::Single, None, BookingFor::Myself, &[], Decimal::ZERO);
        assert_eq!(
            blockers,
            vec![
                PaymentBlocker::NoCategory,
                PaymentBlocker::ZeroAmount,
                PaymentBlocker::ParticipantCount { required: 1, actual: 0 },
            ]
        );
    }

    #[test]
    fn test_blockers_double_needs_two() {
        let cat = category(dec!(300), dec!(500));
        let blockers =
            payment_blockers(&EventFormat::Double, Some(&cat), BookingFor::Someone, &[player("A", None)], dec!(500));
        assert_eq!(
            blockers,
            vec![PaymentBlocker::ParticipantCount { required: 2, actual: 1 }]
        );
    }

    #[test]
    fn test_blockers_team_roster() {
        let cat = category(dec!(1), dec!(1));
        let roster = vec![player("A", Some("2000-01-01")), player("", Some("2000-01-01"))];

        let blockers = payment_blockers(&team(3, 8), Some(&cat), BookingFor::Myself, &roster, dec!(3500));
        assert_eq!(
            blockers,
            vec![
                PaymentBlocker::TooFewPlayers { min: 3, actual: 2 },
                PaymentBlocker::IncompleteParticipant { position: 2 },
            ]
        );
    }

    #[test]
    fn test_blockers_team_missing_dob() {
        let cat = category(dec!(1), dec!(1));
        let roster = vec![player("A", Some("2000-01-01")), player("B", None)];
        let blockers = payment_blockers(&team(2, 2), Some(&cat), BookingFor::Myself, &roster, dec!(3500));
        assert_eq!(blockers, vec![PaymentBlocker::IncompleteParticipant { position: 2 }]);
        assert_eq!(blockers[0].to_string(), "Player 2 needs a name and date of birth");
    }

    #[test]
    fn test_blockers_self_booking_needs_member() {
        let cat = category(dec!(500), dec!(750));
        let guest = vec![player("Walk-in", Some("2000-01-01"))];
        let total = compute_total(&EventFormat::Single, Some(&cat), BookingFor::Myself, &[NonMember]);

        let blockers = payment_blockers(&EventFormat::Single, Some(&cat), BookingFor::Myself, &guest, total);
        assert_eq!(blockers, vec![PaymentBlocker::MemberRequired]);

        let on_behalf = payment_blockers(
            &EventFormat::Single,
            Some(&cat),
            BookingFor::Someone,
            &guest,
            dec!(750),
        );
        assert!(on_behalf.is_empty());

        let member = vec![Participant {
            membership_status: Member,
            ..player("Member", Some("2000-01-01"))
        }];
        assert!(payment_blockers(&EventFormat::Single, Some(&cat), BookingFor::Myself, &member, total).is_empty());
    }
}
