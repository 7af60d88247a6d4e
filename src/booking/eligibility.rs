//! Category eligibility checks.
//!
//! Pure functions over the current participants - no database access, no caching.
//! Callers re-run them whenever participants or categories change.

use serde::Serialize;

use crate::models::{EventCategory, Participant};

/// Outcome of checking one category against a participant set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl Eligibility {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
        }
    }
}

/// A category annotated with its eligibility for the current participants
#[derive(Debug, Clone, Serialize)]
pub struct CategoryEligibility {
    pub category: EventCategory,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Check whether every participant fits the category.
///
/// Stops at the first participant that fails: age range is checked before
/// gender. Participants without a usable date of birth are skipped, including
/// for the gender check.
pub fn evaluate(category: &EventCategory, participants: &[Participant], as_of_year: i32) -> Eligibility {
    for participant in participants {
        let Some(age) = participant.age_in(as_of_year) else {
            continue;
        };

        if !category.covers_age(age) {
            return Eligibility::rejected(format!(
                "Age {} not in range {}-{}",
                age, category.start_age, category.end_age
            ));
        }

        if !category.allows_gender(participant.gender) {
            return Eligibility::rejected(format!("Gender {} not allowed", participant.gender));
        }
    }

    Eligibility::eligible()
}

/// Annotate every category with its eligibility, keeping category order.
pub fn eligible_categories(
    categories: &[EventCategory],
    participants: &[Participant],
    as_of_year: i32,
) -> Vec<CategoryEligibility> {
    categories
        .iter()
        .map(|category| {
            let result = evaluate(category, participants, as_of_year);
            CategoryEligibility {
                category: category.clone(),
                eligible: result.eligible,
                reason: result.reason,
            }
        })
        .collect()
}
