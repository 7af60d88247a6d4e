//! Booking engine module.
//!
//! Decides which event categories a set of participants qualifies for, prices
//! the booking, verifies members against the member directory and hands paid
//! bookings to the payment gateway.

pub mod calculators;
pub mod eligibility;
pub mod payment;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod session;
pub mod verification;

// Re-export commonly used items
pub use calculators::{compute_total, payment_blockers, BookingFor, PaymentBlocker};
pub use eligibility::{eligible_categories, evaluate, CategoryEligibility, Eligibility};
pub use payment::{BookingGateway, PaymentRedirect};
pub use routes::router;
pub use services::BookingError;
pub use session::{BookingAction, BookingController, BookingSnapshot};
pub use verification::{MemberDirectory, MembershipId, MembershipNamespace};
