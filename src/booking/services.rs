//! Booking service functions with database and collaborator access.
//!
//! These functions load events through the cache, run member verification
//! against the directory and hand finished bookings to the payment gateway.

use axum::http::StatusCode;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::AppCache;
use crate::db;
use crate::error::AppError;
use crate::models::Event;

use super::payment::{BookingGateway, GatewayError, PaymentRedirect};
use super::session::{BookingAction, BookingController};
use super::verification::{
    accept_directory_response, DirectoryError, MemberDirectory, MembershipId, MembershipNamespace,
};

/// Booking rule violations and collaborator failures
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("'{0}' is not a valid membership id")]
    InvalidMembershipId(String),

    #[error("Member {0} is already part of this booking")]
    DuplicateMember(String),

    #[error("Verification of {0} is already in progress")]
    VerificationPending(String),

    #[error("{0}")]
    VerificationRejected(String),

    #[error("Member {0} has no date of birth on record")]
    MissingDateOfBirth(String),

    #[error("This booking already has the maximum of {capacity} participant(s)")]
    BookingFull { capacity: usize },

    #[error("{0}")]
    InvalidParticipant(String),

    #[error("Participant {0} is not part of this booking")]
    ParticipantNotFound(String),

    #[error("Category {0} does not belong to this event")]
    CategoryNotFound(Uuid),

    #[error("{0}")]
    IneligibleCategory(String),

    #[error("Booking cannot be paid yet: {0}")]
    NotPayable(String),

    #[error("Payment has already been started for this booking")]
    PaymentStarted,

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl BookingError {
    pub fn status(&self) -> StatusCode {
        match self {
            BookingError::InvalidMembershipId(_) | BookingError::InvalidParticipant(_) => {
                StatusCode::BAD_REQUEST
            }
            BookingError::DuplicateMember(_)
            | BookingError::VerificationPending(_)
            | BookingError::PaymentStarted => StatusCode::CONFLICT,
            BookingError::ParticipantNotFound(_) | BookingError::CategoryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BookingError::VerificationRejected(_)
            | BookingError::MissingDateOfBirth(_)
            | BookingError::BookingFull { .. }
            | BookingError::IneligibleCategory(_)
            | BookingError::NotPayable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Directory(_) | BookingError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            BookingError::InvalidMembershipId(_) => "invalid_membership_id",
            BookingError::DuplicateMember(_) => "duplicate_member",
            BookingError::VerificationPending(_) => "verification_pending",
            BookingError::VerificationRejected(_) => "verification_rejected",
            BookingError::MissingDateOfBirth(_) => "missing_date_of_birth",
            BookingError::BookingFull { .. } => "booking_full",
            BookingError::InvalidParticipant(_) => "invalid_participant",
            BookingError::ParticipantNotFound(_) => "participant_not_found",
            BookingError::CategoryNotFound(_) => "category_not_found",
            BookingError::IneligibleCategory(_) => "ineligible_category",
            BookingError::NotPayable(_) => "not_payable",
            BookingError::PaymentStarted => "payment_started",
            BookingError::Directory(_) => "directory_unavailable",
            BookingError::Gateway(_) => "gateway_error",
        }
    }
}

/// Load an event with its categories, cache first.
pub async fn load_event(pool: &PgPool, cache: &AppCache, event_id: Uuid) -> Result<Arc<Event>, AppError> {
    if let Some(cached) = cache.events.get(&event_id).await {
        tracing::debug!("Cache HIT for event: {}", event_id);
        return Ok(cached);
    }
    tracing::debug!("Cache MISS for event: {}", event_id);

    let row = db::get_event(pool, event_id)
        .await?
        .ok_or(AppError::EventNotFound)?;
    let categories = db::get_event_categories(pool, event_id).await?;

    let event = Event::from_rows(row, categories).map_err(AppError::Configuration)?;
    let event = Arc::new(event);
    cache.events.insert(event_id, event.clone()).await;

    Ok(event)
}

/// Verify a membership id with the directory and add the member to the session.
///
/// The id is reserved in the session while the lookup runs, so a second
/// request for it is refused until this one finishes.
pub async fn verify_member(
    directory: &dyn MemberDirectory,
    controller: &Mutex<BookingController>,
    namespace: MembershipNamespace,
    raw_id: &str,
) -> Result<(), BookingError> {
    let membership_id = MembershipId::resolve(namespace, raw_id)?;

    let session_id = {
        let mut guard = controller.lock().await;
        guard.dispatch(BookingAction::BeginVerification(membership_id.clone()))?;
        guard.session_id()
    };

    // Lock released while the directory call is in flight
    let outcome = match directory.verify_member(&membership_id).await {
        Ok(response) => accept_directory_response(&membership_id, response),
        Err(e) => {
            tracing::error!("Member directory lookup for {} failed: {}", membership_id, e);
            Err(e.into())
        }
    };

    let mut guard = controller.lock().await;
    let result = outcome.and_then(|participant| {
        guard.dispatch(BookingAction::CompleteVerification {
            membership_id: membership_id.clone(),
            participant,
        })
    });

    match result {
        Ok(()) => {
            tracing::info!("Session {}: verified member {}", session_id, membership_id);
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                "Session {}: verification of {} rejected: {}",
                session_id,
                membership_id,
                e
            );
            guard.dispatch(BookingAction::AbandonVerification(membership_id))?;
            Err(e)
        }
    }
}

/// Create the booking and start payment.
///
/// The session is locked for the whole hand-off. A failed attempt leaves it
/// untouched and can be retried; a successful one seals it before the lock is
/// released, so no second booking can be created from it.
pub async fn initiate_payment(
    gateway: &dyn BookingGateway,
    controller: &Mutex<BookingController>,
) -> Result<PaymentRedirect, BookingError> {
    let mut guard = controller.lock().await;
    let payload = guard.payment_payload()?;

    let receipt = gateway.create_booking(&payload).await.map_err(|e| {
        tracing::error!("Session {}: booking creation failed: {}", guard.session_id(), e);
        e
    })?;

    let redirect = gateway
        .initiate_payment(&receipt.booking_id, payload.amount_paid)
        .await
        .map_err(|e| {
            tracing::error!(
                "Session {}: payment initiation for booking {} failed: {}",
                guard.session_id(),
                receipt.booking_id,
                e
            );
            e
        })?;
    guard.mark_payment_started();

    tracing::info!(
        "Session {}: payment initiated for booking {} (order {}, amount {})",
        guard.session_id(),
        receipt.booking_id,
        redirect.order_id,
        payload.amount_paid
    );

    Ok(redirect)
}
