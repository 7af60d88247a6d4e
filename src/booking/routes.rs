//! Booking route handlers

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Event, MembershipStatus};
use crate::AppState;

use super::calculators::{compute_total, payment_blockers};
use super::eligibility::{eligible_categories, evaluate, CategoryEligibility};
use super::requests::{
    CreateSessionRequest, EligibilityRequest, QuoteRequest, SessionActionRequest,
    VerifyMemberRequest,
};
use super::responses::{MoneyResponse, PaymentRedirectResponse, QuoteResponse, SessionResponse};
use super::services::{self, BookingError};
use super::session::BookingController;
use super::payment::PaymentRedirect;

/// Payment hand-off page that posts itself to the payment gateway
#[derive(Template)]
#[template(path = "payment/redirect.html")]
struct PaymentRedirectTemplate {
    event_title: String,
    order_id: String,
    payment_url: String,
    encrypted_data: String,
    access_code: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events/:event_id", get(get_event))
        .route("/api/events/:event_id/eligibility", post(eligibility))
        .route("/api/events/:event_id/quote", post(quote))
        .route("/api/cache/events/:event_id", delete(invalidate_event))
        .route("/api/bookings/sessions", post(create_session))
        .route("/api/bookings/sessions/:session_id", get(get_session))
        .route("/api/bookings/sessions/:session_id/actions", post(session_action))
        .route("/api/bookings/sessions/:session_id/members", post(verify_member))
        .route("/api/bookings/sessions/:session_id/checkout", post(checkout))
        .route("/bookings/sessions/:session_id/pay", post(pay))
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn money(state: &AppState, amount: rust_decimal::Decimal) -> MoneyResponse {
    MoneyResponse {
        amount,
        currency: state.config.currency.clone(),
    }
}

fn session_response(state: &AppState, controller: &BookingController) -> SessionResponse {
    let snapshot = controller.snapshot();
    let total = money(state, snapshot.selection.total_amount);
    SessionResponse { snapshot, total }
}

/// Event with its categories
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>> {
    let event = services::load_event(&state.db, &state.cache, event_id).await?;
    Ok(Json((*event).clone()))
}

/// Categories annotated with eligibility for the given participants
async fn eligibility(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<EligibilityRequest>,
) -> Result<Json<Vec<CategoryEligibility>>> {
    let event = services::load_event(&state.db, &state.cache, event_id).await?;
    let as_of_year = request.as_of_year.unwrap_or_else(current_year);

    Ok(Json(eligible_categories(
        &event.categories,
        &request.participants,
        as_of_year,
    )))
}

/// Price a booking without opening a session.
///
/// A category the participants do not qualify for is refused, as it would be
/// when selected in a session.
async fn quote(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let event = services::load_event(&state.db, &state.cache, event_id).await?;
    let category = request
        .category_id
        .map(|id| event.category(id).ok_or(BookingError::CategoryNotFound(id)))
        .transpose()?;

    if let Some(category) = category {
        let as_of_year = request.as_of_year.unwrap_or_else(current_year);
        let result = evaluate(category, &request.participants, as_of_year);
        if !result.eligible {
            return Err(BookingError::IneligibleCategory(
                result.reason.unwrap_or_else(|| category.name.clone()),
            )
            .into());
        }
    }

    let flags: Vec<MembershipStatus> = request
        .participants
        .iter()
        .map(|p| p.membership_status)
        .collect();
    let total = compute_total(&event.format, category, request.booking_for, &flags);
    let blockers = payment_blockers(
        &event.format,
        category,
        request.booking_for,
        &request.participants,
        total,
    );

    Ok(Json(QuoteResponse {
        total: money(&state, total),
        can_pay: blockers.is_empty(),
        blockers,
    }))
}

/// Drop a cached event after the back office changed it
async fn invalidate_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> StatusCode {
    state.cache.invalidate_event(event_id).await;
    StatusCode::NO_CONTENT
}

/// Open a booking session for an event
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let event = services::load_event(&state.db, &state.cache, request.event_id).await?;
    let session_id = Uuid::new_v4();
    let controller = BookingController::new(session_id, event, request.booking_for, current_year());

    let handle = state.cache.open_session(controller).await;
    tracing::info!("Session {} opened for event {}", session_id, request.event_id);

    let guard = handle.lock().await;
    Ok((StatusCode::CREATED, Json(session_response(&state, &guard))))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let handle = state
        .cache
        .session(session_id)
        .await
        .ok_or(AppError::SessionNotFound)?;
    let guard = handle.lock().await;
    Ok(Json(session_response(&state, &guard)))
}

/// Apply a client action to the session
async fn session_action(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionActionRequest>,
) -> Result<Json<SessionResponse>> {
    let handle = state
        .cache
        .session(session_id)
        .await
        .ok_or(AppError::SessionNotFound)?;

    let mut guard = handle.lock().await;
    guard.dispatch(request.into())?;
    Ok(Json(session_response(&state, &guard)))
}

/// Verify a membership id and add the member to the session
async fn verify_member(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<VerifyMemberRequest>,
) -> Result<Json<SessionResponse>> {
    let handle = state
        .cache
        .session(session_id)
        .await
        .ok_or(AppError::SessionNotFound)?;

    services::verify_member(
        state.directory.as_ref(),
        &handle,
        request.namespace,
        &request.membership_id,
    )
    .await?;

    let guard = handle.lock().await;
    Ok(Json(session_response(&state, &guard)))
}

/// Hand the booking to the gateway; the session ends on success
async fn start_payment(state: &AppState, session_id: Uuid) -> Result<(String, PaymentRedirect)> {
    let handle = state
        .cache
        .session(session_id)
        .await
        .ok_or(AppError::SessionNotFound)?;

    let redirect = services::initiate_payment(state.gateway.as_ref(), &handle).await?;
    let event_title = handle.lock().await.event().title.clone();
    state.cache.close_session(session_id).await;

    Ok((event_title, redirect))
}

/// Start payment and return the redirect as JSON
async fn checkout(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<PaymentRedirectResponse>> {
    let (_, redirect) = start_payment(&state, session_id).await?;

    Ok(Json(PaymentRedirectResponse {
        payment_url: state.config.payment_url.clone(),
        access_code: redirect.access_code,
        encrypted_data: redirect.encrypted_data,
        order_id: redirect.order_id,
    }))
}

/// Start payment and return a page that auto-submits to the payment gateway
async fn pay(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Result<Html<String>> {
    let (event_title, redirect) = start_payment(&state, session_id).await?;

    let template = PaymentRedirectTemplate {
        event_title,
        order_id: redirect.order_id,
        payment_url: state.config.payment_url.clone(),
        encrypted_data: redirect.encrypted_data,
        access_code: redirect.access_code,
    };

    Ok(Html(template.render()?))
}
