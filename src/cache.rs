//! In-memory caching using moka
//!
//! Holds event definitions (read-only to the booking engine, so a short TTL is
//! enough) and the live booking sessions.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::booking::BookingController;
use crate::models::Event;

/// Shared handle to one booking session
pub type SessionHandle = Arc<Mutex<BookingController>>;

/// Application cache holding events and booking sessions
#[derive(Clone)]
pub struct AppCache {
    /// Events with categories (event_id -> Event)
    pub events: Cache<Uuid, Arc<Event>>,
    /// Booking sessions (session_id -> controller)
    pub sessions: Cache<Uuid, SessionHandle>,
}

impl AppCache {
    /// Create a new cache instance; idle sessions expire after `session_idle`
    pub fn new(session_idle: Duration) -> Self {
        Self {
            // Events: 200 entries, 10 min TTL
            events: Cache::builder()
                .max_capacity(200)
                .time_to_live(Duration::from_secs(10 * 60))
                .build(),

            // Sessions: 10k concurrent bookings, dropped after inactivity
            sessions: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(session_idle)
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            events_size: self.events.entry_count(),
            sessions_size: self.sessions.entry_count(),
        }
    }

    /// Invalidate a single event, e.g. after its categories were edited
    pub async fn invalidate_event(&self, event_id: Uuid) {
        self.events.invalidate(&event_id).await;
        info!("Cache invalidated for event: {}", event_id);
    }

    /// Store a new session and return its handle
    pub async fn open_session(&self, controller: BookingController) -> SessionHandle {
        let id = controller.session_id();
        let handle = Arc::new(Mutex::new(controller));
        self.sessions.insert(id, handle.clone()).await;
        handle
    }

    pub async fn session(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.sessions.get(&session_id).await
    }

    /// Drop a session once its booking has been handed to payment
    pub async fn close_session(&self, session_id: Uuid) {
        self.sessions.invalidate(&session_id).await;
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub events_size: u64,
    pub sessions_size: u64,
}
