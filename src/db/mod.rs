//! Database access

pub mod queries;

pub use queries::{get_event, get_event_categories};
