//! Outbound HTTP clients for the external collaborators

pub mod booking_gateway;
pub mod member_directory;

pub use booking_gateway::HttpBookingGateway;
pub use member_directory::HttpMemberDirectory;
