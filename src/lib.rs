//! Visit co-occurrence and upsell analytics for service bookings

pub mod services;
pub mod stores;
pub mod types;
