pub mod auth;
pub mod bookings;
pub mod doctors;
pub mod orders;
pub mod search;
pub mod server;
