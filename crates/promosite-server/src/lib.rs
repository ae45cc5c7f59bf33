//! Axum HTTP surface for promosite: tracking endpoint, content management
//! routes, stats reads, and the background scheduler.

pub mod app;
pub mod bus;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;
