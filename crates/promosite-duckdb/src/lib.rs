//! DuckDB storage backend for promosite.
//!
//! One embedded connection serves all four storage ports: the event log,
//! daily stats, content (activities/components/templates), and session
//! key/value storage.

mod backend;
mod content;
mod events;
mod schema;
mod session;
mod stats;

pub use backend::DuckDbBackend;
