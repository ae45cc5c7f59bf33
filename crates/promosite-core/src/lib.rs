//! Core domain logic for Promosite: activity content management and the
//! visitor analytics pipeline.
//!
//! Everything here is framework-free. Persistence, sessions, and the
//! lifecycle event bus are injected through the port traits in [`store`],
//! so the services ([`collector::StatsCollector`],
//! [`lifecycle::ActivityLifecycle`], [`templating::TemplateEngine`]) can be
//! unit-tested without a database or HTTP stack.

pub mod activity;
pub mod classify;
pub mod collector;
pub mod component;
pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod stats;
pub mod store;
pub mod template;
pub mod templating;

#[cfg(test)]
mod testutil;
