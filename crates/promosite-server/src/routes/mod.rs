pub mod activities;
pub mod components;
pub mod health;
pub mod stats;
pub mod templates;
pub mod track;
