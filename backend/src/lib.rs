//! FinAIcer backend: users, transactions, memoized monthly reports, a live
//! transaction feed and a Gemini chat proxy over one HTTP surface.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod notifier;
pub mod period;
pub mod reports;
pub mod routes;
pub mod services;
pub mod store;

pub use routes::{app, AppState};
