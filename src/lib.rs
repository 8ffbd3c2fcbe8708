//! Payment-session orchestration core of a bank-payment SDK.
//!
//! [`interfaces::sdk::PaySdk`] is the entry point. Rendering stays with the
//! host: the core emits [`domain::checkout::PresentationEvent`]s and reacts to
//! [`domain::checkout::SessionCommand`]s.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
