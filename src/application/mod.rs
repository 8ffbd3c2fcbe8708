//! Application layer orchestrating a checkout.
//!
//! The [`session::CheckoutSession`] state machine drives one checkout on a
//! single tokio task. It delegates every backend call to per-checkout services
//! built on the shared [`gateway::Gateway`], which [`assembly`] wires once per
//! SDK instance.

pub mod assembly;
pub mod auth;
pub mod bank_apps;
pub mod content;
pub mod endpoints;
pub mod gateway;
pub mod installment;
pub mod otp;
pub mod payment;
pub mod remote_config;
pub mod session;
pub mod timer;
pub mod user;
pub mod validator;
pub mod verification;
