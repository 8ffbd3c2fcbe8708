pub mod auth_info;
pub mod challenge;
pub mod checkout;
pub mod cookies;
pub mod credentials;
pub mod features;
pub mod installment;
pub mod money;
pub mod ports;
pub mod remote_config;
pub mod target;
pub mod user;
