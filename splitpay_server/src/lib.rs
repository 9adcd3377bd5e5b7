//! # Splitpay server
//! This module hosts the HTTP surface of the split-payment gateway. It is responsible for:
//! * accepting checkout requests (create a setup session, charge a saved card, release a payout),
//! * listening for incoming webhook notifications from the payment processor, verifying their
//!   signatures and feeding them to the reconciler,
//! * onboarding connected accounts for providers and referrers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod purge_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
