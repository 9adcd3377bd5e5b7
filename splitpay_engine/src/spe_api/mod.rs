//! The public API of the splitpay engine.
//!
//! [`checkout_api::CheckoutApi`] handles the synchronous, request-driven half of the order
//! lifecycle; [`reconciler_api::ReconcilerApi`] handles the asynchronous, event-driven half.
pub mod checkout_api;
pub mod errors;
pub mod reconciler_api;
