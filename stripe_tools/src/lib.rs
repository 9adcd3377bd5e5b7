//! A thin, typed client for the slice of the Stripe REST API the payment gateway uses:
//! setup-mode checkout sessions, off-session payment intents, transfers to connected accounts,
//! balances, payouts and Express onboarding. Webhook signature verification lives in
//! [`mod@webhook`].
mod api;
mod config;
mod data_objects;
mod error;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    Account,
    AccountLink,
    Balance,
    BalanceFunds,
    CheckoutSession,
    Payout,
    SetupIntent,
    StripeErrorDetail,
    StripeEvent,
    StripePaymentIntent,
    Transfer,
};
pub use error::StripeApiError;
